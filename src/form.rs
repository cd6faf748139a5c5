use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use gloo_timers::future::TimeoutFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement,
};

use crate::dom;
use crate::error::SiteError;
use crate::notification::{self, Severity, ToastTimings};

pub const REQUIRED_SELECTOR: &str = "input[required], textarea[required], select[required]";
pub const SUCCESS_MESSAGE: &str = "Message sent successfully! We'll get back to you soon.";
pub const INVALID_MESSAGE: &str = "Please fill in all required fields correctly.";
pub const FAILURE_MESSAGE: &str = "Your message could not be sent. Please try again.";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";

const INVALID_CLASS: &str = "border-red-500";
const VALID_CLASS: &str = "border-green-500";
const BUSY_CLASS: &str = "opacity-75";
const ERROR_MESSAGE_CLASSES: &str = "error-message text-red-500 text-sm mt-1";
const FIELD_INDEX_ATTRIBUTE: &str = "data-field-index";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub submit_delay_ms: u32,
    /// Markup shown inside the submit button while a submission runs.
    pub loading_label: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            submit_delay_ms: 2000,
            loading_label: r#"<i class="fas fa-spinner fa-spin mr-2"></i>Sending..."#.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Email,
    Other,
}

#[derive(Debug, Clone)]
pub struct FieldInput {
    pub name: String,
    pub kind: FieldKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldVerdict {
    Valid,
    Invalid(String),
}

pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

pub fn validate_field(field: &FieldInput) -> FieldVerdict {
    let value = field.value.trim();
    if value.is_empty() {
        let label = if field.name.is_empty() { "This field" } else { field.name.as_str() };
        return FieldVerdict::Invalid(format!("{} is required", label));
    }
    if field.kind == FieldKind::Email && !is_email(value) {
        return FieldVerdict::Invalid(EMAIL_MESSAGE.to_string());
    }
    FieldVerdict::Valid
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub verdicts: Vec<FieldVerdict>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.verdicts.iter().all(|v| *v == FieldVerdict::Valid)
    }
}

pub fn validate_all(fields: &[FieldInput]) -> ValidationReport {
    ValidationReport {
        verdicts: fields.iter().map(validate_field).collect(),
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submission failed: {0}")]
    Transport(String),
}

/// Where a valid form goes.
pub trait SubmissionTransport {
    fn submit(&self, entries: Vec<(String, String)>) -> LocalBoxFuture<'_, Result<(), SubmitError>>;
}

/// Pretends to talk to a server by waiting a fixed delay.
pub struct SimulatedTransport {
    delay_ms: u32,
}

impl SimulatedTransport {
    pub fn new(delay_ms: u32) -> Self {
        Self { delay_ms }
    }
}

impl SubmissionTransport for SimulatedTransport {
    fn submit(&self, entries: Vec<(String, String)>) -> LocalBoxFuture<'_, Result<(), SubmitError>> {
        let delay_ms = self.delay_ms;
        async move {
            log::debug!("simulating submission of {} fields", entries.len());
            TimeoutFuture::new(delay_ms).await;
            Ok(())
        }
        .boxed_local()
    }
}

/// Everything the submission flow needs from the rendered form.
pub trait FormView {
    /// Puts the submit button into its busy state and returns its label.
    fn begin_busy(&self) -> Option<String>;
    fn end_busy(&self, original_label: Option<String>);
    fn required_fields(&self) -> Vec<FieldInput>;
    fn entries(&self) -> Vec<(String, String)>;
    /// Drops the previous attempt's markers and messages for field `index`.
    fn clear_field(&self, index: usize);
    fn mark_field(&self, index: usize, verdict: &FieldVerdict);
    fn reset(&self);
    fn notify(&self, message: &str, severity: Severity);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Sent,
    Invalid,
    Failed,
    /// Another submission of the same form was still running.
    Ignored,
}

pub struct FormSubmitter<T> {
    transport: T,
    in_flight: Cell<bool>,
}

impl<T: SubmissionTransport> FormSubmitter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            in_flight: Cell::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    pub async fn submit<V: FormView>(&self, view: &V) -> SubmissionOutcome {
        if self.in_flight.replace(true) {
            return SubmissionOutcome::Ignored;
        }
        let label = view.begin_busy();

        let fields = view.required_fields();
        let report = validate_all(&fields);
        // all clears first: fields may share a container
        for index in 0..fields.len() {
            view.clear_field(index);
        }
        for (index, verdict) in report.verdicts.iter().enumerate() {
            view.mark_field(index, verdict);
        }

        let outcome = if report.is_valid() {
            match self.transport.submit(view.entries()).await {
                Ok(()) => {
                    view.notify(SUCCESS_MESSAGE, Severity::Success);
                    view.reset();
                    SubmissionOutcome::Sent
                }
                Err(e) => {
                    log::error!("{}", e);
                    view.notify(FAILURE_MESSAGE, Severity::Error);
                    SubmissionOutcome::Failed
                }
            }
        } else {
            view.notify(INVALID_MESSAGE, Severity::Error);
            SubmissionOutcome::Invalid
        };

        view.end_busy(label);
        self.in_flight.set(false);
        outcome
    }
}

struct DomForm {
    form: HtmlFormElement,
    button: Option<HtmlButtonElement>,
    fields: RefCell<Vec<Element>>,
    loading_label: String,
    timings: ToastTimings,
}

fn field_value(element: &Element) -> Option<String> {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        Some(input.value())
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        Some(area.value())
    } else {
        element.dyn_ref::<HtmlSelectElement>().map(|select| select.value())
    }
}

fn field_kind(element: &Element) -> FieldKind {
    match element.dyn_ref::<HtmlInputElement>() {
        Some(input) if input.type_() == "email" => FieldKind::Email,
        _ => FieldKind::Other,
    }
}

/// Matches only the message that belongs to required field `index`.
fn message_selector(index: usize) -> String {
    format!(".error-message[{}=\"{}\"]", FIELD_INDEX_ATTRIBUTE, index)
}

fn field_container(element: &Element) -> Option<Element> {
    element
        .closest(".form-group")
        .ok()
        .flatten()
        .or_else(|| element.parent_element())
}

impl DomForm {
    fn field(&self, index: usize) -> Option<Element> {
        self.fields.borrow().get(index).cloned()
    }
}

impl FormView for DomForm {
    fn begin_busy(&self) -> Option<String> {
        let button = self.button.as_ref()?;
        let original = button.text_content();
        button.set_inner_html(&self.loading_label);
        button.set_disabled(true);
        dom::add_class(button, BUSY_CLASS);
        original
    }

    fn end_busy(&self, original_label: Option<String>) {
        if let Some(button) = &self.button {
            button.set_text_content(original_label.as_deref());
            button.set_disabled(false);
            dom::remove_class(button, BUSY_CLASS);
        }
    }

    fn required_fields(&self) -> Vec<FieldInput> {
        let elements = dom::select_all_in(&self.form, REQUIRED_SELECTOR).unwrap_or_default();
        let inputs = elements
            .iter()
            .map(|element| FieldInput {
                name: element.get_attribute("name").unwrap_or_default(),
                kind: field_kind(element),
                value: field_value(element).unwrap_or_default(),
            })
            .collect();
        *self.fields.borrow_mut() = elements;
        inputs
    }

    fn entries(&self) -> Vec<(String, String)> {
        dom::collection_elements(&self.form.elements())
            .iter()
            .filter_map(|element| {
                let name = element.get_attribute("name").filter(|n| !n.is_empty())?;
                Some((name, field_value(element)?))
            })
            .collect()
    }

    fn clear_field(&self, index: usize) {
        let Some(field) = self.field(index) else {
            return;
        };
        dom::remove_class(&field, INVALID_CLASS);
        dom::remove_class(&field, VALID_CLASS);
        if let Some(container) = field_container(&field) {
            for stale in dom::select_all_in(&container, &message_selector(index)).unwrap_or_default() {
                stale.remove();
            }
        }
    }

    fn mark_field(&self, index: usize, verdict: &FieldVerdict) {
        let Some(field) = self.field(index) else {
            return;
        };
        match verdict {
            FieldVerdict::Valid => dom::add_class(&field, VALID_CLASS),
            FieldVerdict::Invalid(message) => {
                dom::add_class(&field, INVALID_CLASS);
                let Some(container) = field_container(&field) else {
                    return;
                };
                let Some(document) = field.owner_document() else {
                    return;
                };
                if let Ok(error) = document.create_element("p") {
                    error.set_class_name(ERROR_MESSAGE_CLASSES);
                    error.set_text_content(Some(message));
                    if let Err(e) = error.set_attribute(FIELD_INDEX_ATTRIBUTE, &index.to_string()) {
                        log::warn!("could not tag error message: {:?}", e);
                    }
                    if let Err(e) = container.append_child(&error) {
                        log::warn!("could not attach error message: {:?}", e);
                    }
                }
            }
        }
    }

    fn reset(&self) {
        self.form.reset();
        for field in self.fields.borrow().iter() {
            dom::remove_class(field, INVALID_CLASS);
            dom::remove_class(field, VALID_CLASS);
        }
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Err(e) = notification::show_notification(message, severity, self.timings) {
            log::error!("could not show notification: {}", e);
        }
    }
}

pub fn install(document: &Document, config: &FormConfig, timings: ToastTimings) -> Result<(), SiteError> {
    let forms = dom::select_all(document, "form")?;
    for element in &forms {
        let Some(form) = element.dyn_ref::<HtmlFormElement>().cloned() else {
            continue;
        };
        let button = form
            .query_selector("button[type='submit']")?
            .and_then(|button| button.dyn_into::<HtmlButtonElement>().ok());

        let view = Rc::new(DomForm {
            form: form.clone(),
            button,
            fields: RefCell::new(Vec::new()),
            loading_label: config.loading_label.clone(),
            timings,
        });
        let submitter = Rc::new(FormSubmitter::new(SimulatedTransport::new(config.submit_delay_ms)));

        dom::listen(&form, "submit", move |event| {
            event.prevent_default();
            let view = view.clone();
            let submitter = submitter.clone();
            spawn_local(async move {
                let outcome = submitter.submit(view.as_ref()).await;
                log::debug!("form submission finished: {:?}", outcome);
            });
        })?;
    }
    log::info!("{} forms enhanced", forms.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::task::noop_waker;
    use std::future::Future;
    use std::task::{Context, Poll};

    fn field(name: &str, kind: FieldKind, value: &str) -> FieldInput {
        FieldInput {
            name: name.to_string(),
            kind,
            value: value.to_string(),
        }
    }

    /// In-memory form: per-field markers and messages, plus a log of
    /// notifications.
    struct FakeForm {
        fields: RefCell<Vec<FieldInput>>,
        messages: RefCell<Vec<Vec<String>>>,
        markers: RefCell<Vec<Option<bool>>>,
        notifications: RefCell<Vec<(String, Severity)>>,
        busy: Cell<bool>,
        label: RefCell<String>,
        resets: Cell<usize>,
    }

    impl FakeForm {
        fn new(fields: Vec<FieldInput>) -> Self {
            let count = fields.len();
            Self {
                fields: RefCell::new(fields),
                messages: RefCell::new(vec![Vec::new(); count]),
                markers: RefCell::new(vec![None; count]),
                notifications: RefCell::new(Vec::new()),
                busy: Cell::new(false),
                label: RefCell::new("Send Message".to_string()),
                resets: Cell::new(0),
            }
        }

        fn last_notification(&self) -> Option<(String, Severity)> {
            self.notifications.borrow().last().cloned()
        }
    }

    impl FormView for FakeForm {
        fn begin_busy(&self) -> Option<String> {
            self.busy.set(true);
            Some(self.label.replace("Sending...".to_string()))
        }

        fn end_busy(&self, original_label: Option<String>) {
            self.busy.set(false);
            *self.label.borrow_mut() = original_label.unwrap_or_default();
        }

        fn required_fields(&self) -> Vec<FieldInput> {
            self.fields.borrow().clone()
        }

        fn entries(&self) -> Vec<(String, String)> {
            self.fields
                .borrow()
                .iter()
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect()
        }

        fn clear_field(&self, index: usize) {
            self.messages.borrow_mut()[index].clear();
            self.markers.borrow_mut()[index] = None;
        }

        fn mark_field(&self, index: usize, verdict: &FieldVerdict) {
            match verdict {
                FieldVerdict::Valid => self.markers.borrow_mut()[index] = Some(true),
                FieldVerdict::Invalid(message) => {
                    self.markers.borrow_mut()[index] = Some(false);
                    self.messages.borrow_mut()[index].push(message.clone());
                }
            }
        }

        fn reset(&self) {
            self.resets.set(self.resets.get() + 1);
            for field in self.fields.borrow_mut().iter_mut() {
                field.value.clear();
            }
            for marker in self.markers.borrow_mut().iter_mut() {
                *marker = None;
            }
        }

        fn notify(&self, message: &str, severity: Severity) {
            self.notifications.borrow_mut().push((message.to_string(), severity));
        }
    }

    struct FakeTransport {
        fail: bool,
        calls: Cell<usize>,
    }

    impl FakeTransport {
        fn ok() -> Self {
            Self { fail: false, calls: Cell::new(0) }
        }

        fn failing() -> Self {
            Self { fail: true, calls: Cell::new(0) }
        }
    }

    impl SubmissionTransport for FakeTransport {
        fn submit(&self, _entries: Vec<(String, String)>) -> LocalBoxFuture<'_, Result<(), SubmitError>> {
            self.calls.set(self.calls.get() + 1);
            let result = if self.fail {
                Err(SubmitError::Transport("offline".to_string()))
            } else {
                Ok(())
            };
            futures::future::ready(result).boxed_local()
        }
    }

    /// Holds the submission open until the test releases it.
    struct GatedTransport {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl SubmissionTransport for GatedTransport {
        fn submit(&self, _entries: Vec<(String, String)>) -> LocalBoxFuture<'_, Result<(), SubmitError>> {
            let gate = self.gate.borrow_mut().take();
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(())
            }
            .boxed_local()
        }
    }

    fn contact_form(name: &str, email: &str, message: &str) -> FakeForm {
        FakeForm::new(vec![
            field("name", FieldKind::Other, name),
            field("email", FieldKind::Email, email),
            field("message", FieldKind::Other, message),
        ])
    }

    #[test]
    fn email_pattern() {
        assert!(!is_email("not-an-email"));
        assert!(is_email("a@b.co"));
        assert!(!is_email("a b@c.de"));
        assert!(!is_email("a@b"));
    }

    #[test]
    fn empty_fields_are_required() {
        let verdict = validate_field(&field("phone", FieldKind::Other, "   "));
        assert_eq!(verdict, FieldVerdict::Invalid("phone is required".to_string()));

        let unnamed = validate_field(&field("", FieldKind::Other, ""));
        assert_eq!(unnamed, FieldVerdict::Invalid("This field is required".to_string()));
    }

    #[test]
    fn empty_email_reports_required_not_format() {
        let verdict = validate_field(&field("email", FieldKind::Email, ""));
        assert_eq!(verdict, FieldVerdict::Invalid("email is required".to_string()));
    }

    #[test]
    fn email_fields_are_trimmed_before_matching() {
        assert_eq!(validate_field(&field("email", FieldKind::Email, "  a@b.co ")), FieldVerdict::Valid);
        assert_eq!(
            validate_field(&field("email", FieldKind::Email, "not-an-email")),
            FieldVerdict::Invalid(EMAIL_MESSAGE.to_string())
        );
    }

    #[test]
    fn repeated_invalid_submits_do_not_pile_up_messages() {
        let form = contact_form("", "", "");
        let submitter = FormSubmitter::new(FakeTransport::ok());

        for _ in 0..3 {
            assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Invalid);
        }

        for messages in form.messages.borrow().iter() {
            assert_eq!(messages.len(), 1);
        }
        assert!(form.markers.borrow().iter().all(|m| *m == Some(false)));
        assert_eq!(submitter.transport.calls.get(), 0);
    }

    /// Fields without their own wrapper share one container; clearing any
    /// field empties it, the way an untagged `.error-message` sweep would.
    struct SharedContainerForm {
        fields: Vec<FieldInput>,
        container: RefCell<Vec<(usize, String)>>,
    }

    impl FormView for SharedContainerForm {
        fn begin_busy(&self) -> Option<String> {
            None
        }

        fn end_busy(&self, _original_label: Option<String>) {}

        fn required_fields(&self) -> Vec<FieldInput> {
            self.fields.clone()
        }

        fn entries(&self) -> Vec<(String, String)> {
            Vec::new()
        }

        fn clear_field(&self, _index: usize) {
            self.container.borrow_mut().clear();
        }

        fn mark_field(&self, index: usize, verdict: &FieldVerdict) {
            if let FieldVerdict::Invalid(message) = verdict {
                self.container.borrow_mut().push((index, message.clone()));
            }
        }

        fn reset(&self) {}

        fn notify(&self, _message: &str, _severity: Severity) {}
    }

    #[test]
    fn every_empty_field_keeps_its_message_in_a_shared_container() {
        let form = SharedContainerForm {
            fields: vec![
                field("name", FieldKind::Other, ""),
                field("email", FieldKind::Email, ""),
                field("message", FieldKind::Other, ""),
            ],
            container: RefCell::new(Vec::new()),
        };
        let submitter = FormSubmitter::new(FakeTransport::ok());

        for _ in 0..2 {
            assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Invalid);
            let messages = form.container.borrow();
            assert_eq!(messages.len(), 3, "messages left: {:?}", messages);
            for (index, name) in ["name", "email", "message"].iter().enumerate() {
                let count = messages.iter().filter(|(i, _)| *i == index).count();
                assert_eq!(count, 1, "{} should carry exactly one message", name);
            }
        }
    }

    #[test]
    fn clearing_a_field_targets_only_its_own_message() {
        assert_eq!(message_selector(0), ".error-message[data-field-index=\"0\"]");
        assert_ne!(message_selector(1), message_selector(11));
    }

    #[test]
    fn invalid_submission_keeps_values_and_restores_button() {
        let form = contact_form("Ada", "not-an-email", "Hello");
        let submitter = FormSubmitter::new(FakeTransport::ok());

        assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Invalid);

        assert_eq!(form.fields.borrow()[0].value, "Ada");
        assert_eq!(form.resets.get(), 0);
        assert_eq!(form.markers.borrow()[0], Some(true));
        assert_eq!(form.markers.borrow()[1], Some(false));
        assert_eq!(form.last_notification(), Some((INVALID_MESSAGE.to_string(), Severity::Error)));
        assert!(!form.busy.get());
        assert_eq!(*form.label.borrow(), "Send Message");
        assert!(!submitter.is_in_flight());
    }

    #[test]
    fn valid_submission_notifies_and_resets() {
        let form = contact_form("Ada", "ada@example.com", "Hello");
        let submitter = FormSubmitter::new(FakeTransport::ok());

        assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Sent);

        assert_eq!(submitter.transport.calls.get(), 1);
        assert_eq!(form.resets.get(), 1);
        assert!(form.fields.borrow().iter().all(|f| f.value.is_empty()));
        assert!(form.markers.borrow().iter().all(|m| m.is_none()));
        assert_eq!(form.last_notification(), Some((SUCCESS_MESSAGE.to_string(), Severity::Success)));
        assert!(!form.busy.get());
        assert_eq!(*form.label.borrow(), "Send Message");
    }

    #[test]
    fn transport_failure_keeps_values() {
        let form = contact_form("Ada", "ada@example.com", "Hello");
        let submitter = FormSubmitter::new(FakeTransport::failing());

        assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Failed);

        assert_eq!(form.resets.get(), 0);
        assert_eq!(form.fields.borrow()[2].value, "Hello");
        assert_eq!(form.last_notification(), Some((FAILURE_MESSAGE.to_string(), Severity::Error)));
        assert!(!form.busy.get());
    }

    #[test]
    fn button_is_busy_exactly_while_in_flight() {
        let (release, gate) = oneshot::channel();
        let submitter = FormSubmitter::new(GatedTransport {
            gate: RefCell::new(Some(gate)),
        });
        let form = contact_form("Ada", "ada@example.com", "Hello");

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut first = Box::pin(submitter.submit(&form));
        assert!(matches!(first.as_mut().poll(&mut cx), Poll::Pending));
        assert!(form.busy.get());
        assert!(submitter.is_in_flight());

        assert_eq!(block_on(submitter.submit(&form)), SubmissionOutcome::Ignored);
        assert!(form.busy.get());

        release.send(()).unwrap();
        assert_eq!(block_on(first), SubmissionOutcome::Sent);
        assert!(!form.busy.get());
        assert!(!submitter.is_in_flight());
    }
}
