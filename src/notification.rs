use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use serde::Deserialize;
use web_sys::MouseEvent;
use yew::prelude::*;
use yew::AppHandle;

use crate::dom;
use crate::error::SiteError;

const TOAST_CLASSES: &str =
    "fixed top-6 right-6 z-50 p-6 rounded-2xl shadow-2xl transform transition-all duration-500 max-w-md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl Severity {
    pub fn palette(self) -> &'static str {
        match self {
            Severity::Success => "bg-green-500 text-white",
            Severity::Error => "bg-red-500 text-white",
            Severity::Info => "bg-blue-500 text-white",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Success => "fa-check-circle",
            Severity::Error => "fa-exclamation-circle",
            Severity::Info => "fa-info-circle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToastTimings {
    pub enter_delay_ms: u32,
    pub display_ms: u32,
    pub exit_ms: u32,
}

impl Default for ToastTimings {
    fn default() -> Self {
        Self {
            enter_delay_ms: 100,
            display_ms: 5000,
            exit_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Entering,
    Shown,
    Leaving,
}

impl ToastPhase {
    pub fn transform(self) -> &'static str {
        match self {
            ToastPhase::Shown => "translateX(0)",
            ToastPhase::Entering | ToastPhase::Leaving => "translateX(100%)",
        }
    }
}

impl ToastTimings {
    /// Total time a toast spends in the document when nobody closes it.
    pub fn lifetime_ms(&self) -> u32 {
        self.display_ms + self.exit_ms
    }

    /// Phase `elapsed_ms` after insertion, `None` once the node is gone.
    pub fn phase_at(&self, elapsed_ms: u32) -> Option<ToastPhase> {
        if elapsed_ms >= self.lifetime_ms() {
            None
        } else if elapsed_ms >= self.display_ms {
            Some(ToastPhase::Leaving)
        } else if elapsed_ms >= self.enter_delay_ms {
            Some(ToastPhase::Shown)
        } else {
            Some(ToastPhase::Entering)
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub message: AttrValue,
    pub severity: Severity,
    pub timings: ToastTimings,
    pub on_remove: Callback<()>,
}

#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    let phase = use_state(|| ToastPhase::Entering);

    {
        let phase = phase.setter();
        let on_remove = props.on_remove.clone();
        let timings = props.timings;
        use_effect_with_deps(
            move |_| {
                let show = {
                    let phase = phase.clone();
                    Timeout::new(timings.enter_delay_ms, move || phase.set(ToastPhase::Shown))
                };
                let leave = Timeout::new(timings.display_ms, move || phase.set(ToastPhase::Leaving));
                let remove = Timeout::new(timings.lifetime_ms(), move || on_remove.emit(()));

                // an early close cancels whatever is still pending
                move || {
                    drop(show);
                    drop(leave);
                    drop(remove);
                }
            },
            (),
        );
    }

    let close = {
        let on_remove = props.on_remove.clone();
        Callback::from(move |_: MouseEvent| on_remove.emit(()))
    };

    html! {
        <div
            class={format!("{} {}", TOAST_CLASSES, props.severity.palette())}
            style={format!("transform: {};", phase.transform())}
        >
            <div class="flex items-center">
                <i class={format!("fas {} mr-3 text-xl", props.severity.icon())}></i>
                <span class="font-semibold">{ props.message.clone() }</span>
                <button class="ml-4 text-white hover:text-gray-200 transition-colors" onclick={close}>
                    <i class="fas fa-times"></i>
                </button>
            </div>
        </div>
    }
}

/// Mounts a self-removing toast on `<body>`. Each toast is its own small
/// app with its own timers, so any number can be on screen at once.
pub fn show_notification(message: &str, severity: Severity, timings: ToastTimings) -> Result<(), SiteError> {
    let document = dom::document()?;
    let host = document.create_element("div")?;
    host.set_class_name("toast-host");
    dom::body(&document)?.append_child(&host)?;

    let app_slot: Rc<RefCell<Option<AppHandle<Toast>>>> = Rc::new(RefCell::new(None));
    let on_remove = {
        let app_slot = app_slot.clone();
        let host = host.clone();
        Callback::from(move |_| {
            host.remove();
            if let Some(app) = app_slot.borrow_mut().take() {
                // not from inside the toast's own callback
                Timeout::new(0, move || app.destroy()).forget();
            }
        })
    };

    let props = ToastProps {
        message: AttrValue::from(message.to_string()),
        severity,
        timings,
        on_remove,
    };
    let app = yew::Renderer::<Toast>::with_root_and_props(host, props).render();
    *app_slot.borrow_mut() = Some(app);

    log::debug!("notification shown: {:?} {}", severity, message);
    Ok(())
}
