//! Thin helpers over `web-sys` shared by every component.
//!
//! Listeners installed here live as long as the page, so their closures are
//! handed over to the JS side with `forget`.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::js_sys::Array;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlCollection, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, NodeList, Window,
};

use crate::error::SiteError;

pub fn window() -> Result<Window, SiteError> {
    web_sys::window().ok_or(SiteError::NoWindow)
}

pub fn document() -> Result<Document, SiteError> {
    window()?.document().ok_or(SiteError::NoDocument)
}

pub fn body(document: &Document) -> Result<HtmlElement, SiteError> {
    document.body().ok_or(SiteError::MissingElement("body"))
}

pub fn select_all(document: &Document, selector: &str) -> Result<Vec<Element>, SiteError> {
    Ok(node_elements(&document.query_selector_all(selector)?))
}

pub fn select_all_in(parent: &Element, selector: &str) -> Result<Vec<Element>, SiteError> {
    Ok(node_elements(&parent.query_selector_all(selector)?))
}

pub fn node_elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn collection_elements(collection: &HtmlCollection) -> Vec<Element> {
    (0..collection.length())
        .filter_map(|i| collection.item(i))
        .collect()
}

/// Registers a page-lifetime listener.
pub fn listen<F>(target: &EventTarget, event: &str, handler: F) -> Result<(), SiteError>
where
    F: FnMut(Event) + 'static,
{
    let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Runs `f` once the DOM is parsed. The module is usually loaded after
/// `DOMContentLoaded` already fired, in which case `f` runs right away.
pub fn on_dom_ready<F>(document: &Document, f: F) -> Result<(), SiteError>
where
    F: FnOnce() + 'static,
{
    if document.ready_state() != "loading" {
        f();
        return Ok(());
    }
    let mut f = Some(f);
    listen(document, "DOMContentLoaded", move |_| {
        if let Some(f) = f.take() {
            f();
        }
    })
}

pub fn set_style(element: &Element, property: &str, value: &str) {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        if let Err(e) = html.style().set_property(property, value) {
            log::warn!("could not set {} on element: {:?}", property, e);
        }
    }
}

pub fn add_class(element: &Element, class: &str) {
    if let Err(e) = element.class_list().add_1(class) {
        log::warn!("could not add class {}: {:?}", class, e);
    }
}

pub fn remove_class(element: &Element, class: &str) {
    if let Err(e) = element.class_list().remove_1(class) {
        log::warn!("could not remove class {}: {:?}", class, e);
    }
}

pub fn set_class(element: &Element, class: &str, on: bool) {
    if on {
        add_class(element, class);
    } else {
        remove_class(element, class);
    }
}

/// Visibility-watch parameters. `None` in [`watch_once`] uses the browser
/// defaults (threshold 0, no margin).
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub threshold: f64,
    pub root_margin: String,
}

/// Watches `targets` and calls `on_visible` the first time each one enters
/// the viewport. A target is unobserved as soon as it fires.
///
/// Fails with [`SiteError::Unsupported`] when the browser has no
/// `IntersectionObserver`; the content then simply stays unanimated.
pub fn watch_once<F>(
    targets: &[Element],
    options: Option<&WatchOptions>,
    mut on_visible: F,
) -> Result<(), SiteError>
where
    F: FnMut(Element) + 'static,
{
    if targets.is_empty() {
        return Ok(());
    }

    let callback = Closure::wrap(Box::new(move |entries: Array, observer: IntersectionObserver| {
        for entry in entries.iter() {
            let entry: IntersectionObserverEntry = entry.unchecked_into();
            if entry.is_intersecting() {
                let target = entry.target();
                observer.unobserve(&target);
                on_visible(target);
            }
        }
    }) as Box<dyn FnMut(Array, IntersectionObserver)>);

    let observer = match options {
        Some(options) => {
            let init = IntersectionObserverInit::new();
            init.set_threshold(&JsValue::from_f64(options.threshold));
            init.set_root_margin(&options.root_margin);
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
        }
        None => IntersectionObserver::new(callback.as_ref().unchecked_ref()),
    }
    .map_err(|e| {
        log::debug!("IntersectionObserver unavailable: {:?}", e);
        SiteError::Unsupported("IntersectionObserver")
    })?;

    for target in targets {
        observer.observe(target);
    }
    callback.forget();
    Ok(())
}
