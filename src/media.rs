use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlImageElement};

use crate::dom;
use crate::error::SiteError;

pub const LAZY_SELECTOR: &str = "img[data-src]";

/// Source to swap in, if the placeholder carries a usable one.
pub fn deferred_source(data_src: Option<String>) -> Option<String> {
    data_src
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
}

fn load(element: &Element) {
    let Some(src) = deferred_source(element.get_attribute("data-src")) else {
        log::warn!("lazy image without a data-src value");
        return;
    };
    match element.dyn_ref::<HtmlImageElement>() {
        Some(image) => image.set_src(&src),
        None => {
            if let Err(e) = element.set_attribute("src", &src) {
                log::warn!("could not set lazy image source: {:?}", e);
            }
        }
    }
    dom::remove_class(element, "loading");
    dom::add_class(element, "loaded");
}

pub fn install(document: &Document) -> Result<(), SiteError> {
    let images = dom::select_all(document, LAZY_SELECTOR)?;
    log::debug!("{} lazy images", images.len());
    dom::watch_once(&images, None, |element| load(&element))
}
