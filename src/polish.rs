use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_sys::{Document, ErrorEvent};

use crate::dom;
use crate::error::SiteError;
use crate::reveal::STAGGER_CLASS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLift {
    Raised,
    Resting,
}

impl CardLift {
    pub fn transform(self) -> &'static str {
        match self {
            CardLift::Raised => "translateY(-15px) scale(1.02)",
            CardLift::Resting => "translateY(0) scale(1)",
        }
    }

    pub fn shadow(self) -> &'static str {
        match self {
            CardLift::Raised => "0 25px 70px rgba(59, 130, 246, 0.15)",
            CardLift::Resting => "",
        }
    }
}

/// `transition-delay` for the `index`th grid child.
pub fn grid_delay(index: usize) -> String {
    format!("{:.1}s", index as f64 * 0.1)
}

pub fn install_hover_cards(document: &Document) -> Result<(), SiteError> {
    for card in dom::select_all(document, ".service-card, .feature-card")? {
        for (event, lift) in [("mouseenter", CardLift::Raised), ("mouseleave", CardLift::Resting)] {
            let target = card.clone();
            dom::listen(&card, event, move |_| {
                dom::set_style(&target, "transform", lift.transform());
                dom::set_style(&target, "box-shadow", lift.shadow());
            })?;
        }
    }
    Ok(())
}

/// Fades the body in and staggers `.grid` children once the DOM is ready.
pub fn install_page_load(document: &Document) -> Result<(), SiteError> {
    let doc = document.clone();
    dom::on_dom_ready(document, move || {
        let Ok(body) = dom::body(&doc) else {
            return;
        };
        Timeout::new(100, move || {
            dom::set_style(&body, "opacity", "1");
            dom::add_class(&body, "loaded");
        })
        .forget();

        for (index, item) in dom::select_all(&doc, ".grid > *").unwrap_or_default().iter().enumerate() {
            if item.class_list().contains(STAGGER_CLASS) {
                dom::set_style(item, "transition-delay", &grid_delay(index));
            }
        }
        log::info!("site enhancements loaded");
    })
}

/// Uncaught script errors go to the console and nowhere else.
pub fn install_error_log() -> Result<(), SiteError> {
    let window = dom::window()?;
    dom::listen(&window, "error", |event| match event.dyn_ref::<ErrorEvent>() {
        Some(error) => gloo_console::error!(format!(
            "script error: {} ({}:{})",
            error.message(),
            error.filename(),
            error.lineno()
        )),
        None => gloo_console::error!("script error"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_delays_step_by_a_tenth() {
        assert_eq!(grid_delay(0), "0.0s");
        assert_eq!(grid_delay(3), "0.3s");
        assert_eq!(grid_delay(12), "1.2s");
    }

    #[test]
    fn resting_card_clears_glow() {
        assert_eq!(CardLift::Resting.shadow(), "");
        assert_ne!(CardLift::Raised.transform(), CardLift::Resting.transform());
    }
}
