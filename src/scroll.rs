use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use serde::Deserialize;
use web_sys::{Document, Element, ScrollBehavior, ScrollToOptions, Window};

use crate::dom;
use crate::error::SiteError;

const ELEVATED_CLASSES: [&str; 3] = ["bg-white/95", "backdrop-blur-lg", "shadow-2xl"];
const ELEVATED_BORDER: &str = "1px solid rgba(226, 232, 240, 0.8)";
const PLAIN_BORDER: &str = "1px solid #e2e8f0";
const NAVBAR_TRANSITION: &str = "transform 0.3s cubic-bezier(0.4, 0, 0.2, 1)";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub elevate_after_px: f64,
    pub hide_after_px: f64,
    pub shape_speed: f64,
    pub card_base_speed: f64,
    pub card_speed_step: f64,
    pub progress_debounce_ms: u32,
    pub anchor_offset_px: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            elevate_after_px: 50.0,
            hide_after_px: 300.0,
            shape_speed: 0.2,
            card_base_speed: 0.1,
            card_speed_step: 0.05,
            progress_debounce_ms: 10,
            anchor_offset_px: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavbarFrame {
    pub elevated: bool,
    pub hidden: bool,
}

/// Navbar state derived from successive scroll positions.
#[derive(Debug, Clone)]
pub struct ScrollReactor {
    last_scroll_top: f64,
    elevate_after: f64,
    hide_after: f64,
}

impl ScrollReactor {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            last_scroll_top: 0.0,
            elevate_after: config.elevate_after_px,
            hide_after: config.hide_after_px,
        }
    }

    pub fn observe(&mut self, scroll_top: f64) -> NavbarFrame {
        let scrolling_down = scroll_top > self.last_scroll_top;
        let frame = NavbarFrame {
            elevated: scroll_top > self.elevate_after,
            hidden: scrolling_down && scroll_top > self.hide_after,
        };
        self.last_scroll_top = scroll_top;
        frame
    }

    pub fn last_scroll_top(&self) -> f64 {
        self.last_scroll_top
    }
}

pub fn card_speed(index: usize, config: &ScrollConfig) -> f64 {
    config.card_base_speed + index as f64 * config.card_speed_step
}

pub fn translate_y(px: f64) -> String {
    format!("translateY({}px)", px)
}

/// Percentage of the page scrolled, clamped to `0..=100`. A page that does
/// not scroll reports 0.
pub fn scroll_progress(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> f64 {
    let scrollable = scroll_height - viewport_height;
    if scrollable <= 0.0 || !scrollable.is_finite() {
        return 0.0;
    }
    (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
}

/// Document offset that puts an element `header_offset` below the top edge.
pub fn anchor_destination(element_top: f64, page_offset: f64, header_offset: f64) -> f64 {
    element_top + page_offset - header_offset
}

/// Trailing-edge debounce: only the last call in a burst runs, `wait_ms`
/// after the burst ends.
pub struct Debouncer {
    wait_ms: u32,
    pending: RefCell<Option<Timeout>>,
}

impl Debouncer {
    pub fn new(wait_ms: u32) -> Self {
        Self {
            wait_ms,
            pending: RefCell::new(None),
        }
    }

    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        // dropping the previous timeout cancels it
        *self.pending.borrow_mut() = Some(Timeout::new(self.wait_ms, f));
    }
}

fn scroll_top(window: &Window, document: &Document) -> f64 {
    match window.page_y_offset() {
        Ok(offset) if offset > 0.0 => offset,
        _ => document
            .document_element()
            .map(|root| root.scroll_top() as f64)
            .unwrap_or(0.0),
    }
}

fn viewport_height(window: &Window) -> f64 {
    window
        .inner_height()
        .ok()
        .and_then(|height| height.as_f64())
        .unwrap_or(0.0)
}

fn smooth_scroll_to(window: &Window, top: f64) {
    let options = ScrollToOptions::new();
    options.set_top(top);
    options.set_behavior(ScrollBehavior::Smooth);
    window.scroll_to_with_scroll_to_options(&options);
}

fn paint_navbar(navbar: &Element, frame: NavbarFrame) {
    for class in ELEVATED_CLASSES {
        dom::set_class(navbar, class, frame.elevated);
    }
    let border = if frame.elevated { ELEVATED_BORDER } else { PLAIN_BORDER };
    dom::set_style(navbar, "border-bottom", border);

    let transform = if frame.hidden { "translateY(-100%)" } else { "translateY(0)" };
    dom::set_style(navbar, "transform", transform);
    dom::set_style(navbar, "transition", NAVBAR_TRANSITION);
}

fn paint_parallax(shapes: &[Element], cards: &[Element], scrolled: f64, config: &ScrollConfig) {
    for shape in shapes {
        dom::set_style(shape, "transform", &translate_y(scrolled * config.shape_speed));
    }
    for (index, card) in cards.iter().enumerate() {
        dom::set_style(card, "transform", &translate_y(scrolled * card_speed(index, config)));
    }
}

fn paint_progress(bars: &[Element], percent: f64) {
    let width = format!("{}%", percent);
    for bar in bars {
        dom::set_style(bar, "width", &width);
    }
}

/// Navbar, parallax and progress-bar listeners, registered in that order.
pub fn install(document: &Document, config: &ScrollConfig) -> Result<(), SiteError> {
    let window = dom::window()?;
    let reactor = Rc::new(RefCell::new(ScrollReactor::new(config)));

    match document.query_selector("nav")? {
        Some(navbar) => {
            let window_ref = window.clone();
            let doc = document.clone();
            let reactor = reactor.clone();
            dom::listen(&window, "scroll", move |_| {
                let frame = reactor.borrow_mut().observe(scroll_top(&window_ref, &doc));
                paint_navbar(&navbar, frame);
            })?;
        }
        None => log::debug!("no <nav> on this page, navbar reactions skipped"),
    }

    {
        let shapes = dom::select_all(document, ".floating-shapes")?;
        let cards = dom::select_all(document, ".floating-card")?;
        let window_ref = window.clone();
        let config = config.clone();
        dom::listen(&window, "scroll", move |_| {
            let scrolled = window_ref.page_y_offset().unwrap_or(0.0);
            paint_parallax(&shapes, &cards, scrolled, &config);
        })?;
    }

    {
        let bars = Rc::new(dom::select_all(document, ".scroll-progress")?);
        let debouncer = Debouncer::new(config.progress_debounce_ms);
        let window_ref = window.clone();
        let doc = document.clone();
        dom::listen(&window, "scroll", move |_| {
            let bars = bars.clone();
            let window = window_ref.clone();
            let doc = doc.clone();
            debouncer.call(move || {
                let scroll_height = doc
                    .document_element()
                    .map(|root| root.scroll_height() as f64)
                    .unwrap_or(0.0);
                let percent = scroll_progress(
                    window.page_y_offset().unwrap_or(0.0),
                    scroll_height,
                    viewport_height(&window),
                );
                paint_progress(&bars, percent);
            });
        })?;
    }

    log::info!("scroll reactions ready");
    Ok(())
}

/// Smooth scrolling for in-page anchors and the hero scroll indicator.
pub fn install_anchors(document: &Document, config: &ScrollConfig) -> Result<(), SiteError> {
    let window = dom::window()?;

    for anchor in dom::select_all(document, "a[href^=\"#\"]")? {
        let window = window.clone();
        let doc = document.clone();
        let header_offset = config.anchor_offset_px;
        let href = anchor.get_attribute("href").unwrap_or_default();
        dom::listen(&anchor, "click", move |event| {
            event.prevent_default();
            // "#" alone is not a valid selector
            let Ok(Some(target)) = doc.query_selector(&href) else {
                return;
            };
            let top = anchor_destination(
                target.get_bounding_client_rect().top(),
                window.page_y_offset().unwrap_or(0.0),
                header_offset,
            );
            smooth_scroll_to(&window, top);
        })?;
    }

    if let Some(indicator) = document.query_selector(".scroll-indicator")? {
        dom::listen(&indicator, "click", move |_| {
            smooth_scroll_to(&window, viewport_height(&window));
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navbar_elevates_past_offset() {
        let mut reactor = ScrollReactor::new(&ScrollConfig::default());
        assert!(!reactor.observe(50.0).elevated);
        assert!(reactor.observe(51.0).elevated);
        assert!(!reactor.observe(10.0).elevated);
    }

    #[test]
    fn navbar_hides_only_when_scrolling_down_deep() {
        let mut reactor = ScrollReactor::new(&ScrollConfig::default());
        assert!(!reactor.observe(250.0).hidden);
        assert!(reactor.observe(400.0).hidden);
        // scrolling back up reveals it
        assert!(!reactor.observe(380.0).hidden);
        // standing still is not scrolling down
        assert!(!reactor.observe(380.0).hidden);
        assert_eq!(reactor.last_scroll_top(), 380.0);
    }

    #[test]
    fn card_speeds_increase_per_index() {
        let config = ScrollConfig::default();
        assert!((card_speed(0, &config) - 0.1).abs() < 1e-9);
        assert!((card_speed(2, &config) - 0.2).abs() < 1e-9);
        assert_eq!(translate_y(20.0), "translateY(20px)");
        assert_eq!(translate_y(-7.5), "translateY(-7.5px)");
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(scroll_progress(0.0, 2000.0, 1000.0), 0.0);
        assert_eq!(scroll_progress(1000.0, 2000.0, 1000.0), 100.0);
        assert_eq!(scroll_progress(500.0, 2000.0, 1000.0), 50.0);
    }

    #[test]
    fn progress_on_unscrollable_page_is_zero() {
        let percent = scroll_progress(0.0, 1000.0, 1000.0);
        assert!(percent.is_finite());
        assert_eq!(percent, 0.0);
        assert_eq!(scroll_progress(10.0, 800.0, 1000.0), 0.0);
    }

    #[test]
    fn anchor_lands_below_header() {
        assert_eq!(anchor_destination(400.0, 1200.0, 100.0), 1500.0);
    }
}
