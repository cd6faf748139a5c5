use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlElement, KeyboardEvent, Node, TouchEvent};

use crate::dom;
use crate::error::SiteError;

pub const MENU_ID: &str = "mobile-menu";
pub const OPEN_BUTTON_ID: &str = "mobile-menu-btn";
pub const CLOSE_BUTTON_ID: &str = "mobile-menu-close";
pub const MENU_OPEN_CLASS: &str = "active";
pub const SCROLL_LOCK_CLASS: &str = "overflow-hidden";
pub const MENU_ITEM_SELECTOR: &str = ".mobile-nav-item";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub item_stagger_ms: u32,
    pub swipe_threshold_px: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            item_stagger_ms: 50,
            swipe_threshold_px: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    Toggle,
    LinkClicked,
    OutsideClick,
    Escape,
    Swipe(SwipeDirection),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

/// Horizontal swipes only: the horizontal travel has to beat both the
/// threshold and the vertical travel, so scrolling never opens the menu.
pub fn classify_swipe(start: TouchPoint, end: TouchPoint, threshold: f64) -> Option<SwipeDirection> {
    let dx = start.x - end.x;
    let dy = start.y - end.y;
    if dx.abs() <= dy.abs() || dx.abs() <= threshold {
        return None;
    }
    if dx > 0.0 {
        Some(SwipeDirection::Left)
    } else {
        Some(SwipeDirection::Right)
    }
}

/// Open/closed state of the mobile drawer.
#[derive(Debug, Default)]
pub struct NavigationController {
    open: bool,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Applies `event`; returns the new state when it changed.
    pub fn handle(&mut self, event: MenuEvent) -> Option<bool> {
        let next = match event {
            MenuEvent::Toggle => !self.open,
            MenuEvent::LinkClicked | MenuEvent::OutsideClick | MenuEvent::Escape => false,
            MenuEvent::Swipe(SwipeDirection::Left) => true,
            MenuEvent::Swipe(SwipeDirection::Right) => false,
        };
        if next == self.open {
            return None;
        }
        self.open = next;
        Some(next)
    }
}

/// `(delay_ms, transform)` per menu item. Closing uses the same order as
/// opening.
pub fn item_schedule(count: usize, open: bool, step_ms: u32) -> Vec<(u32, &'static str)> {
    let transform = if open { "translateX(0)" } else { "translateX(100px)" };
    (0..count).map(|index| (index as u32 * step_ms, transform)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMove {
    Next,
    Previous,
}

/// Wrap-around focus movement through `len` dropdown items.
pub fn next_focus(current: Option<usize>, len: usize, movement: FocusMove) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let index = match movement {
        FocusMove::Next => match current {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        },
        FocusMove::Previous => match current {
            Some(i) if i > 0 && i < len => i - 1,
            _ => len - 1,
        },
    };
    Some(index)
}

struct MobileMenu {
    menu: Element,
    body: HtmlElement,
    controller: RefCell<NavigationController>,
    pending: RefCell<Vec<Timeout>>,
    stagger_ms: u32,
}

impl MobileMenu {
    fn dispatch(&self, event: MenuEvent) {
        let changed = self.controller.borrow_mut().handle(event);
        if let Some(open) = changed {
            log::debug!("mobile menu {:?} -> open={}", event, open);
            self.render(open);
        }
    }

    fn is_open(&self) -> bool {
        self.controller.borrow().is_open()
    }

    fn render(&self, open: bool) {
        dom::set_class(&self.menu, MENU_OPEN_CLASS, open);
        dom::set_class(&self.body, SCROLL_LOCK_CLASS, open);

        let items = dom::select_all_in(&self.menu, MENU_ITEM_SELECTOR).unwrap_or_default();
        let timeouts: Vec<Timeout> = item_schedule(items.len(), open, self.stagger_ms)
            .into_iter()
            .zip(items)
            .map(|((delay, transform), item)| {
                Timeout::new(delay, move || dom::set_style(&item, "transform", transform))
            })
            .collect();
        // replacing drops (and cancels) any stagger still running
        *self.pending.borrow_mut() = timeouts;
    }
}

fn event_node(event: &Event) -> Option<Node> {
    event.target().and_then(|target| target.dyn_into::<Node>().ok())
}

pub fn install(document: &Document, config: &NavigationConfig) -> Result<(), SiteError> {
    let menu = document
        .get_element_by_id(MENU_ID)
        .ok_or(SiteError::MissingElement(MENU_ID))?;
    let open_button = document.get_element_by_id(OPEN_BUTTON_ID);
    let close_button = document.get_element_by_id(CLOSE_BUTTON_ID);

    let nav = Rc::new(MobileMenu {
        menu: menu.clone(),
        body: dom::body(document)?,
        controller: RefCell::new(NavigationController::new()),
        pending: RefCell::new(Vec::new()),
        stagger_ms: config.item_stagger_ms,
    });

    for button in open_button.iter().chain(close_button.iter()) {
        let nav = nav.clone();
        dom::listen(button, "click", move |_| nav.dispatch(MenuEvent::Toggle))?;
    }

    for link in dom::select_all_in(&menu, "a")? {
        let nav = nav.clone();
        dom::listen(&link, "click", move |_| nav.dispatch(MenuEvent::LinkClicked))?;
    }

    {
        let nav = nav.clone();
        let open_button = open_button.clone();
        dom::listen(document, "click", move |event| {
            if !nav.is_open() {
                return;
            }
            let Some(target) = event_node(&event) else {
                return;
            };
            let in_menu = nav.menu.contains(Some(&target));
            let on_button = open_button
                .as_ref()
                .map_or(false, |button| button.contains(Some(&target)));
            if !in_menu && !on_button {
                nav.dispatch(MenuEvent::OutsideClick);
            }
        })?;
    }

    {
        let nav = nav.clone();
        dom::listen(document, "keydown", move |event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                if event.key() == "Escape" && nav.is_open() {
                    nav.dispatch(MenuEvent::Escape);
                }
            }
        })?;
    }

    let touch_start: Rc<Cell<Option<TouchPoint>>> = Rc::new(Cell::new(None));
    {
        let touch_start = touch_start.clone();
        dom::listen(document, "touchstart", move |event| {
            touch_start.set(first_touch(&event));
        })?;
    }
    {
        let threshold = config.swipe_threshold_px;
        dom::listen(document, "touchend", move |event| {
            let (Some(start), Some(end)) = (touch_start.take(), first_touch(&event)) else {
                return;
            };
            if let Some(direction) = classify_swipe(start, end, threshold) {
                nav.dispatch(MenuEvent::Swipe(direction));
            }
        })?;
    }

    log::info!("mobile navigation ready");
    Ok(())
}

fn first_touch(event: &Event) -> Option<TouchPoint> {
    let touch = event.dyn_ref::<TouchEvent>()?.changed_touches().get(0)?;
    Some(TouchPoint {
        x: touch.screen_x() as f64,
        y: touch.screen_y() as f64,
    })
}

/// Arrow-key focus movement inside whichever `.dropdown` is hovered.
pub fn install_dropdown_keys(document: &Document) -> Result<(), SiteError> {
    let doc = document.clone();
    dom::listen(document, "keydown", move |event| {
        let Some(key_event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let movement = match key_event.key().as_str() {
            "ArrowDown" => FocusMove::Next,
            "ArrowUp" => FocusMove::Previous,
            _ => return,
        };
        let Ok(Some(dropdown)) = doc.query_selector(".dropdown:hover") else {
            return;
        };
        event.prevent_default();

        let items = dom::select_all_in(&dropdown, ".dropdown-item").unwrap_or_default();
        let active = doc.active_element();
        let current = items.iter().position(|item| Some(item) == active.as_ref());
        if let Some(index) = next_focus(current, items.len(), movement) {
            if let Some(item) = items[index].dyn_ref::<HtmlElement>() {
                if let Err(e) = item.focus() {
                    log::warn!("could not focus dropdown item: {:?}", e);
                }
            }
        }
    })
}
