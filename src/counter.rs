use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use serde::Deserialize;
use web_sys::{Document, Element};

use crate::dom;
use crate::error::SiteError;

pub const TARGET_ATTRIBUTE: &str = "data-target";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub duration_ms: u32,
    pub tick_ms: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2500,
            tick_ms: 16,
        }
    }
}

/// Linear count-up from zero to `target`.
#[derive(Debug, Clone)]
pub struct CountUp {
    target: f64,
    step: f64,
    current: f64,
    settled: bool,
}

impl CountUp {
    pub fn new(target: u64, config: &CounterConfig) -> Self {
        let ticks = config.duration_ms as f64 / config.tick_ms.max(1) as f64;
        let target = target as f64;
        Self {
            target,
            step: if ticks > 0.0 { target / ticks } else { target },
            current: 0.0,
            settled: false,
        }
    }

    /// Advances one tick and returns the value to display.
    pub fn tick(&mut self) -> u64 {
        if !self.settled {
            self.current += self.step;
            if self.current >= self.target {
                self.current = self.target;
                self.settled = true;
            }
        }
        self.current.floor() as u64
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

/// Leading-integer parse of the target attribute; `"1500+"` reads as 1500.
pub fn parse_target(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Groups digits in threes with commas: `1234567` -> `"1,234,567"`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn start(element: Element, config: &CounterConfig) {
    let Some(target) = element
        .get_attribute(TARGET_ATTRIBUTE)
        .as_deref()
        .and_then(parse_target)
    else {
        log::warn!("counter without a numeric {}", TARGET_ATTRIBUTE);
        return;
    };

    let mut animation = CountUp::new(target, config);
    let handle: Rc<RefCell<Option<Interval>>> = Rc::new(RefCell::new(None));
    let handle_clone = handle.clone();

    let interval = Interval::new(config.tick_ms, move || {
        let value = animation.tick();
        element.set_text_content(Some(&group_thousands(value)));
        if animation.is_settled() {
            if let Some(interval) = handle_clone.borrow_mut().take() {
                drop(interval);
            }
        }
    });

    *handle.borrow_mut() = Some(interval);
}

pub fn install(document: &Document, config: &CounterConfig) -> Result<(), SiteError> {
    let counters = dom::select_all(document, ".counter")?;
    log::debug!("watching {} counters", counters.len());

    let config = config.clone();
    dom::watch_once(&counters, None, move |element| start(element, &config))
}
