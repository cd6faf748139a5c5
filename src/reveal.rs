use gloo_timers::callback::Timeout;
use serde::Deserialize;
use web_sys::{Document, Element};

use crate::dom::{self, WatchOptions};
use crate::error::SiteError;

pub const ANIMATION_CLASSES: [&str; 5] = [
    "fade-in",
    "slide-in-left",
    "slide-in-right",
    "scale-in",
    "fade-in-up",
];

/// Terminal state class. Never removed once added.
pub const REVEALED_CLASS: &str = "visible";

/// Elements with this class pull their siblings in with a stagger.
pub const STAGGER_CLASS: &str = "fade-in-up";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub threshold: f64,
    pub root_margin: String,
    pub stagger_ms: u32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin: "0px 0px -100px 0px".to_string(),
            stagger_ms: 100,
        }
    }
}

pub fn animation_selector() -> String {
    ANIMATION_CLASSES
        .iter()
        .map(|class| format!(".{}", class))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Given which siblings carry the stagger class, returns `(index, delay)`
/// for each one that should be revealed. The delay follows the sibling's
/// position among *all* siblings, so gaps keep their timing.
pub fn stagger_plan(staggered: &[bool], step_ms: u32) -> Vec<(usize, u32)> {
    staggered
        .iter()
        .enumerate()
        .filter(|(_, flagged)| **flagged)
        .map(|(index, _)| (index, index as u32 * step_ms))
        .collect()
}

fn reveal(element: &Element, step_ms: u32) {
    dom::add_class(element, REVEALED_CLASS);

    if !element.class_list().contains(STAGGER_CLASS) {
        return;
    }
    let Some(parent) = element.parent_element() else {
        return;
    };

    let siblings = dom::collection_elements(&parent.children());
    let flags: Vec<bool> = siblings
        .iter()
        .map(|sibling| sibling.class_list().contains(STAGGER_CLASS))
        .collect();

    for (index, delay) in stagger_plan(&flags, step_ms) {
        let sibling = siblings[index].clone();
        Timeout::new(delay, move || {
            dom::add_class(&sibling, REVEALED_CLASS);
        })
        .forget();
    }
}

pub fn install(document: &Document, config: &RevealConfig) -> Result<(), SiteError> {
    let targets = dom::select_all(document, &animation_selector())?;
    log::debug!("watching {} animatable elements", targets.len());

    let options = WatchOptions {
        threshold: config.threshold,
        root_margin: config.root_margin.clone(),
    };
    let step_ms = config.stagger_ms;
    dom::watch_once(&targets, Some(&options), move |element| {
        reveal(&element, step_ms);
    })
}
