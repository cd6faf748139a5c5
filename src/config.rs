use log::Level;
use serde::Deserialize;
use web_sys::Document;

use crate::counter::CounterConfig;
use crate::form::FormConfig;
use crate::navigation::NavigationConfig;
use crate::notification::ToastTimings;
use crate::pwa::ServiceWorkerConfig;
use crate::reveal::RevealConfig;
use crate::scroll::ScrollConfig;

/// Id of the optional `<script type="application/json">` block a page can
/// use to override any of the defaults below.
pub const CONFIG_ELEMENT_ID: &str = "site-config";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub reveal: RevealConfig,
    pub counter: CounterConfig,
    pub navigation: NavigationConfig,
    pub scroll: ScrollConfig,
    pub form: FormConfig,
    pub notification: ToastTimings,
    pub service_worker: ServiceWorkerConfig,
}

impl SiteConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(document: &Document) -> Self {
        let Some(raw) = document
            .get_element_by_id(CONFIG_ELEMENT_ID)
            .and_then(|element| element.text_content())
        else {
            return Self::default();
        };
        match Self::from_json(&raw) {
            Ok(config) => {
                log::debug!("using page config overrides");
                config
            }
            Err(e) => {
                log::warn!("ignoring malformed #{}: {}", CONFIG_ELEMENT_ID, e);
                Self::default()
            }
        }
    }
}

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}
