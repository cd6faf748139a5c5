use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::js_sys::Reflect;
use web_sys::{ServiceWorkerRegistration, Window};

use crate::dom;
use crate::error::SiteError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceWorkerConfig {
    pub enabled: bool,
    pub script_url: String,
}

impl Default for ServiceWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script_url: "/sw.js".to_string(),
        }
    }
}

fn register(window: &Window, script_url: String) {
    let promise = window.navigator().service_worker().register(&script_url);
    spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(registration) => {
                let scope = registration
                    .dyn_into::<ServiceWorkerRegistration>()
                    .map(|r| r.scope())
                    .unwrap_or_default();
                log::info!("service worker registered for {}", scope);
            }
            Err(e) => log::warn!("service worker registration failed: {:?}", e),
        }
    });
}

/// Registers the worker after `load`. Missing support and failures are
/// only logged.
pub fn install(window: &Window, config: &ServiceWorkerConfig) -> Result<(), SiteError> {
    if !config.enabled {
        log::debug!("service worker disabled");
        return Ok(());
    }
    let supported = Reflect::has(&window.navigator(), &JsValue::from_str("serviceWorker")).unwrap_or(false);
    if !supported {
        log::info!("service workers not supported, skipping registration");
        return Ok(());
    }

    let document = dom::document()?;
    if document.ready_state() == "complete" {
        register(window, config.script_url.clone());
        return Ok(());
    }
    let script_url = config.script_url.clone();
    let window_ref = window.clone();
    let mut pending = Some(script_url);
    dom::listen(window, "load", move |_| {
        if let Some(script_url) = pending.take() {
            register(&window_ref, script_url);
        }
    })
}
