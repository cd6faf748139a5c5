use log::{debug, error, info};

mod config;
mod counter;
mod dom;
mod error;
mod form;
mod media;
mod navigation;
mod notification;
mod polish;
mod pwa;
mod reveal;
mod scroll;

use config::SiteConfig;
use error::SiteError;

fn report(component: &str, result: Result<(), SiteError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_degradation() => debug!("{} skipped: {}", component, e),
        Err(e) => error!("{} failed to start: {}", component, e),
    }
}

fn start() -> Result<(), SiteError> {
    let window = dom::window()?;
    let document = dom::document()?;
    let config = SiteConfig::load(&document);

    // Listener registration order matters: later scroll handlers read the
    // state earlier ones left behind.
    report("reveal", reveal::install(&document, &config.reveal));
    report("counters", counter::install(&document, &config.counter));
    report("navigation", navigation::install(&document, &config.navigation));
    report("anchors", scroll::install_anchors(&document, &config.scroll));
    report("scroll", scroll::install(&document, &config.scroll));
    report("page load", polish::install_page_load(&document));
    report("forms", form::install(&document, &config.form, config.notification));
    report("hover cards", polish::install_hover_cards(&document));
    report("lazy images", media::install(&document));
    report("dropdowns", navigation::install_dropdown_keys(&document));
    report("error log", polish::install_error_log());
    report("service worker", pwa::install(&window, &config.service_worker));

    Ok(())
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting site enhancements");
    if let Err(e) = start() {
        error!("site enhancements unavailable: {}", e);
    }
}
