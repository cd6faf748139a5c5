use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("no window available")]
    NoWindow,
    #[error("no document available")]
    NoDocument,
    #[error("missing element `{0}`")]
    MissingElement(&'static str),
    #[error("browser lacks `{0}`")]
    Unsupported(&'static str),
    #[error("browser call failed: {0}")]
    Js(String),
}

impl SiteError {
    /// Markup or browser features the page can live without. The component
    /// just stays off.
    pub fn is_degradation(&self) -> bool {
        matches!(self, SiteError::MissingElement(_) | SiteError::Unsupported(_))
    }
}

impl From<JsValue> for SiteError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value));
        SiteError::Js(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_names_the_selector() {
        let err = SiteError::MissingElement("mobile-menu");
        assert_eq!(err.to_string(), "missing element `mobile-menu`");
    }

    #[test]
    fn missing_observer_support_is_a_quiet_degradation() {
        let err = SiteError::Unsupported("IntersectionObserver");
        assert!(err.is_degradation());
        assert_eq!(err.to_string(), "browser lacks `IntersectionObserver`");
        assert!(SiteError::MissingElement("mobile-menu").is_degradation());
        assert!(!SiteError::Js("TypeError".to_string()).is_degradation());
        assert!(!SiteError::NoDocument.is_degradation());
    }
}
