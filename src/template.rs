//! URL templating around the identifier placeholder
//!
//! Job URLs are stored with a placeholder (by default `${serial-number}`)
//! standing for the current identifier's primary component. All substitution
//! in either direction goes through [`UrlTemplate`].

/// Placeholder substitution for job URLs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTemplate {
    placeholder: String,
}

impl UrlTemplate {
    /// Create a template helper for the given placeholder token
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// The placeholder token
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Substitute every placeholder occurrence with the primary component
    pub fn fill(&self, template: &str, primary: &str) -> String {
        template.replace(&self.placeholder, primary)
    }

    /// Turn a concrete URL back into a template
    ///
    /// Only the first occurrence of the primary component is replaced, so
    /// query values that happen to repeat it are left alone.
    pub fn templatize(&self, url: &str, primary: &str) -> String {
        if primary.is_empty() {
            return url.to_string();
        }
        url.replacen(primary, &self.placeholder, 1)
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self::new("${serial-number}")
    }
}
