//! Renderer option tokens.
//!
//! Options are opaque to this crate: each one contributes an ordered list of
//! command-line tokens which are passed to the renderer verbatim.

/// Something that contributes command-line tokens to the renderer.
pub trait PdfOption {
    /// The tokens this option adds, in order.
    fn tokens(&self) -> Vec<String>;
}

/// A single renderer flag with an optional value.
///
/// # Example
///
/// ```
/// use wkpdf::{Flag, PdfOption};
///
/// assert_eq!(Flag::new("--grayscale").tokens(), vec!["--grayscale"]);
/// assert_eq!(
///     Flag::with_value("--page-size", "A4").tokens(),
///     vec!["--page-size", "A4"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    name: String,
    value: Option<String>,
}

impl Flag {
    /// Create a flag without a value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create a flag followed by a value token.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl PdfOption for Flag {
    fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.name.clone()];
        if let Some(ref value) = self.value {
            tokens.push(value.clone());
        }
        tokens
    }
}

impl PdfOption for &str {
    fn tokens(&self) -> Vec<String> {
        vec![(*self).to_string()]
    }
}

impl PdfOption for String {
    fn tokens(&self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<T: PdfOption> PdfOption for Vec<T> {
    fn tokens(&self) -> Vec<String> {
        self.iter().flat_map(PdfOption::tokens).collect()
    }
}

/// Ordered, append-only list of option tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    tokens: Vec<String>,
}

impl OptionSet {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the tokens of a single option.
    pub fn push<O: PdfOption>(&mut self, option: O) {
        self.tokens.extend(option.tokens());
    }

    /// Append the tokens of each option, preserving order.
    pub fn extend<I, O>(&mut self, options: I)
    where
        I: IntoIterator<Item = O>,
        O: PdfOption,
    {
        for option in options {
            self.push(option);
        }
    }

    /// All tokens in insertion order.
    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if no tokens have been added.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_tokens() {
        assert_eq!(Flag::new("-g").tokens(), vec!["-g".to_string()]);
        assert_eq!(
            Flag::with_value("--margin-top", "10mm").tokens(),
            vec!["--margin-top".to_string(), "10mm".to_string()]
        );
    }

    #[test]
    fn test_option_set_preserves_order() {
        let mut set = OptionSet::new();
        set.push(Flag::with_value("--page-size", "A4"));
        set.extend(["--grayscale", "--no-outline"]);
        set.push(vec![Flag::new("-q"), Flag::with_value("--dpi", "300")]);

        assert_eq!(
            set.as_slice(),
            &["--page-size", "A4", "--grayscale", "--no-outline", "-q", "--dpi", "300"]
        );
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn test_empty_option_set() {
        let set = OptionSet::default();
        assert!(set.is_empty());
        assert!(set.as_slice().is_empty());
    }
}
