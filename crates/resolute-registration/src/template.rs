//! Argument templates for the registration engine.
//!
//! A template is the engine's command line with `<%%KEY%%>` placeholders.
//! Callers can replace the whole invocation through configuration while the
//! driver only fills in the file locations it owns.

use std::fmt;
use tracing::warn;

/// Built-in recipe: 3-D symmetric normalisation driven by cross-correlation,
/// three resolution levels, Gaussian regularisation.
pub const DEFAULT_TEMPLATE: &str =
    "3 -m CC[<%%REF%%>,<%%FLOAT%%>,1,4] -i 10x5x2 -o <%%PREFIX%%> -t SyN[0.5] -r Gauss[3,0] -G";

const OPEN: &str = "<%%";
const CLOSE: &str = "%%>";

/// Placeholder text for `key`, e.g. `<%%REF%%>`.
pub fn placeholder(key: &str) -> String {
    format!("{OPEN}{key}{CLOSE}")
}

/// An engine command line with pending placeholder substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTemplate {
    text: String,
    missing: Vec<String>,
}

impl ArgumentTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            missing: Vec::new(),
        }
    }

    /// Replace every occurrence of `<%%key%%>` with `value`.
    ///
    /// A key that does not occur leaves the text untouched and is logged as a
    /// warning; returns whether a replacement happened.
    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        let target = placeholder(key);
        if !self.text.contains(&target) {
            warn!("Replacement key: {} not found!", target);
            self.missing.push(key.to_string());
            return false;
        }
        self.text = self.text.replace(&target, value);
        true
    }

    /// Keys passed to [`insert`](Self::insert) that had no placeholder.
    pub fn missing_keys(&self) -> &[String] {
        &self.missing
    }

    /// Placeholder keys still present in the text, in order of appearance.
    pub fn unresolved_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find(OPEN) {
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(CLOSE) else {
                break;
            };
            keys.push(after[..end].to_string());
            rest = &after[end + CLOSE.len()..];
        }
        keys
    }

    /// Current text, substitutions applied so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Split into engine arguments on whitespace runs; never yields empty tokens.
    pub fn tokenize(&self) -> Vec<String> {
        self.text.split_whitespace().map(str::to_string).collect()
    }
}

impl Default for ArgumentTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl fmt::Display for ArgumentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
