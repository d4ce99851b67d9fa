//! Prompt composition.
//!
//! The model receives the user's question on the first line, followed by the
//! file contents introduced by a short prefix.

use std::fmt;

/// Prefix placed before the file contents unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "The code is: ";

/// The composed prompt sent to the inference process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Compose `<question>\n<prefix><contents>`.
    pub fn compose(question: &str, prefix: &str, contents: &str) -> Self {
        let mut text = String::with_capacity(question.len() + 1 + prefix.len() + contents.len());
        text.push_str(question);
        text.push('\n');
        text.push_str(prefix);
        text.push_str(contents);
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
