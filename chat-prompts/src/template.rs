//! `{{variable}}` substitution for system instructions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PromptError, PromptResult};

/// A template string with `{{name}}` placeholders.
///
/// Every placeholder is required at render time. Whitespace inside the braces
/// is ignored, so `{{ name }}` and `{{name}}` are the same variable.
///
/// ```
/// use std::collections::HashMap;
/// use chat_prompts::PromptTemplate;
///
/// let template = PromptTemplate::new("You are {{assistant_name}}.");
/// let vars = HashMap::from([("assistant_name".to_owned(), "Lach's Bot".to_owned())]);
/// assert_eq!(template.render(&vars).unwrap(), "You are Lach's Bot.");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wraps the supplied text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Lists placeholder names in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Unterminated`] for an unclosed `{{`.
    pub fn placeholders(&self) -> PromptResult<Vec<String>> {
        let mut names = Vec::new();
        for segment in segments(&self.template) {
            if let Segment::Placeholder(name) = segment? {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }

    /// Renders the template.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] when a placeholder has no
    /// value and [`PromptError::Unterminated`] for an unclosed `{{`.
    pub fn render(&self, vars: &HashMap<String, String>) -> PromptResult<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in segments(&self.template) {
            match segment? {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = vars.get(name).ok_or_else(|| PromptError::MissingVariable {
                        name: name.to_owned(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl From<&str> for PromptTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn segments(template: &str) -> impl Iterator<Item = PromptResult<Segment<'_>>> {
    let mut rest = template;
    let mut consumed = 0;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(open) = rest.find("{{") else {
            let text = rest;
            rest = "";
            return Some(Ok(Segment::Text(text)));
        };
        if open > 0 {
            let text = &rest[..open];
            rest = &rest[open..];
            consumed += open;
            return Some(Ok(Segment::Text(text)));
        }
        let Some(close) = rest.find("}}") else {
            let offset = consumed;
            rest = "";
            return Some(Err(PromptError::Unterminated { offset }));
        };
        let name = rest[2..close].trim();
        rest = &rest[close + 2..];
        consumed += close + 2;
        Some(Ok(Segment::Placeholder(name)))
    })
}
