use serde::{Deserialize, Serialize};

/// Message text with `{{name}}` placeholders, e.g. `{{from}}`, `{{body}}`, `{{time}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTemplate(String);

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitutes known placeholders in one pass; substituted values are not
    /// re-scanned and unknown placeholders are left as written.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &after[..close];
            match vars.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after[close + 2..];
        }

        out.push_str(rest);
        out
    }
}

impl From<&str> for MessageTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
