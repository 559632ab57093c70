//! Banned and moderated word patterns.

use regex::Regex;
use tracing::warn;

/// Regular expressions loaded from `ban.txt` and `mod.txt`.
#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    banned: Option<Regex>,
    moderated: Option<Regex>,
}

impl WordFilter {
    pub fn parse(banned: &str, moderated: &str) -> Self {
        Self {
            banned: compile(banned, "ban"),
            moderated: compile(moderated, "mod"),
        }
    }

    /// Whether the text contains a banned word.
    pub fn is_banned(&self, text: &str) -> bool {
        self.banned.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Whether the text needs manual review before publishing.
    pub fn needs_review(&self, text: &str) -> bool {
        self.moderated.as_ref().is_some_and(|re| re.is_match(text))
    }
}

fn compile(pattern: &str, name: &str) -> Option<Regex> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Invalid {} word pattern: {}", name, e);
            None
        }
    }
}
