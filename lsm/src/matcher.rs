//! File selection rule
//!
//! Decides which pipeline files reach the layout applier. Patterns use glob
//! syntax against `/`-separated relative paths; a leading `!` negates.

use eyre::{Context, Result};
use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::config::MatchSettings;

#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: Pattern,
    negated: bool,
    has_slash: bool,
}

/// Compiled `match` patterns plus their options
#[derive(Debug, Clone)]
pub struct FileMatcher {
    patterns: Vec<CompiledPattern>,
    options: MatchOptions,
    match_base: bool,
}

impl FileMatcher {
    /// Compile patterns; an invalid pattern is a configuration error
    pub fn new<S: AsRef<str>>(patterns: &[S], settings: MatchSettings) -> Result<Self> {
        debug!(count = patterns.len(), ?settings, "FileMatcher::new: called");
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let raw = raw.as_ref();
            let (negated, text) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let pattern = Pattern::new(text).context(format!("Invalid match pattern '{}'", raw))?;
            compiled.push(CompiledPattern {
                pattern,
                negated,
                has_slash: text.contains('/'),
            });
        }

        Ok(Self {
            patterns: compiled,
            options: MatchOptions {
                case_sensitive: !settings.nocase,
                require_literal_separator: true,
                require_literal_leading_dot: !settings.dot,
            },
            match_base: settings.match_base,
        })
    }

    /// Whether a pipeline file name is selected
    ///
    /// At least one positive pattern must match and no negated pattern may.
    pub fn matches(&self, filename: &str) -> bool {
        let path = filename.replace('\\', "/");
        let base = path.rsplit('/').next().unwrap_or(&path);

        let mut selected = false;
        for compiled in &self.patterns {
            let candidate = if self.match_base && !compiled.has_slash { base } else { path.as_str() };
            if !compiled.pattern.matches_with(candidate, self.options) {
                continue;
            }
            if compiled.negated {
                debug!(%filename, pattern = %compiled.pattern, "FileMatcher::matches: excluded");
                return false;
            }
            selected = true;
        }
        selected
    }
}
