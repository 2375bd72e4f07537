//! Layout middleware
//!
//! The host-facing surface: a factory taking plugin options, a `before`
//! phase that builds a fresh environment and template store, an `each`
//! phase applied to every selected file, and the match rule the host uses
//! to select files.

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::applier::{ApplyOutcome, apply_layout};
use crate::config::{LayoutsConfig, PluginOptions, normalize};
use crate::environment::{HandlebarsEnvironment, RegistrationFailure, register_extensions};
use crate::file::{ContentFile, FileSet};
use crate::matcher::FileMatcher;
use crate::store::TemplateStore;

/// Middleware name reported to hosts
pub const PLUGIN_NAME: &str = "handlebars-layouts";

/// Handlebars layout middleware
#[derive(Debug, Clone)]
pub struct HandlebarsLayouts {
    config: LayoutsConfig,
    matcher: FileMatcher,
}

impl HandlebarsLayouts {
    /// Build the middleware from (possibly partial) options
    ///
    /// Fails only when a `match` pattern is not a valid glob.
    pub fn new(options: Option<PluginOptions>) -> Result<Self> {
        debug!("HandlebarsLayouts::new: called");
        let config = normalize(options);
        let matcher = FileMatcher::new(&config.match_patterns, config.match_options)?;
        Ok(Self { config, matcher })
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn config(&self) -> &LayoutsConfig {
        &self.config
    }

    /// The file selection rule for the host
    pub fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    /// Build phase setup: a new environment and template store
    ///
    /// Every call starts from scratch, so concurrent builds never share state.
    pub fn before(&self) -> Result<LayoutSession> {
        debug!("HandlebarsLayouts::before: called");
        let mut env = HandlebarsEnvironment::new();
        let registration_failures = register_extensions(&mut env, &self.config);

        debug!("Loading layouts");
        let store = TemplateStore::load(&self.config.layouts, &mut env)
            .context(format!("Failed to load layouts from {}", self.config.layouts.display()))?;
        debug!("Layouts are ready");

        Ok(LayoutSession {
            env,
            store,
            registration_failures,
        })
    }

    /// Run a whole batch: `before`, then `each` over selected files in order
    pub fn run(&self, files: &mut FileSet) -> Result<BuildReport> {
        debug!(files = files.len(), "HandlebarsLayouts::run: called");
        let mut session = self.before()?;

        let mut outcomes = Vec::new();
        for (filename, file) in files.iter_mut() {
            if !self.matcher.matches(filename) {
                continue;
            }
            let outcome = session.each(filename, file);
            outcomes.push((filename.clone(), outcome));
        }

        let report = BuildReport {
            registration_failures: std::mem::take(&mut session.registration_failures),
            outcomes,
        };
        info!(
            rendered = report.rendered(),
            skipped = report.skipped(),
            missing = report.missing(),
            failed = report.failed(),
            "Layouts applied"
        );
        Ok(report)
    }
}

/// State for one build: environment plus compiled layouts
///
/// Read-only once created.
pub struct LayoutSession {
    env: HandlebarsEnvironment,
    store: TemplateStore,
    registration_failures: Vec<RegistrationFailure>,
}

impl LayoutSession {
    /// Apply the layout for one selected file
    pub fn each(&self, filename: &str, file: &mut ContentFile) -> ApplyOutcome {
        apply_layout(&self.env, &self.store, filename, file)
    }

    /// Loaded layout names
    pub fn layouts(&self) -> impl Iterator<Item = &str> {
        self.store.names()
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn environment(&self) -> &HandlebarsEnvironment {
        &self.env
    }

    /// Extension entries that failed to register during setup
    pub fn registration_failures(&self) -> &[RegistrationFailure] {
        &self.registration_failures
    }
}

/// Per-item results of one batch
#[derive(Debug, Default)]
pub struct BuildReport {
    pub registration_failures: Vec<RegistrationFailure>,
    /// One entry per selected file, in processing order
    pub outcomes: Vec<(String, ApplyOutcome)>,
}

impl BuildReport {
    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Rendered { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::NotRequested))
    }

    pub fn missing(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::LayoutUnknown { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::RenderFailed { .. }))
    }

    /// Outcome for a file name
    pub fn outcome(&self, filename: &str) -> Option<&ApplyOutcome> {
        self.outcomes.iter().find(|(name, _)| name == filename).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&ApplyOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layouts_dir(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, source) in files {
            fs::write(temp.path().join(name), source).unwrap();
        }
        temp
    }

    #[test]
    fn test_plugin_surface() {
        let plugin = HandlebarsLayouts::new(None).unwrap();
        assert_eq!(plugin.name(), "handlebars-layouts");
        assert!(plugin.matcher().matches("index.html"));
        assert!(!plugin.matcher().matches("index.md"));
    }

    #[test]
    fn test_invalid_match_pattern() {
        let options = PluginOptions::default().with_match("[".to_string());
        assert!(HandlebarsLayouts::new(Some(options)).is_err());
    }

    #[test]
    fn test_before_builds_fresh_sessions() {
        let temp = layouts_dir(&[("post.hbs", "{{title}}")]);
        let plugin = HandlebarsLayouts::new(Some(PluginOptions::default().with_layouts(temp.path()))).unwrap();

        let first = plugin.before().unwrap();
        fs::write(temp.path().join("page.hbs"), "page").unwrap();
        let second = plugin.before().unwrap();

        assert_eq!(first.layouts().collect::<Vec<_>>(), vec!["post"]);
        assert_eq!(second.layouts().collect::<Vec<_>>(), vec!["page", "post"]);
    }

    #[test]
    fn test_run_only_touches_matched_files() {
        let temp = layouts_dir(&[("wrap.hbs", "[{{{contents}}}]")]);
        let plugin = HandlebarsLayouts::new(Some(PluginOptions::default().with_layouts(temp.path()))).unwrap();

        let mut files = FileSet::new();
        files.insert("a.html".to_string(), ContentFile::new("a").with("layout", "wrap"));
        files.insert("b.md".to_string(), ContentFile::new("b").with("layout", "wrap"));
        files.insert("c.html".to_string(), ContentFile::new("c"));

        let report = plugin.run(&mut files).unwrap();

        assert_eq!(files["a.html"].contents.as_bytes(), b"[a]");
        assert_eq!(files["b.md"].contents.as_bytes(), b"b");
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.rendered(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.outcome("b.md").is_none());
    }

    #[test]
    fn test_missing_layout_dir_fails_before() {
        let temp = TempDir::new().unwrap();
        let options = PluginOptions::default().with_layouts(temp.path().join("absent"));
        let plugin = HandlebarsLayouts::new(Some(options)).unwrap();
        assert!(plugin.before().is_err());
    }
}
