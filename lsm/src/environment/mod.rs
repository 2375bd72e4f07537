//! Rendering Environment
//!
//! A rendering environment owns helpers, partials, decorators and shared
//! data. It is built once per build: extensions are registered first, then
//! layouts are compiled against it, then it is only read while files render.
//!
//! Registration is tolerant per entry. A failing entry is recorded and
//! logged, and registration carries on with the next entry and category.

mod hbs;

use std::fmt;

use eyre::Result;
use tracing::{debug, warn};

use crate::config::LayoutsConfig;
use crate::extensions::{DataEntry, DecoratorEntry, ExtensionCategory, HelperEntry, PartialEntry, RegistrationError};
use crate::file::ContentFile;

pub use hbs::{HandlebarsEnvironment, LAYOUT_PREFIX};

/// A layout compiled into an environment
///
/// Holds the layout name and the handle the environment uses to invoke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    layout: String,
    handle: String,
}

impl CompiledTemplate {
    pub fn new(layout: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            handle: handle.into(),
        }
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Template engine seam used by the store and the layout applier
pub trait RenderEnvironment {
    /// Merge one shared data source
    fn register_data(&mut self, entry: &DataEntry) -> Result<(), RegistrationError>;

    /// Register one decorator
    fn register_decorator(&mut self, entry: &DecoratorEntry) -> Result<(), RegistrationError>;

    /// Register one helper
    fn register_helper(&mut self, entry: &HelperEntry) -> Result<(), RegistrationError>;

    /// Register every partial from one source
    fn register_partials(&mut self, entry: &PartialEntry) -> Result<(), RegistrationError>;

    /// Compile a layout template; errors are fatal to the build
    fn compile(&mut self, layout: &str, source: &str) -> Result<CompiledTemplate>;

    /// Render a compiled layout with the file as its data context
    fn render(&self, template: &CompiledTemplate, file: &ContentFile) -> Result<String>;
}

/// One extension entry that failed to register
#[derive(Debug)]
pub struct RegistrationFailure {
    pub category: ExtensionCategory,
    /// Position of the entry within its category
    pub index: usize,
    pub error: RegistrationError,
}

impl fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.category, self.index, self.error)
    }
}

/// Register every configured extension, category by category
///
/// Returns the entries that failed; none of them stop the others.
pub fn register_extensions<E: RenderEnvironment>(env: &mut E, config: &LayoutsConfig) -> Vec<RegistrationFailure> {
    debug!("register_extensions: called");
    let mut failures = Vec::new();

    register_category(ExtensionCategory::Data, &config.data, &mut failures, |entry| {
        env.register_data(entry)
    });
    register_category(ExtensionCategory::Decorators, &config.decorators, &mut failures, |entry| {
        env.register_decorator(entry)
    });
    register_category(ExtensionCategory::Helpers, &config.helpers, &mut failures, |entry| {
        env.register_helper(entry)
    });
    register_category(ExtensionCategory::Partials, &config.partials, &mut failures, |entry| {
        env.register_partials(entry)
    });

    debug!(failures = failures.len(), "register_extensions: done");
    failures
}

fn register_category<T>(
    category: ExtensionCategory,
    entries: &[T],
    failures: &mut Vec<RegistrationFailure>,
    mut register: impl FnMut(&T) -> Result<(), RegistrationError>,
) {
    if entries.is_empty() {
        debug!(%category, "No config found for {}", category);
        return;
    }

    debug!(%category, count = entries.len(), "Loading {}", category);
    for (index, entry) in entries.iter().enumerate() {
        if let Err(error) = register(entry) {
            warn!("Encountered error during initialization: {}", error);
            failures.push(RegistrationFailure { category, index, error });
        }
    }
}
