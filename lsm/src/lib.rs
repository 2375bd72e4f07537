//! Layoutsmith - Handlebars layouts for content pipelines
//!
//! Each content file may name a layout in its metadata. The layout template
//! renders the file's fields and body, and the rendered output replaces the
//! file's contents in place.
//!
//! # Build phases
//!
//! 1. `before`: create a rendering environment, register shared data,
//!    decorators, helpers and partials into it, then compile every template
//!    in the layout directory into a [`TemplateStore`]
//! 2. `each`: for every file the match rule selects, render its layout
//!
//! Setup failures of the layout set are fatal. Failures of a single
//! extension entry or a single file are recorded and the batch continues.
//!
//! # Example
//!
//! ```ignore
//! use layoutsmith::{ContentFile, FileSet, HandlebarsLayouts, PluginOptions};
//!
//! let plugin = HandlebarsLayouts::new(Some(PluginOptions::default().with_layouts("layouts")))?;
//! let mut files = FileSet::new();
//! files.insert("a.html".into(), ContentFile::new("<p>body</p>").with("layout", "post"));
//! let report = plugin.run(&mut files)?;
//! ```
//!
//! # Modules
//!
//! - [`config`] - Plugin options, normalization, site config loading
//! - [`extensions`] - Data, decorator, helper and partial entries
//! - [`environment`] - Rendering environment trait and Handlebars implementation
//! - [`store`] - Template store loading
//! - [`applier`] - Per-file layout application
//! - [`plugin`] - Middleware surface and batch runner
//! - [`site`] - Source tree reading and destination writing
//! - [`cli`] - Command-line interface

pub mod applier;
pub mod cli;
pub mod config;
pub mod environment;
pub mod extensions;
pub mod file;
pub mod matcher;
pub mod plugin;
pub mod site;
pub mod store;

pub use applier::{ApplyOutcome, apply_layout};
pub use config::{LayoutsConfig, MatchSettings, OneOrMany, PluginOptions, SiteConfig, normalize};
pub use environment::{
    CompiledTemplate, HandlebarsEnvironment, RegistrationFailure, RenderEnvironment, register_extensions,
};
pub use extensions::{DataEntry, DecoratorEntry, ExtensionCategory, HelperEntry, PartialEntry, RegistrationError};
pub use file::{ContentFile, Contents, FileSet};
pub use matcher::FileMatcher;
pub use plugin::{BuildReport, HandlebarsLayouts, LayoutSession};
pub use site::{read_source, write_destination};
pub use store::{TemplateStore, layout_key};
