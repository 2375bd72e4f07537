//! Layout Applier
//!
//! Renders one content file through its declared layout and swaps the
//! rendered bytes into the file. Every failure stays local to the file.

use std::fmt;

use tracing::{debug, warn};

use crate::environment::RenderEnvironment;
use crate::file::{ContentFile, Contents};
use crate::store::TemplateStore;

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No layout requested; file unchanged
    NotRequested,
    /// Layout requested but not in the store; file unchanged
    LayoutUnknown { layout: String },
    /// Contents replaced with the rendered layout
    Rendered { layout: String },
    /// Rendering failed; contents left as their string-coerced form
    RenderFailed { layout: String, message: String },
}

impl ApplyOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::RenderFailed { .. })
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => write!(f, "no layout"),
            Self::LayoutUnknown { layout } => write!(f, "layout '{}' missing", layout),
            Self::Rendered { layout } => write!(f, "rendered with '{}'", layout),
            Self::RenderFailed { layout, message } => write!(f, "layout '{}' failed: {}", layout, message),
        }
    }
}

/// Apply the file's declared layout, if any
pub fn apply_layout<E: RenderEnvironment>(
    env: &E,
    store: &TemplateStore,
    filename: &str,
    file: &mut ContentFile,
) -> ApplyOutcome {
    let Some(layout) = file.layout() else {
        debug!(%filename, "Skipping layout: {}", filename);
        return ApplyOutcome::NotRequested;
    };

    let Some(template) = store.get(&layout) else {
        debug!(%filename, %layout, "Layout {} missing: {}", layout, filename);
        return ApplyOutcome::LayoutUnknown { layout };
    };

    debug!(%filename, %layout, "Processing layout {}: {}", layout, filename);
    file.contents = Contents::Text(file.contents.to_text().into_owned());

    match env.render(template, file) {
        Ok(rendered) => {
            file.contents = Contents::Bytes(rendered.into_bytes());
            ApplyOutcome::Rendered { layout }
        }
        Err(e) => {
            warn!("Encountered error while processing {}: {}", filename, e);
            ApplyOutcome::RenderFailed {
                layout,
                message: e.to_string(),
            }
        }
    }
}
