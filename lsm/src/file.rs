//! Content files as seen by the layout stage

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Field name the body is exposed under in the template context
pub const CONTENTS_FIELD: &str = "contents";

/// Field name holding the requested layout
pub const LAYOUT_FIELD: &str = "layout";

/// Files keyed by pipeline-relative path, iterated in name order
pub type FileSet = BTreeMap<String, ContentFile>;

/// A file body, either raw bytes or text already coerced to a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Bytes(Vec<u8>),
    Text(String),
}

impl Contents {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Display string for the body; invalid UTF-8 is replaced lossily
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
            Self::Text(text) => Cow::Borrowed(text),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Default for Contents {
    fn default() -> Self {
        Self::Bytes(Vec::new())
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

/// One pipeline file: a body plus arbitrary metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFile {
    pub contents: Contents,
    pub metadata: Map<String, Value>,
}

impl ContentFile {
    pub fn new(contents: impl Into<Contents>) -> Self {
        Self {
            contents: contents.into(),
            metadata: Map::new(),
        }
    }

    /// Set a metadata field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The declared layout name, if one is requested
    ///
    /// Absent, null, false and empty values mean no layout. Numbers are
    /// accepted and looked up by their decimal form.
    pub fn layout(&self) -> Option<String> {
        match self.metadata.get(LAYOUT_FIELD)? {
            Value::String(name) if !name.is_empty() => Some(name.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The object a layout template renders against
    ///
    /// All metadata fields, including `layout`, plus the body as a string.
    pub fn template_context(&self) -> Map<String, Value> {
        let mut context = self.metadata.clone();
        context.insert(CONTENTS_FIELD.to_string(), Value::String(self.contents.to_text().into_owned()));
        context
    }
}
