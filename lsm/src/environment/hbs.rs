//! Handlebars-backed rendering environment

use std::fs;
use std::path::{Component, Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde_json::{Map, Value};
use tracing::debug;

use super::{CompiledTemplate, RenderEnvironment};
use crate::extensions::{
    DataEntry, DecoratorEntry, ExtensionCategory, HelperEntry, PartialEntry, RegistrationError, validate_name,
};
use crate::file::ContentFile;

/// Registry name prefix for layouts, keeping them apart from partials
pub const LAYOUT_PREFIX: &str = "layout:";

/// Rendering environment over a private Handlebars registry
pub struct HandlebarsEnvironment {
    /// Handlebars template engine
    registry: Handlebars<'static>,
    /// Shared data visible to every render
    data: Map<String, Value>,
}

impl Default for HandlebarsEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsEnvironment {
    pub fn new() -> Self {
        debug!("HandlebarsEnvironment::new: called");
        Self {
            registry: Handlebars::new(),
            data: Map::new(),
        }
    }

    /// Shared data registered so far
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Whether a partial with this name is registered
    pub fn has_partial(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl RenderEnvironment for HandlebarsEnvironment {
    fn register_data(&mut self, entry: &DataEntry) -> Result<(), RegistrationError> {
        debug!(?entry, "HandlebarsEnvironment::register_data: called");
        match entry {
            DataEntry::Pattern(pattern) => {
                for path in glob_files(pattern)? {
                    let value = load_data_file(&path)?;
                    let key = file_stem(&path);
                    debug!(%key, ?path, "HandlebarsEnvironment::register_data: loaded data file");
                    self.data.insert(key, value);
                }
            }
            DataEntry::Values(values) => {
                debug!(count = values.len(), "HandlebarsEnvironment::register_data: merging inline values");
                self.data.extend(values.clone());
            }
        }
        Ok(())
    }

    fn register_decorator(&mut self, entry: &DecoratorEntry) -> Result<(), RegistrationError> {
        debug!(name = %entry.name(), "HandlebarsEnvironment::register_decorator: called");
        validate_name(ExtensionCategory::Decorators, entry.name())?;
        self.registry.register_decorator(entry.name(), entry.instantiate());
        Ok(())
    }

    fn register_helper(&mut self, entry: &HelperEntry) -> Result<(), RegistrationError> {
        debug!(name = %entry.name(), "HandlebarsEnvironment::register_helper: called");
        validate_name(ExtensionCategory::Helpers, entry.name())?;
        self.registry.register_helper(entry.name(), entry.instantiate());
        Ok(())
    }

    fn register_partials(&mut self, entry: &PartialEntry) -> Result<(), RegistrationError> {
        debug!(?entry, "HandlebarsEnvironment::register_partials: called");
        match entry {
            PartialEntry::Pattern(pattern) => {
                let base = glob_base(pattern);
                for path in glob_files(pattern)? {
                    let name = partial_name(&base, &path);
                    let source = fs::read_to_string(&path).map_err(|e| RegistrationError::Read {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                    self.register_partial(&name, &source)?;
                }
            }
            PartialEntry::Inline(partials) => {
                for (name, source) in partials {
                    self.register_partial(name, source)?;
                }
            }
        }
        Ok(())
    }

    fn compile(&mut self, layout: &str, source: &str) -> Result<CompiledTemplate> {
        debug!(%layout, "HandlebarsEnvironment::compile: called");
        let handle = format!("{}{}", LAYOUT_PREFIX, layout);
        self.registry
            .register_template_string(&handle, source)
            .map_err(|e| eyre!("Failed to compile layout '{}': {}", layout, e))?;
        Ok(CompiledTemplate::new(layout, handle))
    }

    fn render(&self, template: &CompiledTemplate, file: &ContentFile) -> Result<String> {
        debug!(layout = %template.layout(), "HandlebarsEnvironment::render: called");
        // file fields shadow shared data
        let mut context = self.data.clone();
        context.extend(file.template_context());
        self.registry
            .render(template.handle(), &Value::Object(context))
            .map_err(|e| eyre!("{}", e))
    }
}

impl HandlebarsEnvironment {
    fn register_partial(&mut self, name: &str, source: &str) -> Result<(), RegistrationError> {
        debug!(%name, "HandlebarsEnvironment::register_partial: called");
        self.registry
            .register_partial(name, source)
            .map_err(|e| RegistrationError::PartialCompile {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

/// Regular files matching a glob pattern, in glob order
fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, RegistrationError> {
    let paths = glob::glob(pattern).map_err(|e| RegistrationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| RegistrationError::Read {
            path: e.path().to_path_buf(),
            message: e.error().to_string(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    debug!(%pattern, count = files.len(), "glob_files: matched");
    Ok(files)
}

fn load_data_file(path: &Path) -> Result<Value, RegistrationError> {
    let content = fs::read_to_string(path).map_err(|e| RegistrationError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);

    let value: Value = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content).map_err(|e| RegistrationError::DataParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        Some("yml") | Some("yaml") => serde_yaml::from_str(&content).map_err(|e| RegistrationError::DataParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        _ => return Err(RegistrationError::UnsupportedData(path.to_path_buf())),
    };

    if value.is_null() {
        return Err(RegistrationError::EmptyData(path.to_path_buf()));
    }
    Ok(value)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Leading directories of a pattern before the first wildcard component
fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component);
    }
    without_cur_dir(&base)
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

/// Partial name: path under the pattern base, extension stripped, `/`-separated
fn partial_name(base: &Path, path: &Path) -> String {
    let path = without_cur_dir(path);
    let relative = match path.strip_prefix(base) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => PathBuf::from(path.file_name().unwrap_or_default()),
    };

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let joined = parts.join("/");
    match joined.rfind('.') {
        Some(idx) if idx > joined.rfind('/').map_or(0, |slash| slash + 1) => joined[..idx].to_string(),
        _ => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlebars::{Context, Decorator, Helper, HelperResult, Output, RenderContext, RenderError};
    use serde_json::json;
    use tempfile::TempDir;

    fn shout(h: &Helper, _: &Handlebars, _: &Context, _: &mut RenderContext, out: &mut dyn Output) -> HelperResult {
        let value = h.param(0).and_then(|p| p.value().as_str()).unwrap_or("");
        out.write(&value.to_uppercase())?;
        Ok(())
    }

    fn mark_decorated(_: &Decorator, _: &Handlebars, ctx: &Context, rc: &mut RenderContext) -> Result<(), RenderError> {
        let mut marked = ctx.clone();
        if let Some(obj) = marked.data_mut().as_object_mut() {
            obj.insert("decorated".to_string(), json!(true));
        }
        rc.set_context(marked);
        Ok(())
    }

    fn render_layout(env: &mut HandlebarsEnvironment, source: &str, file: &ContentFile) -> Result<String> {
        let template = env.compile("test", source)?;
        env.render(&template, file)
    }

    #[test]
    fn test_render_escapes_and_embeds_contents() {
        let mut env = HandlebarsEnvironment::new();
        let file = ContentFile::new("<p>body</p>").with("title", "A & B");
        let out = render_layout(&mut env, "<h1>{{title}}</h1>{{{contents}}}", &file).unwrap();
        assert_eq!(out, "<h1>A &amp; B</h1><p>body</p>");
    }

    #[test]
    fn test_compile_error() {
        let mut env = HandlebarsEnvironment::new();
        let err = env.compile("broken", "{{#if}}never closed").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_inline_data_shadowed_by_file() {
        let mut env = HandlebarsEnvironment::new();
        let mut values = Map::new();
        values.insert("site".to_string(), json!("Example"));
        values.insert("title".to_string(), json!("Default"));
        env.register_data(&DataEntry::Values(values)).unwrap();

        let file = ContentFile::new("").with("title", "Page");
        let out = render_layout(&mut env, "{{site}}/{{title}}", &file).unwrap();
        assert_eq!(out, "Example/Page");
    }

    #[test]
    fn test_data_files_keyed_by_stem() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("site.json"), r#"{"name": "Example"}"#).unwrap();
        fs::write(temp.path().join("nav.yml"), "- home\n- about\n").unwrap();

        let mut env = HandlebarsEnvironment::new();
        let pattern = temp.path().join("*").to_string_lossy().into_owned();
        env.register_data(&DataEntry::Pattern(pattern)).unwrap();

        assert_eq!(env.data()["site"], json!({"name": "Example"}));
        assert_eq!(env.data()["nav"], json!(["home", "about"]));
    }

    #[test]
    fn test_unsupported_data_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "hello").unwrap();

        let mut env = HandlebarsEnvironment::new();
        let pattern = temp.path().join("*.txt").to_string_lossy().into_owned();
        let err = env.register_data(&DataEntry::Pattern(pattern)).unwrap_err();
        assert!(matches!(err, RegistrationError::UnsupportedData(_)));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut env = HandlebarsEnvironment::new();
        let err = env.register_data(&DataEntry::Pattern("[".to_string())).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_partials_from_pattern() {
        let temp = TempDir::new().unwrap();
        let partials = temp.path().join("partials");
        fs::create_dir_all(partials.join("nav")).unwrap();
        fs::write(partials.join("footer.hbs"), "<footer>{{site}}</footer>").unwrap();
        fs::write(partials.join("nav").join("menu.hbs"), "<nav/>").unwrap();

        let mut env = HandlebarsEnvironment::new();
        let pattern = partials.join("**").join("*").to_string_lossy().into_owned();
        env.register_partials(&PartialEntry::Pattern(pattern)).unwrap();

        assert!(env.has_partial("footer"));
        assert!(env.has_partial("nav/menu"));

        let file = ContentFile::new("").with("site", "Example");
        let out = render_layout(&mut env, "{{> footer}}{{> nav/menu}}", &file).unwrap();
        assert_eq!(out, "<footer>Example</footer><nav/>");
    }

    #[test]
    fn test_missing_partials_dir_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let pattern = temp.path().join("nope").join("**").join("*").to_string_lossy().into_owned();

        let mut env = HandlebarsEnvironment::new();
        assert!(env.register_partials(&PartialEntry::Pattern(pattern)).is_ok());
    }

    #[test]
    fn test_inline_partial_compile_error() {
        let mut env = HandlebarsEnvironment::new();
        let mut partials = std::collections::BTreeMap::new();
        partials.insert("bad".to_string(), "{{#each}}".to_string());
        let err = env.register_partials(&PartialEntry::Inline(partials)).unwrap_err();
        assert!(matches!(err, RegistrationError::PartialCompile { .. }));
    }

    #[test]
    fn test_helper_registration() {
        let mut env = HandlebarsEnvironment::new();
        env.register_helper(&HelperEntry::new("shout", shout)).unwrap();

        let file = ContentFile::new("").with("title", "hi");
        let out = render_layout(&mut env, "{{shout title}}", &file).unwrap();
        assert_eq!(out, "HI");
    }

    #[test]
    fn test_decorator_registration() {
        let mut env = HandlebarsEnvironment::new();
        env.register_decorator(&DecoratorEntry::new("mark", mark_decorated)).unwrap();

        let file = ContentFile::new("");
        let out = render_layout(&mut env, "{{*mark}}{{#if decorated}}yes{{/if}}", &file).unwrap();
        assert_eq!(out, "yes");
    }

    #[test]
    fn test_render_error() {
        let mut env = HandlebarsEnvironment::new();
        let file = ContentFile::new("");
        let err = render_layout(&mut env, "{{> missing_partial}}", &file).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_partial_name() {
        let base = glob_base("./layouts/partials/**/*");
        assert_eq!(base, PathBuf::from("layouts/partials"));
        assert_eq!(partial_name(&base, Path::new("layouts/partials/header.hbs")), "header");
        assert_eq!(partial_name(&base, Path::new("./layouts/partials/nav/menu.html")), "nav/menu");
        assert_eq!(partial_name(&base, Path::new("layouts/partials/README")), "README");

        let literal = glob_base("parts/footer.hbs");
        assert_eq!(partial_name(&literal, Path::new("parts/footer.hbs")), "footer");
    }
}
