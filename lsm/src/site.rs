//! Site host
//!
//! A minimal build pipeline around the layout middleware: read a source
//! tree into a [`FileSet`], let the middleware rewrite it, write the result.

use std::fs;
use std::path::Path;

use eyre::{Context, Result, eyre};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::file::{ContentFile, Contents, FileSet};

/// Read every file under `dir`, keyed by `/`-separated relative path
///
/// With `front_matter`, YAML front matter of text files becomes metadata
/// and is removed from the body.
pub fn read_source(dir: impl AsRef<Path>, front_matter: bool) -> Result<FileSet> {
    let dir = dir.as_ref();
    debug!(?dir, front_matter, "read_source: called");
    if !dir.is_dir() {
        return Err(eyre!("Source directory {} does not exist", dir.display()));
    }

    let matter = Matter::<YAML>::new();
    let mut files = FileSet::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context(format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(dir).context("Walked outside the source directory")?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = fs::read(path).context(format!("Failed to read {}", path.display()))?;
        let file = if front_matter {
            parse_file(&matter, &name, bytes)?
        } else {
            ContentFile::new(bytes)
        };
        debug!(%name, size = file.contents.len(), fields = file.metadata.len(), "read_source: loaded file");
        files.insert(name, file);
    }

    info!("Read {} files from {}", files.len(), dir.display());
    Ok(files)
}

fn parse_file(matter: &Matter<YAML>, name: &str, bytes: Vec<u8>) -> Result<ContentFile> {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(%name, "parse_file: not UTF-8, skipping front matter");
            return Ok(ContentFile::new(e.into_bytes()));
        }
    };

    let parsed = matter
        .parse::<Value>(&text)
        .map_err(|e| eyre!("Failed to parse front matter in {}: {}", name, e))?;

    match parsed.data {
        Some(Value::Object(metadata)) => Ok(ContentFile {
            contents: Contents::Bytes(parsed.content.into_bytes()),
            metadata,
        }),
        Some(_) => Err(eyre!("Front matter in {} is not a mapping", name)),
        None => Ok(ContentFile::new(text.into_bytes())),
    }
}

/// Write every file's contents under `dir`
pub fn write_destination(dir: impl AsRef<Path>, files: &FileSet, clean: bool) -> Result<()> {
    let dir = dir.as_ref();
    debug!(?dir, files = files.len(), clean, "write_destination: called");

    if clean && dir.exists() {
        debug!(?dir, "write_destination: cleaning destination");
        fs::remove_dir_all(dir).context(format!("Failed to clean {}", dir.display()))?;
    }

    for (name, file) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, file.contents.as_bytes()).context(format!("Failed to write {}", path.display()))?;
    }

    info!("Wrote {} files to {}", files.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_source_with_front_matter() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        fs::write(
            temp.path().join("blog").join("post.html"),
            "---\nlayout: post\ntitle: Hello\n---\n<p>body</p>\n",
        )
        .unwrap();
        fs::write(temp.path().join("plain.html"), "<p>plain</p>").unwrap();

        let files = read_source(temp.path(), true).unwrap();

        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["blog/post.html", "plain.html"]);
        let post = &files["blog/post.html"];
        assert_eq!(post.layout().as_deref(), Some("post"));
        assert_eq!(post.metadata["title"], "Hello");
        assert!(post.contents.to_text().contains("<p>body</p>"));
        assert!(!post.contents.to_text().contains("layout:"));
        assert!(files["plain.html"].metadata.is_empty());
    }

    #[test]
    fn test_read_source_without_front_matter() {
        let temp = TempDir::new().unwrap();
        let raw = "---\nlayout: post\n---\nbody";
        fs::write(temp.path().join("a.html"), raw).unwrap();

        let files = read_source(temp.path(), false).unwrap();
        assert_eq!(files["a.html"].contents.as_bytes(), raw.as_bytes());
        assert!(files["a.html"].layout().is_none());
    }

    #[test]
    fn test_binary_files_pass_through() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0xff]).unwrap();

        let files = read_source(temp.path(), true).unwrap();
        assert_eq!(files["logo.png"].contents.as_bytes(), &[0x89, b'P', b'N', b'G', 0xff]);
    }

    #[test]
    fn test_missing_source_dir() {
        let temp = TempDir::new().unwrap();
        assert!(read_source(temp.path().join("nope"), true).is_err());
    }

    #[test]
    fn test_write_destination_clean() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("build");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.html"), "old").unwrap();

        let mut files = FileSet::new();
        files.insert("nested/index.html".to_string(), ContentFile::new("<html/>"));
        write_destination(&out, &files, true).unwrap();

        assert!(!out.join("stale.html").exists());
        assert_eq!(fs::read_to_string(out.join("nested/index.html")).unwrap(), "<html/>");
    }
}
