//! Site build: converts every document under the pages directory into an
//! HTML page, renders an index of all pages and copies the stylesheets.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, ErrorPolicy, PandocConfig};
use crate::template::{FileTemplates, TemplateEngine, TemplateError};
use crate::{Document, Error, Pandoc, RenderedDocument, normalize, read_json, render_document};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("failed to run `{program}`: {source}")]
    PandocSpawn { program: String, source: io::Error },

    #[error("pandoc failed on {}: {stderr}", path.display())]
    Pandoc { path: PathBuf, stderr: String },

    #[error("{}: {source}", path.display())]
    Document { path: PathBuf, source: Error },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A page written by the build
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub source: PathBuf,
    pub url: String,
    /// Document metadata, including the page `url`
    pub metadata: BTreeMap<String, String>,
}

/// Build the whole site described by `config`.
pub fn build(config: &Config) -> Result<Vec<PageEntry>, BuildError> {
    let build_dir = &config.paths.build;
    prepare_build_dir(build_dir)?;

    let templates = FileTemplates::new(&config.paths.templates);
    let mut pages: Vec<PageEntry> = Vec::new();

    for path in source_files(&config.paths.pages, &config.pandoc)? {
        match build_page(&path, config, &templates) {
            Ok(page) => {
                if let Some(i) = pages.iter().position(|p| p.url == page.url) {
                    warn!(
                        url = %page.url,
                        replaced = %pages[i].source.display(),
                        by = %page.source.display(),
                        "two documents map to the same page"
                    );
                    pages.remove(i);
                }
                pages.push(page);
            }
            Err(e) if config.site.on_error == ErrorPolicy::Skip => {
                warn!(path = %path.display(), error = %e, "skipping document");
            }
            Err(e) => return Err(e),
        }
    }

    let index = templates.render(
        &config.site.index_template,
        &json!({
            "title": config.site.title,
            "pages": pages.iter().map(|p| &p.metadata).collect::<Vec<_>>(),
        }),
    )?;
    let index_path = build_dir.join("index.html");
    fs::write(&index_path, index).map_err(io_error(&index_path))?;

    copy_styles(&config.paths.styles, build_dir)?;

    info!(pages = pages.len(), dir = %build_dir.display(), "site built");
    Ok(pages)
}

/// Read a document as a pandoc tree. `.json` files are taken as pandoc
/// JSON; anything else goes through the pandoc program.
pub fn load_source(path: &Path, settings: &PandocConfig) -> Result<Pandoc, BuildError> {
    let json = if path.extension().is_some_and(|ext| ext == "json") {
        fs::read_to_string(path).map_err(io_error(path))?
    } else {
        run_pandoc(path, settings)?
    };

    let pandoc = read_json(&json).map_err(|source| BuildError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), api_version = ?pandoc.api_version, "read pandoc tree");
    Ok(pandoc)
}

fn run_pandoc(path: &Path, settings: &PandocConfig) -> Result<String, BuildError> {
    debug!(program = %settings.program, path = %path.display(), "running pandoc");

    let output = Command::new(&settings.program)
        .arg("-f")
        .arg(&settings.from)
        .arg("-t")
        .arg("json")
        .arg(path)
        .output()
        .map_err(|source| BuildError::PandocSpawn {
            program: settings.program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(BuildError::Pandoc {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout)
        .map_err(|e| io_error(path)(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Load, normalize and render a single document.
pub fn convert(
    path: &Path,
    settings: &PandocConfig,
) -> Result<(Document, RenderedDocument), BuildError> {
    let document_error = |source| BuildError::Document {
        path: path.to_path_buf(),
        source,
    };

    let pandoc = load_source(path, settings)?;
    let doc = normalize(&pandoc).map_err(document_error)?;
    debug!(path = %path.display(), title = ?doc.directive("title"), "normalized");
    let rendered = render_document(&doc).map_err(document_error)?;
    Ok((doc, rendered))
}

fn build_page(
    path: &Path,
    config: &Config,
    templates: &impl TemplateEngine,
) -> Result<PageEntry, BuildError> {
    let (doc, rendered) = convert(path, &config.pandoc)?;

    let mut metadata = page_metadata(&doc);
    let html = templates.render(
        &config.site.page_template,
        &page_context(&metadata, rendered.to_html()),
    )?;

    let stem = path
        .file_stem()
        .unwrap_or_else(|| OsStr::new("index"))
        .to_string_lossy();
    let url = format!("{stem}.html");
    let out_path = config.paths.build.join(&url);
    fs::write(&out_path, html).map_err(io_error(&out_path))?;

    let (done, todo): (Vec<_>, Vec<_>) = doc.tasks().partition(|task| task.done);
    info!(page = %url, todo = todo.len(), done = done.len(), "wrote page");

    metadata.insert("url".to_string(), url.clone());
    Ok(PageEntry {
        source: path.to_path_buf(),
        url,
        metadata,
    })
}

/// Front-matter metadata, with directives filling in keys it lacks.
fn page_metadata(doc: &Document) -> BTreeMap<String, String> {
    let mut metadata = doc.metadata.clone();
    for (key, value) in doc.directives() {
        metadata
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    metadata
}

fn page_context(metadata: &BTreeMap<String, String>, content: String) -> Value {
    let mut context: Map<String, Value> = metadata
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    context.insert("content".to_string(), Value::String(content));
    Value::Object(context)
}

fn source_files(dir: &Path, settings: &PandocConfig) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext == settings.extension => files.push(path.to_path_buf()),
            Some("json") if settings.json_sources => files.push(path.to_path_buf()),
            _ => debug!(path = %path.display(), "not a source document"),
        }
    }

    Ok(files)
}

/// Create the build directory, removing anything left from a previous build.
fn prepare_build_dir(dir: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(io_error(&path))?;
        } else {
            fs::remove_file(&path).map_err(io_error(&path))?;
        }
    }

    Ok(())
}

fn copy_styles(styles: &Path, build_dir: &Path) -> Result<(), BuildError> {
    if !styles.is_dir() {
        debug!(dir = %styles.display(), "no styles to copy");
        return Ok(());
    }

    let target = build_dir.join(styles.file_name().unwrap_or_else(|| OsStr::new("styles")));
    for entry in WalkDir::new(styles) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(styles) else {
            continue;
        };
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(io_error(&dest))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(io_error(&dest))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PathsConfig, SiteConfig};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn page_json(blocks: Value) -> String {
        json!({
            "pandoc-api-version": [1, 23, 1],
            "meta": {"title": {"t": "MetaInlines", "c": [{"t": "Str", "c": "Alpha"}]}},
            "blocks": blocks,
        })
        .to_string()
    }

    fn site(on_error: ErrorPolicy) -> (TempDir, Config) {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        for sub in ["pages/sub", "templates", "styles", "build/stale"] {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }

        fs::write(
            dir.join("pages/alpha.json"),
            page_json(json!([
                {"t": "RawBlock", "c": ["org", "#+DESCRIPTION: First page"]},
                {"t": "Header", "c": [1, ["", [], []], [{"t": "Str", "c": "Hello"}]]},
                {"t": "Header", "c": [2, ["", [], []], [
                    {"t": "Span", "c": [["", ["done", "DONE"], []], [{"t": "Str", "c": "DONE"}]]},
                    {"t": "Str", "c": "Setup"}
                ]]}
            ])),
        )
        .unwrap();
        fs::write(
            dir.join("pages/sub/beta.json"),
            json!({"pandoc-api-version": [1, 23, 1], "meta": {}, "blocks": [
                {"t": "RawBlock", "c": ["org", "#+TITLE: Beta"]},
                {"t": "Para", "c": [{"t": "Str", "c": "b"}]}
            ]})
            .to_string(),
        )
        .unwrap();
        fs::write(dir.join("pages/notes.txt"), "not a page").unwrap();
        fs::write(dir.join("build/stale/old.html"), "old").unwrap();
        fs::write(
            dir.join("templates/page.html"),
            "<title>{{ title }}</title><meta content=\"{{ description }}\">{{ content }}",
        )
        .unwrap();
        fs::write(
            dir.join("templates/index.html"),
            "<h1>{{ title }}</h1>\n{% for page in pages %}\n<a href=\"{{ page.url }}\">{{ page.title }}</a>\n{% endfor %}\n",
        )
        .unwrap();
        fs::write(dir.join("styles/site.css"), "body {}").unwrap();

        let config = Config {
            paths: PathsConfig {
                pages: dir.join("pages"),
                build: dir.join("build"),
                templates: dir.join("templates"),
                styles: dir.join("styles"),
            },
            pandoc: PandocConfig {
                json_sources: true,
                ..PandocConfig::default()
            },
            site: SiteConfig {
                on_error,
                ..SiteConfig::default()
            },
        };
        (root, config)
    }

    #[test]
    fn builds_pages_index_and_styles() {
        let (root, config) = site(ErrorPolicy::Abort);
        let dir = root.path();

        let pages = build(&config).unwrap();

        let urls: Vec<_> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, ["alpha.html", "beta.html"]);
        assert_eq!(pages[0].metadata["url"], "alpha.html");
        assert_eq!(pages[1].metadata["title"], "Beta");

        assert_eq!(
            fs::read_to_string(dir.join("build/alpha.html")).unwrap(),
            "<title>Alpha</title><meta content=\"First page\">\
             <div id=\"table-of-contents\"><h1>Table of Contents</h1><ul><li>Hello</li></ul></div>\
             <div id=\"content\"><h1>Hello</h1></div>"
        );
        assert_eq!(
            fs::read_to_string(dir.join("build/index.html")).unwrap(),
            "<h1>Home</h1>\n<a href=\"alpha.html\">Alpha</a>\n<a href=\"beta.html\">Beta</a>\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("build/styles/site.css")).unwrap(),
            "body {}"
        );
        assert!(!dir.join("build/stale").exists());
        assert!(!dir.join("build/notes.html").exists());
    }

    #[test]
    fn failing_document_aborts_by_default() {
        let (root, config) = site(ErrorPolicy::Abort);
        let bad = root.path().join("pages/gamma.json");
        fs::write(&bad, page_json(json!([{"t": "BulletList", "c": []}]))).unwrap();

        match build(&config) {
            Err(BuildError::Document { path, source }) => {
                assert_eq!(path, bad);
                assert!(matches!(source, Error::UnsupportedNodeKind { .. }));
            }
            other => panic!("Expected Document error, got {other:?}"),
        }
    }

    #[test]
    fn failing_document_is_skipped_when_configured() {
        let (root, config) = site(ErrorPolicy::Skip);
        fs::write(root.path().join("pages/gamma.json"), "{ not json").unwrap();

        let pages = build(&config).unwrap();

        assert_eq!(pages.len(), 2);
        assert!(!root.path().join("build/gamma.html").exists());
    }

    #[test]
    fn later_document_wins_a_duplicate_url() {
        let (root, config) = site(ErrorPolicy::Abort);
        let dir = root.path();
        for (sub, word) in [("a", "first"), ("b", "second")] {
            fs::create_dir_all(dir.join("pages").join(sub)).unwrap();
            fs::write(
                dir.join("pages").join(sub).join("x.json"),
                page_json(json!([{"t": "Para", "c": [{"t": "Str", "c": word}]}])),
            )
            .unwrap();
        }

        let pages = build(&config).unwrap();

        let duplicates: Vec<_> = pages.iter().filter(|p| p.url == "x.html").collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].source, dir.join("pages/b/x.json"));
        assert!(
            fs::read_to_string(dir.join("build/x.html"))
                .unwrap()
                .contains("<p>second</p>")
        );
        let index = fs::read_to_string(dir.join("build/index.html")).unwrap();
        assert_eq!(index.matches("href=\"x.html\"").count(), 1);
    }

    #[test]
    fn json_files_are_ignored_unless_enabled() {
        let (root, mut config) = site(ErrorPolicy::Abort);
        config.pandoc.json_sources = false;
        config.pandoc.extension = "page".to_string();
        fs::write(root.path().join("pages/data.json"), "[1, 2, 3]").unwrap();

        let pages = build(&config).unwrap();

        assert!(pages.is_empty());
        let built: BTreeSet<_> = fs::read_dir(root.path().join("build"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(built, BTreeSet::from(["index.html".into(), "styles".into()]));
    }

    #[test]
    fn directives_do_not_override_front_matter() {
        let doc = Document {
            metadata: BTreeMap::from([("title".to_string(), "Front".to_string())]),
            nodes: vec![
                crate::Node::Directive {
                    key: "title".to_string(),
                    value: "Directive".to_string(),
                },
                crate::Node::Directive {
                    key: "author".to_string(),
                    value: "Ada".to_string(),
                },
            ],
        };

        let metadata = page_metadata(&doc);
        assert_eq!(metadata["title"], "Front");
        assert_eq!(metadata["author"], "Ada");
    }

    #[test]
    fn missing_pandoc_program_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.org");
        fs::write(&source, "* Heading").unwrap();
        let settings = PandocConfig {
            program: "orgsite-test-no-such-pandoc".to_string(),
            ..PandocConfig::default()
        };

        assert!(matches!(
            load_source(&source, &settings),
            Err(BuildError::PandocSpawn { .. })
        ));
    }
}
