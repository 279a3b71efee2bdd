pub mod config;
mod error;
mod html;
mod node;
mod normalize;
pub mod pandoc;
pub mod site;
pub mod template;

pub use config::Config;
pub use error::{Error, Result};
pub use html::{RenderedDocument, TocEntry, build_toc, render, render_document};
pub use node::{Document, ListItem, Node, Task, TaskMarker, TextStyle, TodoOrigin};
pub use normalize::normalize;
pub use pandoc::{Pandoc, read_json};

/// Parse pandoc JSON into a normalized document.
pub fn parse(json: &str) -> Result<Document> {
    normalize(&read_json(json)?)
}

/// Convert pandoc JSON to an HTML fragment: table of contents followed by
/// the rendered content.
pub fn org_json_to_html(json: &str) -> Result<String> {
    let doc = parse(json)?;
    Ok(render_document(&doc)?.to_html())
}
