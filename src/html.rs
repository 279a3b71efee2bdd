use crate::error::{Error, Result};
use crate::node::{Document, ListItem, Node, TextStyle};

/// Title emitted above the generated table of contents
const TOC_TITLE: &str = "<h1>Table of Contents</h1>";

/// A heading seen while rendering the top level of a document
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: u32,
    /// Rendered inner HTML of the heading
    pub text: String,
}

/// Rendered body and table of contents of one document
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub content_html: String,
    pub toc_html: String,
}

impl RenderedDocument {
    /// Combine both fragments, table of contents first.
    pub fn to_html(&self) -> String {
        format!(
            "<div id=\"table-of-contents\">{}</div><div id=\"content\">{}</div>",
            self.toc_html, self.content_html
        )
    }
}

/// Render nodes to an HTML fragment.
pub fn render(nodes: &[Node]) -> Result<String> {
    let mut out = String::new();
    nodes_to_html(nodes, &mut out)?;
    Ok(out)
}

/// Render a document's nodes, collecting its top-level headings into a
/// table of contents.
pub fn render_document(doc: &Document) -> Result<RenderedDocument> {
    let mut content = String::new();
    let mut headings = Vec::new();

    for node in &doc.nodes {
        match node {
            Node::Heading { level, children } => {
                let text = render(children)?;
                emit_heading(*level, &text, &mut content)?;
                headings.push(TocEntry {
                    level: *level,
                    text,
                });
            }
            _ => node_to_html(node, &mut content)?,
        }
    }

    Ok(RenderedDocument {
        content_html: content,
        toc_html: build_toc(&headings)?,
    })
}

/// Build a nested list from headings in document order.
///
/// Each step down in level opens one `<ul><li>` pair, so skipped levels
/// produce empty intermediate items and the list stays well-formed.
pub fn build_toc(entries: &[TocEntry]) -> Result<String> {
    let mut out = String::from(TOC_TITLE);
    let mut previous = 0;

    for entry in entries {
        check_level(entry.level)?;
        if entry.level > previous {
            out.push_str(&"<ul><li>".repeat((entry.level - previous) as usize));
        } else {
            if entry.level < previous {
                out.push_str(&"</li></ul>".repeat((previous - entry.level) as usize));
            }
            out.push_str("</li><li>");
        }
        out.push_str(&entry.text);
        previous = entry.level;
    }

    out.push_str(&"</li></ul>".repeat(previous as usize));
    Ok(out)
}

fn check_level(level: u32) -> Result<()> {
    if (1..=6).contains(&level) {
        Ok(())
    } else {
        Err(Error::InvalidHeadingLevel { level })
    }
}

fn emit_heading(level: u32, inner: &str, out: &mut String) -> Result<()> {
    check_level(level)?;
    out.push_str(&format!("<h{level}>{inner}</h{level}>"));
    Ok(())
}

fn nodes_to_html(nodes: &[Node], out: &mut String) -> Result<()> {
    for node in nodes {
        node_to_html(node, out)?;
    }
    Ok(())
}

fn node_to_html(node: &Node, out: &mut String) -> Result<()> {
    match node {
        // Directives feed metadata and todo items are reported separately;
        // a span that was not promoted carries no markup of its own.
        Node::Directive { .. } | Node::TodoItem { .. } | Node::Span { .. } => {}
        Node::Heading { level, children } => {
            let inner = render(children)?;
            emit_heading(*level, &inner, out)?;
        }
        Node::Paragraph { children } => wrap("p", children, out)?,
        Node::TextRun { style, children } => match style {
            TextStyle::Bold => wrap("strong", children, out)?,
            TextStyle::Italic => wrap("em", children, out)?,
            TextStyle::Plain => nodes_to_html(children, out)?,
        },
        Node::OrderedList { items, .. } => {
            out.push_str("<ol>");
            for ListItem { children } in items {
                wrap("li", children, out)?;
            }
            out.push_str("</ol>");
        }
        Node::InlineCode { text } => {
            out.push_str("<code>");
            escape(text, out);
            out.push_str("</code>");
        }
        Node::CodeBlock { name, text, .. } => {
            out.push_str("<figure>");
            if let Some(name) = name.as_deref().filter(|name| !name.is_empty()) {
                out.push_str("<figcaption>");
                escape(name, out);
                out.push_str("</figcaption>");
            }
            out.push_str("<pre><code>");
            escape(text, out);
            out.push_str("</code></pre></figure>");
        }
        Node::Link { target, children } => {
            // Targets are trusted and written as-is.
            out.push_str(&format!("<a href=\"{target}\">"));
            nodes_to_html(children, out)?;
            out.push_str("</a>");
        }
        Node::Literal(text) => escape(text, out),
        Node::Space | Node::SoftBreak => out.push(' '),
    }
    Ok(())
}

fn wrap(tag: &str, children: &[Node], out: &mut String) -> Result<()> {
    out.push_str(&format!("<{tag}>"));
    nodes_to_html(children, out)?;
    out.push_str(&format!("</{tag}>"));
    Ok(())
}

/// Escape `&`, `<` and `>`; nothing else is touched.
fn escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
