use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::node::{Document, ListItem, Node, TaskMarker, TextStyle, TodoOrigin};
use crate::pandoc::{self, Attr, Pandoc};

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#\+(\w+):\s+(.+)").unwrap());

/// Convert a pandoc document into document nodes.
///
/// Fails on the first node that does not fit the supported subset; the
/// input is never modified.
pub fn normalize(pandoc: &Pandoc) -> Result<Document> {
    Ok(Document {
        metadata: pandoc.meta.clone(),
        nodes: normalize_nodes(&pandoc.blocks)?,
    })
}

fn normalize_nodes(nodes: &[pandoc::Node]) -> Result<Vec<Node>> {
    nodes.iter().map(normalize_node).collect()
}

fn normalize_node(node: &pandoc::Node) -> Result<Node> {
    match node {
        pandoc::Node::RawBlock { format, text } => directive(format, text),
        pandoc::Node::Header {
            level,
            attr,
            content,
        } => {
            if !attr.is_empty() {
                return Err(Error::UnsupportedHeadingAttributes {
                    level: *level,
                    attr: format!("{attr:?}"),
                });
            }
            promote(TodoOrigin::Heading(*level), normalize_nodes(content)?)
        }
        pandoc::Node::Para(content) => promote(TodoOrigin::Paragraph, normalize_nodes(content)?),
        pandoc::Node::Plain(content) => text_run(TextStyle::Plain, content),
        pandoc::Node::Strong(content) => text_run(TextStyle::Bold, content),
        pandoc::Node::Emph(content) => text_run(TextStyle::Italic, content),
        pandoc::Node::OrderedList { attributes, items } => {
            let items = items
                .iter()
                .map(|item| -> Result<ListItem> {
                    Ok(ListItem {
                        children: normalize_nodes(item)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::OrderedList {
                start: attributes.start,
                style: attributes.style.clone(),
                delimiter: attributes.delimiter.clone(),
                items,
            })
        }
        pandoc::Node::CodeBlock { attr, text } => code_block(attr, text),
        pandoc::Node::Code { attr, text } => {
            if !is_verbatim(attr) {
                return Err(Error::UnsupportedCodeAttributes {
                    kind: "inline code",
                    attr: format!("{attr:?}"),
                });
            }
            Ok(Node::InlineCode { text: text.clone() })
        }
        pandoc::Node::Link {
            attr,
            content,
            target,
            title: _,
        } => {
            if !attr.is_empty() {
                return Err(Error::UnsupportedLinkAttributes {
                    target: target.clone(),
                    attr: format!("{attr:?}"),
                });
            }
            Ok(Node::Link {
                target: target.clone(),
                children: normalize_nodes(content)?,
            })
        }
        pandoc::Node::Span { attr, content } => Ok(Node::Span {
            marker: task_marker(&attr.classes),
            children: normalize_nodes(content)?,
        }),
        pandoc::Node::Str(text) => Ok(Node::Literal(text.clone())),
        pandoc::Node::Space => Ok(Node::Space),
        pandoc::Node::SoftBreak => Ok(Node::SoftBreak),
        pandoc::Node::Other(kind) => Err(Error::UnsupportedNodeKind { kind: kind.clone() }),
    }
}

fn directive(format: &str, text: &str) -> Result<Node> {
    if format != "org" {
        return Err(Error::UnsupportedRawFormat {
            format: format.to_string(),
        });
    }

    let captures = DIRECTIVE
        .captures(text)
        .ok_or_else(|| Error::MalformedDirective {
            raw: text.to_string(),
        })?;

    Ok(Node::Directive {
        key: captures[1].to_lowercase(),
        value: captures[2].trim().to_string(),
    })
}

fn text_run(style: TextStyle, content: &[pandoc::Node]) -> Result<Node> {
    Ok(Node::TextRun {
        style,
        children: normalize_nodes(content)?,
    })
}

// A code block's only class is its language; the identifier, if any,
// names the block.
fn code_block(attr: &Attr, text: &str) -> Result<Node> {
    let [language] = attr.classes.as_slice() else {
        return Err(Error::UnsupportedCodeAttributes {
            kind: "code block",
            attr: format!("{attr:?}"),
        });
    };

    Ok(Node::CodeBlock {
        name: (!attr.id.is_empty()).then(|| attr.id.clone()),
        language: language.clone(),
        text: text.to_string(),
    })
}

fn is_verbatim(attr: &Attr) -> bool {
    attr.id.is_empty() && attr.attributes.is_empty() && attr.classes == ["verbatim"]
}

fn task_marker(classes: &[String]) -> Option<TaskMarker> {
    if classes.iter().any(|c| c == "done") {
        Some(TaskMarker::Done)
    } else if classes.iter().any(|c| c == "todo") {
        Some(TaskMarker::Todo)
    } else {
        None
    }
}

/// Build a heading or paragraph, turning it into a todo item when its first
/// child is a TODO/DONE span. Only that first child is dropped.
fn promote(origin: TodoOrigin, children: Vec<Node>) -> Result<Node> {
    let marker = match children.first() {
        None => {
            return Err(Error::EmptyNode {
                kind: match origin {
                    TodoOrigin::Heading(_) => "heading",
                    TodoOrigin::Paragraph => "paragraph",
                },
            });
        }
        Some(Node::Span { marker, .. }) => *marker,
        Some(_) => None,
    };

    let node = match (marker, origin) {
        (Some(marker), origin) => Node::TodoItem {
            origin,
            done: marker.is_done(),
            children: children.into_iter().skip(1).collect(),
        },
        (None, TodoOrigin::Heading(level)) => Node::Heading { level, children },
        (None, TodoOrigin::Paragraph) => Node::Paragraph { children },
    };

    Ok(node)
}
