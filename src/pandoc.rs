//! Pandoc's document tree, as emitted by `pandoc -t json`.
//!
//! This is the generic input of the pipeline. Only the node kinds the
//! normalizer understands are modelled; any other kind is kept as
//! [`Node::Other`] with its tag so the normalizer can reject it by name.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Pandoc's `(identifier, classes, key-value pairs)` attribute triple
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attr {
    pub id: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl Attr {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

/// Start number, numbering style and delimiter of an ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAttributes {
    pub start: u32,
    pub style: String,
    pub delimiter: String,
}

/// A node of the pandoc tree; block and inline kinds share one type
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    RawBlock {
        format: String,
        text: String,
    },
    Header {
        level: u32,
        attr: Attr,
        content: Vec<Node>,
    },
    Para(Vec<Node>),
    Plain(Vec<Node>),
    Strong(Vec<Node>),
    Emph(Vec<Node>),
    OrderedList {
        attributes: ListAttributes,
        items: Vec<Vec<Node>>,
    },
    CodeBlock {
        attr: Attr,
        text: String,
    },
    Code {
        attr: Attr,
        text: String,
    },
    Link {
        attr: Attr,
        content: Vec<Node>,
        target: String,
        title: String,
    },
    Span {
        attr: Attr,
        content: Vec<Node>,
    },
    Str(String),
    Space,
    SoftBreak,
    /// Any node kind not listed above, by its pandoc tag.
    Other(String),
}

/// A whole pandoc document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pandoc {
    pub api_version: Vec<u32>,
    pub meta: BTreeMap<String, String>,
    pub blocks: Vec<Node>,
}

#[derive(Deserialize)]
struct RawPandoc {
    #[serde(rename = "pandoc-api-version")]
    api_version: Vec<u32>,
    meta: Map<String, Value>,
    blocks: Vec<Value>,
}

/// Read a pandoc JSON document.
pub fn read_json(json: &str) -> Result<Pandoc> {
    let raw: RawPandoc = serde_json::from_str(json)?;

    let meta = raw
        .meta
        .iter()
        .map(|(key, value)| -> Result<(String, String)> {
            Ok((key.clone(), read_meta(key, value)?))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let blocks: Vec<Node> = raw.blocks.iter().map(read_node).collect::<Result<_>>()?;

    Ok(Pandoc {
        api_version: raw.api_version,
        meta,
        blocks,
    })
}

fn malformed(kind: &str, detail: impl Into<String>) -> Error {
    Error::MalformedInput {
        kind: kind.to_string(),
        detail: detail.into(),
    }
}

fn tag(value: &Value) -> Option<&str> {
    value.get("t").and_then(Value::as_str)
}

fn content(value: &Value) -> &Value {
    value.get("c").unwrap_or(&Value::Null)
}

fn payload<'a, T: Deserialize<'a>>(kind: &str, value: &'a Value) -> Result<T> {
    T::deserialize(value).map_err(|e| malformed(kind, e.to_string()))
}

fn fields<'a, const N: usize>(kind: &str, value: &'a Value) -> Result<[&'a Value; N]> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed(kind, "expected an array payload"))?;
    let refs: Vec<&Value> = items.iter().collect();
    refs.try_into()
        .map_err(|_| malformed(kind, format!("expected {N} fields, found {}", items.len())))
}

fn read_attr(kind: &str, value: &Value) -> Result<Attr> {
    let (id, classes, attributes): (String, Vec<String>, Vec<(String, String)>) =
        payload(kind, value)?;
    Ok(Attr {
        id,
        classes,
        attributes,
    })
}

fn read_nodes(kind: &str, value: &Value) -> Result<Vec<Node>> {
    value
        .as_array()
        .ok_or_else(|| malformed(kind, "expected a list of nodes"))?
        .iter()
        .map(read_node)
        .collect()
}

fn read_node(value: &Value) -> Result<Node> {
    let kind = tag(value).ok_or_else(|| malformed("node", "missing `t` tag"))?;
    let c = content(value);

    let node = match kind {
        "RawBlock" => {
            let (format, text): (String, String) = payload(kind, c)?;
            Node::RawBlock { format, text }
        }
        "Header" => {
            let [level, attr, inlines] = fields::<3>(kind, c)?;
            Node::Header {
                level: payload(kind, level)?,
                attr: read_attr(kind, attr)?,
                content: read_nodes(kind, inlines)?,
            }
        }
        "Para" => Node::Para(read_nodes(kind, c)?),
        "Plain" => Node::Plain(read_nodes(kind, c)?),
        "Strong" => Node::Strong(read_nodes(kind, c)?),
        "Emph" => Node::Emph(read_nodes(kind, c)?),
        "OrderedList" => {
            let [attributes, items] = fields::<2>(kind, c)?;
            let [start, style, delimiter] = fields::<3>(kind, attributes)?;
            let items: Vec<Vec<Node>> = items
                .as_array()
                .ok_or_else(|| malformed(kind, "expected a list of items"))?
                .iter()
                .map(|item| read_nodes(kind, item))
                .collect::<Result<_>>()?;
            Node::OrderedList {
                attributes: ListAttributes {
                    start: payload(kind, start)?,
                    style: tag(style)
                        .ok_or_else(|| malformed(kind, "missing numbering style"))?
                        .to_string(),
                    delimiter: tag(delimiter)
                        .ok_or_else(|| malformed(kind, "missing number delimiter"))?
                        .to_string(),
                },
                items,
            }
        }
        "CodeBlock" | "Code" => {
            let [attr, text] = fields::<2>(kind, c)?;
            let attr = read_attr(kind, attr)?;
            let text = payload(kind, text)?;
            if kind == "Code" {
                Node::Code { attr, text }
            } else {
                Node::CodeBlock { attr, text }
            }
        }
        "Link" => {
            let [attr, inlines, target] = fields::<3>(kind, c)?;
            let (target, title): (String, String) = payload(kind, target)?;
            Node::Link {
                attr: read_attr(kind, attr)?,
                content: read_nodes(kind, inlines)?,
                target,
                title,
            }
        }
        "Span" => {
            let [attr, inlines] = fields::<2>(kind, c)?;
            Node::Span {
                attr: read_attr(kind, attr)?,
                content: read_nodes(kind, inlines)?,
            }
        }
        "Str" => Node::Str(payload(kind, c)?),
        "Space" => Node::Space,
        "SoftBreak" => Node::SoftBreak,
        other => Node::Other(other.to_string()),
    };

    Ok(node)
}

fn read_meta(key: &str, value: &Value) -> Result<String> {
    let kind = tag(value).unwrap_or("untagged");
    let c = content(value);

    match kind {
        "MetaString" => payload(kind, c),
        "MetaBool" => payload::<bool>(kind, c).map(|b| b.to_string()),
        "MetaInlines" | "MetaBlocks" => {
            let mut text = String::new();
            stringify(c, &mut text);
            Ok(text.trim().to_string())
        }
        other => Err(Error::UnsupportedMetadata {
            key: key.to_string(),
            kind: other.to_string(),
        }),
    }
}

/// Flatten inline content to plain text. Only `Str` and `Code` carry
/// text; attribute and target strings are never picked up.
fn stringify(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            for item in items {
                stringify(item, out);
            }
        }
        Value::Object(_) => match tag(value) {
            Some("Str") => {
                if let Some(text) = content(value).as_str() {
                    out.push_str(text);
                }
            }
            Some("Space" | "SoftBreak" | "LineBreak") => out.push(' '),
            Some("Code") => {
                if let Some(text) = content(value).get(1).and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
            _ => stringify(content(value), out),
        },
        _ => {}
    }
}
