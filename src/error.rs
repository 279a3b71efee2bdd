use thiserror::Error;

/// Errors raised while reading, normalizing or rendering a single document.
///
/// All of them are structural: the document is rejected as a whole and no
/// partial output is produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pandoc JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed `{kind}` node: {detail}")]
    MalformedInput { kind: String, detail: String },

    #[error("metadata field `{key}` has unsupported type `{kind}`")]
    UnsupportedMetadata { key: String, kind: String },

    #[error("unsupported node kind `{kind}`")]
    UnsupportedNodeKind { kind: String },

    #[error("raw block is not a `#+KEY: VALUE` directive: {raw:?}")]
    MalformedDirective { raw: String },

    #[error("raw block has format `{format}`, expected `org`")]
    UnsupportedRawFormat { format: String },

    #[error("heading (level {level}) has attributes: {attr}")]
    UnsupportedHeadingAttributes { level: u32, attr: String },

    #[error("{kind} has unsupported attributes: {attr}")]
    UnsupportedCodeAttributes { kind: &'static str, attr: String },

    #[error("link to {target:?} has attributes: {attr}")]
    UnsupportedLinkAttributes { target: String, attr: String },

    #[error("{kind} has no children")]
    EmptyNode { kind: &'static str },

    #[error("heading level {level} is outside 1..=6")]
    InvalidHeadingLevel { level: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
