use std::collections::BTreeMap;

/// Formatting applied to a run of inline content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Plain,
    Bold,
    Italic,
}

/// Task status carried by a TODO/DONE span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMarker {
    Todo,
    Done,
}

impl TaskMarker {
    pub fn is_done(self) -> bool {
        self == TaskMarker::Done
    }
}

/// The container a todo item was promoted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoOrigin {
    Heading(u32),
    Paragraph,
}

/// A single item of an ordered list
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub children: Vec<Node>,
}

/// Document nodes produced by normalizing a pandoc tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `#+KEY: VALUE` line; the key is lower-cased.
    Directive {
        key: String,
        value: String,
    },
    Heading {
        level: u32,
        children: Vec<Node>,
    },
    Paragraph {
        children: Vec<Node>,
    },
    /// A heading or paragraph that started with a TODO/DONE marker. The
    /// marker itself is not part of `children`.
    TodoItem {
        origin: TodoOrigin,
        done: bool,
        children: Vec<Node>,
    },
    TextRun {
        style: TextStyle,
        children: Vec<Node>,
    },
    OrderedList {
        start: u32,
        // Numbering style and delimiter are pandoc constructor names, kept
        // as-is and never consulted when rendering.
        style: String,
        delimiter: String,
        items: Vec<ListItem>,
    },
    InlineCode {
        text: String,
    },
    CodeBlock {
        name: Option<String>,
        language: String,
        text: String,
    },
    Link {
        target: String,
        children: Vec<Node>,
    },
    Span {
        marker: Option<TaskMarker>,
        children: Vec<Node>,
    },
    Literal(String),
    Space,
    SoftBreak,
}

/// A normalized document: front-matter metadata plus top-level nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub metadata: BTreeMap<String, String>,
    pub nodes: Vec<Node>,
}

/// A top-level todo item, as reported by [`Document::tasks`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Task<'a> {
    pub origin: TodoOrigin,
    pub done: bool,
    pub children: &'a [Node],
}

impl Document {
    /// Top-level directives in document order.
    pub fn directives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Directive { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Value of the first directive with the given key (case-insensitive).
    pub fn directive(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.directives()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    /// Top-level todo items in document order.
    pub fn tasks(&self) -> impl Iterator<Item = Task<'_>> {
        self.nodes.iter().filter_map(|node| match node {
            Node::TodoItem {
                origin,
                done,
                children,
            } => Some(Task {
                origin: *origin,
                done: *done,
                children,
            }),
            _ => None,
        })
    }
}
