//! A lossless syntax tree for JWCC ("JSON with commas and comments").
//!
//! Every value carries the raw whitespace and comments ("extra") found
//! immediately before and after it, so packing an unmodified tree yields
//! the input byte for byte. Composite nodes track whether they were edited;
//! [`Value::format`] only lays out what an edit added to them.

pub mod format;
pub mod parser;

pub use parser::parse;

/// A value and the extra text surrounding it.
#[derive(Debug, Clone)]
pub struct Value {
    pub before: String,
    pub node: Node,
    pub after: String,
    /// Set on values created by an edit. The next format pass lays out the
    /// extra in front of them (for an object member, in front of its name).
    pub(crate) fresh: bool,
}

#[derive(Debug, Clone)]
pub enum Node {
    Object(Object),
    Array(Array),
    String(Str),
    /// Raw number literal as written in the source.
    Number(String),
    Bool(bool),
    Null,
}

/// A string literal. Keeps the source spelling so unmodified escapes are
/// packed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    value: String,
    raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct Object {
    pub members: Vec<Member>,
    /// Extra before the closing `}`.
    pub after: String,
    pub trailing_comma: bool,
    pub(crate) dirty: bool,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: Name,
    pub value: Value,
}

/// An object key. `after` sits between the key and the colon.
#[derive(Debug, Clone)]
pub struct Name {
    pub before: String,
    pub key: Str,
    pub after: String,
}

#[derive(Debug, Clone, Default)]
pub struct Array {
    pub elements: Vec<Value>,
    /// Extra before the closing `]`.
    pub after: String,
    pub trailing_comma: bool,
    pub(crate) dirty: bool,
}

impl Str {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let raw = serde_json::Value::String(value.clone()).to_string();
        Self { value, raw }
    }

    pub(crate) fn from_raw(value: String, raw: String) -> Self {
        Self { value, raw }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Value {
    pub fn new(node: Node) -> Self {
        Self {
            before: String::new(),
            node,
            after: String::new(),
            fresh: true,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(Node::String(Str::new(s)))
    }

    /// Serializes the tree back to text.
    pub fn pack(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.before);
        self.node.write(out);
        out.push_str(&self.after);
    }

    /// Strips all comments, whitespace and trailing commas and rewrites
    /// string literals in their canonical spelling. The packed result is
    /// strict, compact JSON.
    pub fn minimize(&mut self) {
        self.before.clear();
        self.after.clear();
        match &mut self.node {
            Node::Object(obj) => {
                for m in &mut obj.members {
                    m.name.before.clear();
                    m.name.after.clear();
                    m.name.key = Str::new(m.name.key.as_str());
                    m.value.minimize();
                }
                obj.after.clear();
                obj.trailing_comma = false;
            }
            Node::Array(arr) => {
                for e in &mut arr.elements {
                    e.minimize();
                }
                arr.after.clear();
                arr.trailing_comma = false;
            }
            Node::String(s) => *s = Str::new(s.as_str()),
            Node::Number(_) | Node::Bool(_) | Node::Null => {}
        }
    }

    /// Strict JSON for the same document, leaving `self` untouched.
    pub fn standardize(&self) -> String {
        let mut v = self.clone();
        v.minimize();
        v.pack()
    }

    /// Whether the document is already plain JSON: no comments and no
    /// trailing commas anywhere.
    pub fn is_standard(&self) -> bool {
        !has_comment(&self.before) && !has_comment(&self.after) && self.node.is_standard()
    }
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Object(_) => "object",
            Node::Array(_) => "array",
            Node::String(_) => "string",
            Node::Number(_) => "number",
            Node::Bool(_) => "bool",
            Node::Null => "null",
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Node::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Node::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Node::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Marks a composite node for re-layout on the next format pass.
    pub fn mark_dirty(&mut self) {
        match self {
            Node::Object(obj) => obj.dirty = true,
            Node::Array(arr) => arr.dirty = true,
            _ => {}
        }
    }

    fn write(&self, out: &mut String) {
        match self {
            Node::Object(obj) => {
                out.push('{');
                for (i, m) in obj.members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&m.name.before);
                    out.push_str(m.name.key.raw());
                    out.push_str(&m.name.after);
                    out.push(':');
                    m.value.write(out);
                }
                if obj.trailing_comma && !obj.members.is_empty() {
                    out.push(',');
                }
                out.push_str(&obj.after);
                out.push('}');
            }
            Node::Array(arr) => {
                out.push('[');
                for (i, e) in arr.elements.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    e.write(out);
                }
                if arr.trailing_comma && !arr.elements.is_empty() {
                    out.push(',');
                }
                out.push_str(&arr.after);
                out.push(']');
            }
            Node::String(s) => out.push_str(s.raw()),
            Node::Number(n) => out.push_str(n),
            Node::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Node::Null => out.push_str("null"),
        }
    }

    fn is_standard(&self) -> bool {
        match self {
            Node::Object(obj) => {
                !(obj.trailing_comma && !obj.members.is_empty())
                    && !has_comment(&obj.after)
                    && obj.members.iter().all(|m| {
                        !has_comment(&m.name.before)
                            && !has_comment(&m.name.after)
                            && m.value.is_standard()
                    })
            }
            Node::Array(arr) => {
                !(arr.trailing_comma && !arr.elements.is_empty())
                    && !has_comment(&arr.after)
                    && arr.elements.iter().all(Value::is_standard)
            }
            _ => true,
        }
    }

    /// Whether the packed node spans more than one line.
    pub(crate) fn has_newline(&self) -> bool {
        match self {
            Node::Object(obj) => {
                obj.after.contains('\n')
                    || obj.members.iter().any(|m| {
                        m.name.before.contains('\n')
                            || m.name.after.contains('\n')
                            || m.value.before.contains('\n')
                            || m.value.after.contains('\n')
                            || m.value.node.has_newline()
                    })
            }
            Node::Array(arr) => {
                arr.after.contains('\n')
                    || arr.elements.iter().any(|e| {
                        e.before.contains('\n') || e.after.contains('\n') || e.node.has_newline()
                    })
            }
            _ => false,
        }
    }
}

impl Object {
    /// An empty object that will be laid out on the next format pass.
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name.key.as_str() == key)
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name.key.as_str() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.name.key.as_str() == key)
    }

    pub fn push(&mut self, member: Member) {
        self.members.push(member);
        self.dirty = true;
    }

    /// Removes the member at `i`. A comment that trailed the previous
    /// member on the same line is kept in place.
    pub fn remove(&mut self, i: usize) -> Member {
        let removed = self.members.remove(i);
        let carry = same_line_prefix(&removed.name.before);
        match self.members.get_mut(i) {
            Some(next) => next.name.before.insert_str(0, carry),
            None => self.after.insert_str(0, carry),
        }
        self.dirty = true;
        removed
    }
}

impl Member {
    pub fn new(key: impl Into<String>, node: Node) -> Self {
        Self {
            name: Name {
                before: String::new(),
                key: Str::new(key),
                after: String::new(),
            },
            value: Value::new(node),
        }
    }

    /// Like [`Member::new`], but starts the member on its own line.
    pub fn on_own_line(key: impl Into<String>, node: Node) -> Self {
        let mut m = Self::new(key, node);
        m.name.before.push('\n');
        m
    }

    pub fn key(&self) -> &str {
        self.name.key.as_str()
    }

    /// Moves an existing member onto its own line on the next format pass.
    /// Returns false when it already starts one.
    pub(crate) fn break_line(&mut self) -> bool {
        if self.name.before.contains('\n') {
            return false;
        }
        self.name.before.insert(0, '\n');
        self.value.fresh = true;
        true
    }
}

impl Array {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn push(&mut self, value: Value) {
        self.elements.push(value);
        self.dirty = true;
    }

    pub fn remove(&mut self, i: usize) -> Value {
        let removed = self.elements.remove(i);
        let carry = same_line_prefix(&removed.before);
        match self.elements.get_mut(i) {
            Some(next) => next.before.insert_str(0, carry),
            None => self.after.insert_str(0, carry),
        }
        self.dirty = true;
        removed
    }
}

/// A lexical element of extra text. Spaces, tabs and carriage returns are
/// not significant and are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trivia<'a> {
    Newline,
    LineComment(&'a str),
    BlockComment(&'a str),
}

impl<'a> Trivia<'a> {
    pub(crate) fn comment(&self) -> Option<&'a str> {
        match self {
            Trivia::Newline => None,
            Trivia::LineComment(c) | Trivia::BlockComment(c) => Some(c),
        }
    }
}

/// Splits extra text into newlines and comments, with their byte offsets.
pub(crate) fn trivia(extra: &str) -> Vec<(usize, Trivia<'_>)> {
    let bytes = extra.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                out.push((i, Trivia::Newline));
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = extra[i..].find('\n').map_or(bytes.len(), |n| i + n);
                let text = extra[i..end].trim_end_matches('\r');
                out.push((i, Trivia::LineComment(text)));
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = extra[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |n| i + 2 + n + 2);
                out.push((i, Trivia::BlockComment(&extra[i..end])));
                i = end;
            }
            _ => i += 1,
        }
    }
    out
}

pub(crate) fn has_comment(extra: &str) -> bool {
    extra.contains("//") || extra.contains("/*")
}

/// The part of `extra` that shares a line with whatever precedes it, when
/// that part holds a comment. Empty otherwise.
pub(crate) fn same_line_prefix(extra: &str) -> &str {
    let tokens = trivia(extra);
    match tokens.first() {
        Some((_, t)) if t.comment().is_some() => {
            let end = tokens
                .iter()
                .find(|(_, t)| *t == Trivia::Newline)
                .map_or(extra.len(), |(off, _)| *off);
            &extra[..end]
        }
        _ => "",
    }
}

/// The text of the comments in `extra`, without comment punctuation. A
/// comment sharing a line with the preceding token is not included.
pub fn comment_text(extra: &str) -> String {
    let extra = &extra[same_line_prefix(extra).len()..];
    let mut lines = Vec::new();
    for (_, t) in trivia(extra) {
        match t {
            Trivia::LineComment(c) => lines.push(c.trim_start_matches("//").to_string()),
            Trivia::BlockComment(c) => {
                let inner = c.trim_start_matches("/*");
                lines.push(inner.strip_suffix("*/").unwrap_or(inner).to_string());
            }
            Trivia::Newline => {}
        }
    }
    lines.join("\n").trim().to_string()
}
