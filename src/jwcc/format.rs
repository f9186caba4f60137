//! Layout normalization for edited regions of a tree.
//!
//! Only composites marked dirty are touched, and inside them only the
//! children an edit created, plus any child that has to move onto its own
//! line. Everything else keeps its bytes. New lines are indented like
//! their siblings, or one step deeper than the line of the opening
//! bracket, with the step taken from the document's own indentation.

use tracing::trace;

use super::{has_comment, trivia, Member, Node, Trivia, Value};

impl Value {
    /// Lays out every edited composite in the tree.
    ///
    /// A composite goes multi-line when any of its children or its closing
    /// bracket already sits on a line of its own. Composites that gain their
    /// first children get trailing commas unless the whole document is plain
    /// JSON, so that a standard JSON file stays standard. Others keep the
    /// trailing comma choice they were written with.
    pub fn format(&mut self) {
        let standard = self.is_standard();
        if !settle(&mut self.node, standard) {
            return;
        }
        let unit = indent_unit(self);
        let line = own_line_indent(&self.before).unwrap_or("").to_string();
        indent_node(&mut self.node, &line, &unit);
        trace!(standard, unit = %unit.escape_debug(), "formatted edited regions");
    }
}

/// The slots of a composite child that layout cares about.
trait Child {
    fn leading(&self) -> &str;
    fn leading_mut(&mut self) -> &mut String;
    fn trailing(&self) -> &str;
    fn trailing_mut(&mut self) -> &mut String;
    fn node(&self) -> &Node;
    fn node_mut(&mut self) -> &mut Node;
    fn fresh(&self) -> bool;
    fn placed(&mut self);
    /// Indentation of the line the child's value opens on, when the child
    /// starts a line.
    fn line_indent(&self) -> Option<&str>;
    fn tidy(&mut self) {}
}

impl Child for Member {
    fn leading(&self) -> &str {
        &self.name.before
    }

    fn leading_mut(&mut self) -> &mut String {
        &mut self.name.before
    }

    fn trailing(&self) -> &str {
        &self.value.after
    }

    fn trailing_mut(&mut self) -> &mut String {
        &mut self.value.after
    }

    fn node(&self) -> &Node {
        &self.value.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.value.node
    }

    fn fresh(&self) -> bool {
        self.value.fresh
    }

    fn placed(&mut self) {
        self.value.fresh = false;
    }

    fn line_indent(&self) -> Option<&str> {
        own_line_indent(&self.value.before).or_else(|| own_line_indent(&self.name.before))
    }

    fn tidy(&mut self) {
        self.tidy_separators();
    }
}

impl Child for Value {
    fn leading(&self) -> &str {
        &self.before
    }

    fn leading_mut(&mut self) -> &mut String {
        &mut self.before
    }

    fn trailing(&self) -> &str {
        &self.after
    }

    fn trailing_mut(&mut self) -> &mut String {
        &mut self.after
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    fn fresh(&self) -> bool {
        self.fresh
    }

    fn placed(&mut self) {
        self.fresh = false;
    }

    fn line_indent(&self) -> Option<&str> {
        own_line_indent(&self.before)
    }
}

impl Member {
    fn tidy_separators(&mut self) {
        if let Some(s) = inline(&self.name.after, "", " ", " ") {
            self.name.after = s;
        }
        if let Some(s) = inline(&self.value.before, " ", " ", " ") {
            self.value.before = s;
        }
    }
}

/// Whitespace at the start of the last line of `extra`, if `extra` breaks
/// the line at all.
fn own_line_indent(extra: &str) -> Option<&str> {
    let (_, line) = extra.rsplit_once('\n')?;
    let end = line.find(|c: char| c != ' ' && c != '\t').unwrap_or(line.len());
    Some(&line[..end])
}

/// First pass, bottom up: settles comments, trailing commas and the choice
/// between one line and one line per child. Single-line composites are
/// finished here; multi-line ones stay dirty until [`indent_node`] knows
/// their indentation. Returns whether anything at or below `node` was dirty.
fn settle(node: &mut Node, standard: bool) -> bool {
    match node {
        Node::Object(obj) => {
            let mut dirty = obj.dirty;
            for m in &mut obj.members {
                dirty |= settle(&mut m.value.node, standard);
            }
            if obj.dirty {
                obj.dirty = settle_children(&mut obj.members, &mut obj.after, &mut obj.trailing_comma, standard);
            }
            dirty
        }
        Node::Array(arr) => {
            let mut dirty = arr.dirty;
            for e in &mut arr.elements {
                dirty |= settle(&mut e.node, standard);
            }
            if arr.dirty {
                arr.dirty = settle_children(&mut arr.elements, &mut arr.after, &mut arr.trailing_comma, standard);
            }
            dirty
        }
        _ => false,
    }
}

/// Returns whether the composite still needs multi-line indentation.
fn settle_children<C: Child>(
    children: &mut [C],
    closing: &mut String,
    trailing_comma: &mut bool,
    standard: bool,
) -> bool {
    let n = children.len();
    let multiline = (n > 0 || has_comment(closing))
        && (closing.contains('\n')
            || children.iter().any(|c| {
                c.leading().contains('\n') || c.trailing().contains('\n') || c.node().has_newline()
            }));
    if children.iter().all(Child::fresh) {
        *trailing_comma = multiline && !standard && n > 0;
    }

    // A line comment right after a child would swallow a comma written
    // after it, so it moves past the comma.
    for i in 0..n {
        let comma_follows = i + 1 < n || *trailing_comma;
        if comma_follows && ends_in_line_comment(children[i].trailing()) {
            let moved = std::mem::take(children[i].trailing_mut());
            match children.get_mut(i + 1) {
                Some(next) => next.leading_mut().insert_str(0, &moved),
                None => closing.insert_str(0, &moved),
            }
        }
    }
    for c in children.iter_mut().filter(|c| c.fresh()) {
        c.tidy();
    }
    if multiline {
        return true;
    }

    if closing.contains('\n') {
        if let Some(laid) = inline(closing, "", " ", "") {
            *closing = laid;
        }
    }
    let pad = if has_comment(closing) { String::new() } else { closing.clone() };
    let sep = children
        .iter()
        .skip(1)
        .filter(|c| !c.fresh() && !has_comment(c.leading()))
        .map(|c| c.leading().to_string())
        .next()
        .unwrap_or_else(|| " ".to_string());
    for (i, c) in children.iter_mut().enumerate() {
        if i == 0 && !has_comment(c.leading()) {
            *c.leading_mut() = pad.clone();
        } else if c.fresh() {
            let (empty, open) = if i == 0 { ("", "") } else { (sep.as_str(), " ") };
            if let Some(laid) = inline(c.leading(), empty, open, " ") {
                *c.leading_mut() = laid;
            }
        }
        c.placed();
    }
    false
}

fn ends_in_line_comment(extra: &str) -> bool {
    matches!(trivia(extra).last(), Some((_, Trivia::LineComment(_))))
}

/// The indentation step of the document: the first difference between the
/// indentation of a composite's line and that of a child on its own line.
/// A tab when the document shows none.
fn indent_unit(root: &Value) -> String {
    let line = own_line_indent(&root.before).unwrap_or("");
    find_unit(&root.node, line).unwrap_or_else(|| "\t".to_string())
}

fn find_unit<'a>(node: &'a Node, line: &'a str) -> Option<String> {
    match node {
        Node::Object(obj) => find_unit_in(&obj.members, line),
        Node::Array(arr) => find_unit_in(&arr.elements, line),
        _ => None,
    }
}

fn find_unit_in<'a, C: Child>(children: &'a [C], line: &'a str) -> Option<String> {
    let mut current = line;
    for c in children.iter().filter(|c| !c.fresh()) {
        if let Some(indent) = own_line_indent(c.leading()) {
            match indent.strip_prefix(line) {
                Some(step) if !step.is_empty() => return Some(step.to_string()),
                _ => current = indent,
            }
        }
        if let Some(unit) = find_unit(c.node(), c.line_indent().unwrap_or(current)) {
            return Some(unit);
        }
    }
    None
}

/// Second pass, top down: indents the multi-line composites left dirty by
/// [`settle`]. `line` is the indentation of the line holding the opening
/// bracket.
fn indent_node(node: &mut Node, line: &str, unit: &str) {
    match node {
        Node::Object(obj) => {
            if obj.dirty {
                break_lines(&mut obj.members, &mut obj.after, line, unit);
                obj.dirty = false;
            }
            indent_children(&mut obj.members, line, unit);
        }
        Node::Array(arr) => {
            if arr.dirty {
                break_lines(&mut arr.elements, &mut arr.after, line, unit);
                arr.dirty = false;
            }
            indent_children(&mut arr.elements, line, unit);
        }
        _ => {}
    }
}

fn indent_children<C: Child>(children: &mut [C], line: &str, unit: &str) {
    let mut current = line.to_string();
    for c in children.iter_mut() {
        c.placed();
        if let Some(indent) = c.line_indent() {
            current = indent.to_string();
        }
        indent_node(c.node_mut(), &current, unit);
    }
}

/// Puts fresh children, and any not yet on a line of their own, on their
/// own lines. Children already laid out that way are left alone.
fn break_lines<C: Child>(children: &mut [C], closing: &mut String, line: &str, unit: &str) {
    let indent = children
        .iter()
        .filter(|c| !c.fresh())
        .find_map(|c| own_line_indent(c.leading()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", line, unit));
    for (i, c) in children.iter_mut().enumerate() {
        if c.fresh() || !c.leading().contains('\n') {
            let laid = leading_multiline(c.leading(), i == 0, &indent);
            *c.leading_mut() = laid;
        }
    }
    if !closing.contains('\n') {
        *closing = closing_multiline(closing, &indent, line);
    }
}

/// Rewrites `extra` to fit on one line: `empty` when it holds no comments,
/// otherwise its block comments joined by spaces between `open` and
/// `close`. `None` when a line comment pins it to more than one line.
fn inline(extra: &str, empty: &str, open: &str, close: &str) -> Option<String> {
    let mut comments = Vec::new();
    for (_, t) in trivia(extra) {
        match t {
            Trivia::LineComment(_) => return None,
            Trivia::BlockComment(c) => comments.push(c),
            Trivia::Newline => {}
        }
    }
    if comments.is_empty() {
        Some(empty.to_string())
    } else {
        Some(format!("{}{}{}", open, comments.join(" "), close))
    }
}

/// A comment before the first newline belongs on the line of the token
/// preceding the extra.
fn split_same_line<'a, 't>(tokens: &'t [(usize, Trivia<'a>)]) -> (Option<&'a str>, &'t [(usize, Trivia<'a>)]) {
    match tokens.first().and_then(|(_, t)| t.comment()) {
        Some(c) => (Some(c), &tokens[1..]),
        None => (None, tokens),
    }
}

/// Appends the comments in `tokens` to `out`. A comment following another
/// on the same line stays there; the others start on a fresh line with at
/// most one blank line before them. Returns the newlines seen after the
/// last comment and whether any comment was put on its own line.
fn push_comments(out: &mut String, tokens: &[(usize, Trivia<'_>)], indent: &str, first: bool) -> (usize, bool) {
    let mut newlines = 0;
    let mut placed = false;
    for (_, t) in tokens {
        match t.comment() {
            None => newlines += 1,
            Some(c) => {
                if newlines == 0 && !out.is_empty() {
                    out.push(' ');
                } else {
                    let lines = if first && !placed { 1 } else { newlines.clamp(1, 2) };
                    out.push_str(&"\n".repeat(lines));
                    out.push_str(indent);
                }
                out.push_str(c);
                newlines = 0;
                placed = true;
            }
        }
    }
    (newlines, placed)
}

fn leading_multiline(extra: &str, first: bool, indent: &str) -> String {
    let tokens = trivia(extra);
    let (same_line, rest) = split_same_line(&tokens);
    let mut out = String::new();
    if let Some(c) = same_line {
        out.push(' ');
        out.push_str(c);
    }
    let (newlines, placed) = push_comments(&mut out, rest, indent, first);
    if newlines == 0 && !out.is_empty() {
        // Right after a block comment.
        out.push(' ');
    } else {
        let lines = if first && !placed { 1 } else { newlines.clamp(1, 2) };
        out.push_str(&"\n".repeat(lines));
        out.push_str(indent);
    }
    out
}

fn closing_multiline(extra: &str, child_indent: &str, indent: &str) -> String {
    let tokens = trivia(extra);
    let (same_line, rest) = split_same_line(&tokens);
    let mut out = String::new();
    if let Some(c) = same_line {
        out.push(' ');
        out.push_str(c);
    }
    push_comments(&mut out, rest, child_indent, false);
    out.push('\n');
    out.push_str(indent);
    out
}

#[cfg(test)]
mod tests {
    use super::super::{parse, Array, Member, Node, Object, Str, Value};
    use pretty_assertions::assert_eq;

    fn packages_mut(v: &mut Value) -> &mut Node {
        &mut v
            .node
            .as_object_mut()
            .unwrap()
            .get_mut("packages")
            .unwrap()
            .value
            .node
    }

    #[test]
    fn test_format_untouched_is_noop() {
        let src = "{ \"a\":1,\n\t\t\"b\" : [ 1,2 ] }";
        let mut v = parse(src).unwrap();
        v.format();
        assert_eq!(v.pack(), src);
    }

    #[test]
    fn test_format_single_line_array() {
        let mut v = parse("{\"packages\": []}").unwrap();
        packages_mut(&mut v)
            .as_array_mut()
            .unwrap()
            .push(Value::string("go@latest"));
        v.format();
        assert_eq!(v.pack(), "{\"packages\": [\"go@latest\"]}");
    }

    #[test]
    fn test_format_breaks_lines_once_multiline() {
        let mut v = parse("{\n  \"packages\": [\"go\"]\n}").unwrap();
        let mut elem = Value::string("python@3.10");
        elem.before.push('\n');
        packages_mut(&mut v).as_array_mut().unwrap().push(elem);
        v.format();
        assert_eq!(
            v.pack(),
            "{\n  \"packages\": [\n    \"go\",\n    \"python@3.10\"\n  ]\n}"
        );
    }

    #[test]
    fn test_format_follows_four_space_indent() {
        let src = "{\n    \"packages\": [\"go\"],\n    \"env\": {\"A\": \"1\"}\n}";
        let mut v = parse(src).unwrap();
        let mut elem = Value::string("python");
        elem.before.push('\n');
        packages_mut(&mut v).as_array_mut().unwrap().push(elem);
        v.format();
        assert_eq!(
            v.pack(),
            "{\n    \"packages\": [\n        \"go\",\n        \"python\"\n    ],\n    \"env\": {\"A\": \"1\"}\n}"
        );
    }

    #[test]
    fn test_format_leaves_untouched_siblings() {
        let src = "{\n    \"name\": \"demo\",\n    \"packages\": [\n        \"go\"\n    ],\n    \"shell\": {\n        \"init_hook\": [\"echo hi\"]\n    }\n}";
        let mut v = parse(src).unwrap();
        let mut elem = Value::string("jq");
        elem.before.push('\n');
        packages_mut(&mut v).as_array_mut().unwrap().push(elem);
        v.format();
        assert_eq!(
            v.pack(),
            "{\n    \"name\": \"demo\",\n    \"packages\": [\n        \"go\",\n        \"jq\"\n    ],\n    \"shell\": {\n        \"init_hook\": [\"echo hi\"]\n    }\n}"
        );
    }

    #[test]
    fn test_format_keeps_comments_and_trailing_comma() {
        let src = "{\n  \"packages\": [\n    // Go\n    \"go\",\n\n    // Python\n    \"python@3.10\",\n  ]\n}";
        let mut v = parse(src).unwrap();
        let mut elem = Value::string("hello@latest");
        elem.before.push('\n');
        packages_mut(&mut v).as_array_mut().unwrap().push(elem);
        v.format();
        assert_eq!(
            v.pack(),
            "{\n  \"packages\": [\n    // Go\n    \"go\",\n\n    // Python\n    \"python@3.10\",\n    \"hello@latest\",\n  ]\n}"
        );
    }

    #[test]
    fn test_format_empty_object_collapses() {
        let mut v = parse("{\"packages\": {\n    \"go\": \"latest\"\n  }}").unwrap();
        packages_mut(&mut v).as_object_mut().unwrap().remove(0);
        v.format();
        assert_eq!(v.pack(), "{\"packages\": {}}");
    }

    #[test]
    fn test_format_new_nested_object() {
        let mut v = parse("{}").unwrap();
        let mut pkgs = Object::new();
        pkgs.push(Member::on_own_line("go", Node::String(Str::new("latest"))));
        let mut platforms = Array::new();
        platforms.push(Value::string("x86_64-linux"));
        pkgs.push(Member::on_own_line("platforms", Node::Array(platforms)));
        v.node
            .as_object_mut()
            .unwrap()
            .push(Member::on_own_line("packages", Node::Object(pkgs)));
        v.format();
        assert_eq!(
            v.pack().replace('\t', "  "),
            "{\n  \"packages\": {\n    \"go\": \"latest\",\n    \"platforms\": [\"x86_64-linux\"]\n  }\n}"
        );
    }

    #[test]
    fn test_format_same_line_comment_stays() {
        let src = "{\n  \"a\": 1, // one\n  \"b\": 2\n}";
        let mut v = parse(src).unwrap();
        v.node.as_object_mut().unwrap().push(Member::on_own_line("c", Node::Number("3".into())));
        v.format();
        assert_eq!(
            v.pack(),
            "{\n  \"a\": 1, // one\n  \"b\": 2,\n  \"c\": 3\n}"
        );
    }
}
