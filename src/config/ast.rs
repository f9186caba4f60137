//! Structural edits of a devbox.json syntax tree.
//!
//! Every edit is followed by a format pass, so only the regions an edit
//! touched change their layout.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::versioned::{join_name_version, parse_versioned_name};
use crate::core::{ConfigError, PatchMode, Result};
use crate::jwcc::{self, comment_text, Array, Member, Node, Object, Str, Value};

/// One step of a path into the document, for [`ConfigAst::before_comment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathItem<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for PathItem<'a> {
    fn from(key: &'a str) -> Self {
        PathItem::Key(key)
    }
}

impl From<usize> for PathItem<'_> {
    fn from(i: usize) -> Self {
        PathItem::Index(i)
    }
}

/// The syntax tree of a devbox.json file. The root is always an object.
#[derive(Debug, Clone)]
pub struct ConfigAst {
    root: Value,
}

impl ConfigAst {
    pub fn parse(source: &[u8]) -> Result<Self> {
        let root = jwcc::parser::parse_bytes(source)?;
        if root.node.as_object().is_none() {
            return Err(ConfigError::user(format!(
                "devbox.json must contain a JSON object, found {}",
                root.node.kind_name()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn pack(&self) -> String {
        self.root.pack()
    }

    /// Runs `edit` on the root object and formats the edited regions.
    fn edit<T>(&mut self, edit: impl FnOnce(&mut Object) -> Result<T>) -> Result<T> {
        let root = self
            .root
            .node
            .as_object_mut()
            .ok_or_else(|| ConfigError::internal("devbox.json root is not an object"))?;
        let out = edit(root);
        self.root.format();
        out
    }

    /// Adds a package. Object keys are unique, so when the object already
    /// lists `name` its version is replaced instead. Returns whether a new
    /// entry was added.
    pub fn append_package(&mut self, name: &str, version: &str) -> Result<bool> {
        self.edit(|root| {
            let packages = packages_member(root, false)?;
            let (added, changed) = match &mut packages.value.node {
                Node::Object(obj) => match obj.index_of(name) {
                    Some(i) => (false, set_version(&mut obj.members[i].value.node, version)),
                    None => {
                        obj.push(Member::on_own_line(name, Node::String(Str::new(version))));
                        (true, true)
                    }
                },
                Node::Array(arr) => {
                    let mut elem = Value::string(join_name_version(name, version));
                    if !arr.elements.is_empty() {
                        elem.before.push('\n');
                    }
                    arr.push(elem);
                    (true, true)
                }
                other => return Err(unexpected_packages(other)),
            };
            if changed && packages.break_line() {
                root.dirty = true;
            }
            debug!(name, version, added, changed, "appended package");
            Ok(added)
        })
    }

    /// Removes a package. In the legacy list the element must also match
    /// `version`; object keys are unique by name.
    pub fn remove_package(&mut self, name: &str, version: &str) -> Result<()> {
        self.edit(|root| {
            let Some(packages) = root.get_mut("packages") else {
                return Ok(());
            };
            match &mut packages.value.node {
                Node::Object(obj) => {
                    if let Some(i) = obj.index_of(name) {
                        obj.remove(i);
                    }
                }
                Node::Array(arr) => {
                    let found = arr.elements.iter().position(|e| {
                        e.node.as_str().map(parse_versioned_name) == Some((name, version))
                    });
                    if let Some(i) = found {
                        arr.remove(i);
                    }
                }
                Node::Null => {}
                other => return Err(unexpected_packages(other)),
            }
            debug!(name, version, "removed package");
            Ok(())
        })
    }

    pub fn append_platforms(&mut self, name: &str, platforms: &[String]) -> Result<()> {
        self.append_string_slice_field(name, "platforms", platforms)
    }

    pub fn append_excluded_platforms(&mut self, name: &str, platforms: &[String]) -> Result<()> {
        self.append_string_slice_field(name, "excluded_platforms", platforms)
    }

    pub fn append_outputs(&mut self, name: &str, outputs: &[String]) -> Result<()> {
        self.append_string_slice_field(name, "outputs", outputs)
    }

    pub fn append_allow_insecure(&mut self, name: &str, whitelist: &[String]) -> Result<()> {
        self.append_string_slice_field(name, "allow_insecure", whitelist)
    }

    fn append_string_slice_field(&mut self, name: &str, field: &str, values: &[String]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.edit(|root| {
            let Some(pkg) = find_pkg_object(root, name)? else {
                return Ok(());
            };
            let i = match pkg.index_of(field) {
                Some(i) => i,
                None => {
                    pkg.push(Member::on_own_line(field, Node::Array(Array::new())));
                    pkg.members.len() - 1
                }
            };
            let arr = pkg.members[i].value.node.as_array_mut().ok_or_else(|| {
                ConfigError::internal(format!("{} of package {} must be an array", field, name))
            })?;
            for v in values {
                arr.push(Value::string(v.as_str()));
            }
            debug!(name, field, count = values.len(), "appended to package field");
            Ok(())
        })
    }

    /// Adds or updates a boolean field of a package object.
    pub fn set_package_bool(&mut self, name: &str, field: &str, value: bool) -> Result<()> {
        self.edit(|root| {
            let Some(pkg) = find_pkg_object(root, name)? else {
                return Ok(());
            };
            match pkg.get_mut(field) {
                Some(m) => m.value.node = Node::Bool(value),
                None => pkg.push(Member::on_own_line(field, Node::Bool(value))),
            }
            debug!(name, field, value, "set package field");
            Ok(())
        })
    }

    /// Writes `patch` for a package. A deprecated `patch_glibc` field is
    /// renamed in place, so its position and comments are kept.
    pub fn set_patch(&mut self, name: &str, mode: PatchMode) -> Result<()> {
        self.edit(|root| {
            let Some(pkg) = find_pkg_object(root, name)? else {
                return Ok(());
            };
            let value = Node::String(Str::new(mode.as_str()));
            match (pkg.index_of("patch"), pkg.index_of("patch_glibc")) {
                (Some(i), glibc) => {
                    pkg.members[i].value.node = value;
                    if let Some(j) = glibc {
                        pkg.remove(j);
                    }
                }
                (None, Some(j)) => {
                    let member = &mut pkg.members[j];
                    member.name.key = Str::new("patch");
                    member.value.node = value;
                }
                (None, None) => pkg.push(Member::on_own_line("patch", value)),
            }
            debug!(name, %mode, "set patch mode");
            Ok(())
        })
    }

    /// Removes both the `patch` field and the deprecated `patch_glibc`.
    pub fn remove_patch(&mut self, name: &str) -> Result<()> {
        self.edit(|root| {
            let Some(pkg) = root
                .get_mut("packages")
                .and_then(|m| m.value.node.as_object_mut())
                .and_then(|pkgs| pkgs.get_mut(name))
                .and_then(|m| m.value.node.as_object_mut())
            else {
                return Ok(());
            };
            for field in ["patch", "patch_glibc"] {
                if let Some(i) = pkg.index_of(field) {
                    pkg.remove(i);
                }
            }
            debug!(name, "removed patch mode");
            Ok(())
        })
    }

    /// Replaces the `env` object. Members are written in key order; they
    /// go on their own lines when the object being replaced spanned more
    /// than one line.
    pub fn set_env(&mut self, env: &BTreeMap<String, String>) -> Result<()> {
        self.edit(|root| {
            let build = |own_line: bool| {
                let mut obj = Object::new();
                for (k, v) in env {
                    let mut m = Member::new(k.as_str(), Node::String(Str::new(v.as_str())));
                    if own_line {
                        m.name.before.push('\n');
                    }
                    obj.members.push(m);
                }
                obj
            };
            match root.get_mut("env") {
                Some(m) => {
                    let own_line = m.value.node.has_newline();
                    m.value.node = Node::Object(build(own_line));
                }
                None => root.push(Member::on_own_line("env", Node::Object(build(false)))),
            }
            debug!(count = env.len(), "set env");
            Ok(())
        })
    }

    /// Sets a top-level string member. An empty value removes it.
    pub fn set_string_field(&mut self, key: &str, value: &str) -> Result<()> {
        self.edit(|root| {
            match (root.index_of(key), value.is_empty()) {
                (Some(i), true) => {
                    root.remove(i);
                }
                (Some(i), false) => {
                    root.members[i].value.node = Node::String(Str::new(value));
                }
                (None, true) => {}
                (None, false) => root.push(Member::on_own_line(key, Node::String(Str::new(value)))),
            }
            debug!(key, "set string field");
            Ok(())
        })
    }

    /// The comment written right before the value at `path`, without the
    /// comment markers. Empty when there is none or the path doesn't exist.
    pub fn before_comment(&self, path: &[PathItem<'_>]) -> String {
        let mut current = &self.root;
        let mut leading = current.before.as_str();
        for item in path {
            match (&current.node, *item) {
                (Node::Object(obj), PathItem::Key(key)) => match obj.get(key) {
                    Some(m) => {
                        leading = m.name.before.as_str();
                        current = &m.value;
                    }
                    None => return String::new(),
                },
                (Node::Object(obj), PathItem::Index(i)) => match obj.members.get(i) {
                    Some(m) => {
                        leading = m.name.before.as_str();
                        current = &m.value;
                    }
                    None => return String::new(),
                },
                (Node::Array(arr), PathItem::Index(i)) => match arr.elements.get(i) {
                    Some(e) => {
                        leading = e.before.as_str();
                        current = e;
                    }
                    None => return String::new(),
                },
                _ => return String::new(),
            }
        }
        comment_text(leading)
    }
}

fn unexpected_packages(node: &Node) -> ConfigError {
    ConfigError::internal(format!(
        "packages field must be an object or array, got {}",
        node.kind_name()
    ))
}

/// Finds the root `packages` member, appending an empty object when it is
/// missing. A `null` value becomes an empty object and, with `migrate`, a
/// legacy list becomes an object.
fn packages_member(root: &mut Object, migrate: bool) -> Result<&mut Member> {
    let i = match root.index_of("packages") {
        Some(i) => i,
        None => {
            root.push(Member::on_own_line("packages", Node::Object(Object::new())));
            root.members.len() - 1
        }
    };

    let member = &mut root.members[i];
    match member.value.node {
        Node::Null => member.value.node = Node::Object(Object::new()),
        Node::Array(_) if migrate => migrate_to_object(&mut member.value)?,
        _ => {}
    }
    Ok(member)
}

/// Turns `["go", "python@3.10"]` into `{"go": "", "python": "3.10"}`.
/// Comments before an element move before its member.
fn migrate_to_object(value: &mut Value) -> Result<()> {
    let Node::Array(arr) = &mut value.node else {
        return Ok(());
    };

    let mut obj = Object::new();
    for elem in &arr.elements {
        let Some(versioned) = elem.node.as_str() else {
            warn!(kind = elem.node.kind_name(), "skipping package list entry that is not a string");
            continue;
        };
        let (name, version) = parse_versioned_name(versioned);
        let mut member = Member::new(name, Node::String(Str::new(version)));
        let comment = elem.before.trim();
        member.name.before = if comment.is_empty() {
            "\n".to_string()
        } else {
            format!("\n{}\n", comment)
        };
        if jwcc::has_comment(&elem.after) {
            member.value.after = elem.after.clone();
        }
        obj.members.push(member);
    }
    obj.after = std::mem::take(&mut arr.after);
    debug!(count = obj.members.len(), "migrated package list to object");
    value.node = Node::Object(obj);
    Ok(())
}

/// The object of package `name`, after migrating the package list and
/// turning a bare version string into `{"version": ...}`.
fn find_pkg_object<'a>(root: &'a mut Object, name: &str) -> Result<Option<&'a mut Object>> {
    let packages = packages_member(root, true)?;
    let pkgs = match &mut packages.value.node {
        Node::Object(obj) => obj,
        other => return Err(unexpected_packages(other)),
    };
    let Some(i) = pkgs.index_of(name) else {
        return Ok(None);
    };
    let node = &mut pkgs.members[i].value.node;
    convert_version_to_object(node);
    Ok(node.as_object_mut())
}

/// Points an existing package entry at `version`. Returns whether that
/// changed anything.
fn set_version(node: &mut Node, version: &str) -> bool {
    match node {
        Node::String(s) if s.as_str() == version => false,
        Node::Object(pkg) => match (pkg.index_of("version"), version.is_empty()) {
            (Some(i), true) => {
                pkg.remove(i);
                true
            }
            (Some(i), false) => {
                let current = &mut pkg.members[i].value.node;
                if current.as_str() == Some(version) {
                    return false;
                }
                *current = Node::String(Str::new(version));
                true
            }
            (None, true) => false,
            (None, false) => {
                pkg.push(Member::on_own_line("version", Node::String(Str::new(version))));
                true
            }
        },
        _ => {
            *node = Node::String(Str::new(version));
            true
        }
    }
}

fn convert_version_to_object(node: &mut Node) {
    if matches!(node, Node::Object(_)) {
        return;
    }
    let mut obj = Object::new();
    if let Some(version) = node.as_str().filter(|v| !v.is_empty()) {
        obj.push(Member::on_own_line("version", Node::String(Str::new(version))));
    }
    *node = Node::Object(obj);
}
