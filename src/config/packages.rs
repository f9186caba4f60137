//! The typed package list, kept in step with the syntax tree.
//!
//! A package list is written either as the legacy array of `name@version`
//! strings or as an object of `name: entry`, where an entry is a version
//! string or a package object. Decoding keeps the document order.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use tracing::debug;

use super::ast::ConfigAst;
use super::versioned::{join_name_version, parse_versioned_name};
use crate::core::{current_system, ensure_valid_platform, ConfigError, PatchMode, Result};
use crate::ux;

/// One package of a devbox.json file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Package {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_plugin: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_platforms: Vec<String>,

    /// Deprecated in favor of `patch`. When set and `patch` is missing, the
    /// package decodes with [`PatchMode::Always`].
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub patch_glibc: bool,
    pub patch: PatchMode,

    /// Outputs to install. Empty means the default output.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Packages that may be marked insecure upstream but are allowed anyway.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow_insecure: Vec<String>,
}

impl Package {
    pub fn version_only(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn versioned_name(&self) -> String {
        join_name_version(&self.name, &self.version)
    }

    /// With `platforms` set, a package is enabled only on those systems.
    /// Otherwise it is enabled everywhere except its `excluded_platforms`.
    pub fn is_enabled_on_platform(&self, system: &str) -> bool {
        if !self.platforms.is_empty() {
            return self.platforms.iter().any(|p| p == system);
        }
        !self.excluded_platforms.iter().any(|p| p == system)
    }

    pub fn is_enabled_on_current_platform(&self) -> bool {
        self.is_enabled_on_platform(&current_system())
    }
}

/// The two shapes of a package entry, tried in order.
enum PackageEntry {
    Version(String),
    Fields(PackageFields),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PackageFields {
    version: String,
    disable_plugin: bool,
    platforms: Vec<String>,
    excluded_platforms: Vec<String>,
    patch_glibc: bool,
    patch: Option<String>,
    outputs: Vec<String>,
    allow_insecure: Vec<String>,
}

impl PackageEntry {
    fn into_package(self) -> Result<Package> {
        let fields = match self {
            PackageEntry::Version(version) => PackageFields {
                version,
                ..Default::default()
            },
            PackageEntry::Fields(fields) => fields,
        };
        let patch = match fields.patch.as_deref() {
            None | Some("") if fields.patch_glibc => PatchMode::Always,
            None | Some("") => PatchMode::Auto,
            Some(mode) => mode.parse()?,
        };
        Ok(Package {
            name: String::new(),
            version: fields.version,
            disable_plugin: fields.disable_plugin,
            platforms: fields.platforms,
            excluded_platforms: fields.excluded_platforms,
            patch_glibc: fields.patch_glibc,
            patch,
            outputs: fields.outputs,
            allow_insecure: fields.allow_insecure,
        })
    }
}

impl<'de> Deserialize<'de> for Package {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PackageVisitor;

        impl<'de> Visitor<'de> for PackageVisitor {
            type Value = PackageEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string or a package object")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<PackageEntry, E> {
                Ok(PackageEntry::Version(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<PackageEntry, E> {
                Ok(PackageEntry::Version(String::new()))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<PackageEntry, A::Error> {
                PackageFields::deserialize(de::value::MapAccessDeserializer::new(map)).map(PackageEntry::Fields)
            }
        }

        deserializer
            .deserialize_any(PackageVisitor)?
            .into_package()
            .map_err(de::Error::custom)
    }
}

/// The decoded package list, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PackageList(pub(crate) Vec<Package>);

impl<'de> Deserialize<'de> for PackageList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PackageListVisitor;

        impl<'de> Visitor<'de> for PackageListVisitor {
            type Value = PackageList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of package names or an object of packages")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<PackageList, A::Error> {
                let mut list = Vec::new();
                while let Some(versioned) = seq.next_element::<String>()? {
                    let (name, version) = parse_versioned_name(&versioned);
                    list.push(Package::version_only(name, version));
                }
                Ok(PackageList(list))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<PackageList, A::Error> {
                let mut list = Vec::new();
                while let Some((name, mut pkg)) = map.next_entry::<String, Package>()? {
                    pkg.name = name;
                    list.push(pkg);
                }
                Ok(PackageList(list))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<PackageList, E> {
                Ok(PackageList::default())
            }
        }

        deserializer.deserialize_any(PackageListVisitor)
    }
}

/// The packages of a config file.
///
/// Shares its syntax tree with the owning [`super::ConfigFile`]: every
/// change made here is written to the tree as well, so saving the file
/// saves it. Because of the shared `Rc<RefCell<_>>`, neither type can be
/// sent to or shared with another thread.
#[derive(Debug)]
pub struct PackagesMutator {
    collection: Vec<Package>,
    ast: Rc<RefCell<ConfigAst>>,
}

impl PackagesMutator {
    pub(crate) fn new(collection: Vec<Package>, ast: Rc<RefCell<ConfigAst>>) -> Self {
        Self { collection, ast }
    }

    pub fn collection(&self) -> &[Package] {
        &self.collection
    }

    pub fn get(&self, versioned_name: &str) -> Option<&Package> {
        let (name, version) = parse_versioned_name(versioned_name);
        self.index(name, version).map(|i| &self.collection[i])
    }

    pub fn versioned_names(&self) -> Vec<String> {
        self.collection.iter().map(Package::versioned_name).collect()
    }

    /// Adds a package unless one with the same name and version exists.
    ///
    /// The legacy list may hold several versions of a package. In the object
    /// form a name appears once, so adding another version of a listed
    /// package switches it to that version.
    pub fn add(&mut self, versioned_name: &str) -> Result<()> {
        let (name, version) = parse_versioned_name(versioned_name);
        if self.index(name, version).is_some() {
            return Ok(());
        }
        let added = self.ast.borrow_mut().append_package(name, version)?;
        match self.collection.iter().position(|p| p.name == name) {
            Some(i) if !added => self.collection[i].version = version.to_string(),
            _ => self.collection.push(Package::version_only(name, version)),
        }
        debug!(package = versioned_name, added, "added package");
        Ok(())
    }

    pub fn remove(&mut self, versioned_name: &str) -> Result<()> {
        let (name, version) = parse_versioned_name(versioned_name);
        let Some(i) = self.index(name, version) else {
            return Ok(());
        };
        self.ast.borrow_mut().remove_package(name, version)?;
        self.collection.remove(i);
        debug!(package = versioned_name, "removed package");
        Ok(())
    }

    /// Restricts a package to the given platforms, in addition to those it
    /// is already restricted to.
    pub fn add_platforms(&mut self, writer: &mut dyn Write, versioned_name: &str, platforms: &[String]) -> Result<()> {
        if platforms.is_empty() {
            return Ok(());
        }
        ensure_valid_platform(platforms)?;
        let i = self.find(versioned_name)?;

        let pkg = &self.collection[i];
        if !pkg.excluded_platforms.is_empty() {
            return Err(ConfigError::user(format!(
                "cannot add any platform for package {} because it already has `excluded_platforms` defined. \
                 Please delete the `excluded_platforms` for this package from devbox.json and retry.",
                pkg.versioned_name()
            )));
        }

        let added = missing(&pkg.platforms, platforms);
        if added.is_empty() {
            return Ok(());
        }
        self.ast.borrow_mut().append_platforms(&pkg.name, &added)?;
        let pkg = &mut self.collection[i];
        pkg.platforms.extend(added);
        ux::info(
            writer,
            format_args!("Added platform {} to package {}\n", platforms.join(", "), pkg.versioned_name()),
        );
        Ok(())
    }

    /// Keeps a package off the given platforms, in addition to those it is
    /// already excluded from.
    pub fn exclude_platforms(&mut self, writer: &mut dyn Write, versioned_name: &str, platforms: &[String]) -> Result<()> {
        if platforms.is_empty() {
            return Ok(());
        }
        ensure_valid_platform(platforms)?;
        let i = self.find(versioned_name)?;

        let pkg = &self.collection[i];
        if !pkg.platforms.is_empty() {
            return Err(ConfigError::user(format!(
                "cannot exclude any platform for package {} because it already has `platforms` defined. \
                 Please delete the `platforms` for this package from devbox.json and re-try.",
                pkg.versioned_name()
            )));
        }

        let added = missing(&pkg.excluded_platforms, platforms);
        if added.is_empty() {
            return Ok(());
        }
        self.ast.borrow_mut().append_excluded_platforms(&pkg.name, &added)?;
        let pkg = &mut self.collection[i];
        pkg.excluded_platforms.extend(added);
        ux::info(
            writer,
            format_args!("Excluded platform {} for package {}\n", platforms.join(", "), pkg.versioned_name()),
        );
        Ok(())
    }

    pub fn set_outputs(&mut self, writer: &mut dyn Write, versioned_name: &str, outputs: &[String]) -> Result<()> {
        let i = self.find(versioned_name)?;
        let added = missing(&self.collection[i].outputs, outputs);
        if added.is_empty() {
            return Ok(());
        }
        self.ast.borrow_mut().append_outputs(&self.collection[i].name, &added)?;
        ux::info(
            writer,
            format_args!("Added outputs {} to package {}\n", added.join(", "), versioned_name),
        );
        self.collection[i].outputs.extend(added);
        Ok(())
    }

    pub fn set_allow_insecure(&mut self, writer: &mut dyn Write, versioned_name: &str, whitelist: &[String]) -> Result<()> {
        let i = self.find(versioned_name)?;
        let added = missing(&self.collection[i].allow_insecure, whitelist);
        if added.is_empty() {
            return Ok(());
        }
        self.ast.borrow_mut().append_allow_insecure(&self.collection[i].name, &added)?;
        ux::info(
            writer,
            format_args!("Allowed insecure {} for package {}\n", added.join(", "), versioned_name),
        );
        self.collection[i].allow_insecure.extend(added);
        Ok(())
    }

    /// Sets when to patch a package. [`PatchMode::Auto`] is the default, so
    /// it is written by removing the field.
    pub fn set_patch(&mut self, versioned_name: &str, mode: PatchMode) -> Result<()> {
        let i = self.find(versioned_name)?;
        let name = &self.collection[i].name;
        match mode {
            PatchMode::Auto => self.ast.borrow_mut().remove_patch(name)?,
            _ => self.ast.borrow_mut().set_patch(name, mode)?,
        }
        let pkg = &mut self.collection[i];
        pkg.patch_glibc = false;
        pkg.patch = mode;
        Ok(())
    }

    /// The deprecated boolean form of [`PackagesMutator::set_patch`]: `true`
    /// means [`PatchMode::Always`] and `false` means [`PatchMode::Auto`].
    pub fn set_patch_glibc(&mut self, versioned_name: &str, patch: bool) -> Result<()> {
        let i = self.find(versioned_name)?;
        let mode = if patch { PatchMode::Always } else { PatchMode::Auto };
        if self.collection[i].patch == mode && !self.collection[i].patch_glibc {
            return Ok(());
        }
        self.set_patch(versioned_name, mode)
    }

    pub fn set_disable_plugin(&mut self, versioned_name: &str, disable: bool) -> Result<()> {
        let i = self.find(versioned_name)?;
        if self.collection[i].disable_plugin == disable {
            return Ok(());
        }
        self.ast
            .borrow_mut()
            .set_package_bool(&self.collection[i].name, "disable_plugin", disable)?;
        self.collection[i].disable_plugin = disable;
        Ok(())
    }

    fn index(&self, name: &str, version: &str) -> Option<usize> {
        self.collection
            .iter()
            .position(|p| p.name == name && p.version == version)
    }

    fn find(&self, versioned_name: &str) -> Result<usize> {
        let (name, version) = parse_versioned_name(versioned_name);
        self.index(name, version)
            .ok_or_else(|| ConfigError::PackageNotFound(versioned_name.to_string()))
    }
}

/// The values of `wanted` not in `present`, without duplicates, in order.
fn missing(present: &[String], wanted: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for w in wanted {
        if !present.contains(w) && !out.contains(w) {
            out.push(w.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn mutator(src: &str) -> PackagesMutator {
        let ast = ConfigAst::parse(src.as_bytes()).unwrap();
        let json = ast.root().standardize();
        #[derive(Deserialize)]
        struct Doc {
            #[serde(default)]
            packages: PackageList,
        }
        let doc: Doc = serde_json::from_str(&json).unwrap();
        PackagesMutator::new(doc.packages.0, Rc::new(RefCell::new(ast)))
    }

    fn text(pkgs: &PackagesMutator) -> String {
        pkgs.ast.borrow().pack().replace('\t', "  ")
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test_case(r#"{"packages": ["python@3.10", "hello"]}"#, &["python@3.10", "hello"]; "legacy list")]
    #[test_case(r#"{"packages": {"zsh": "", "go": "1.21", "jq": {"version": "1.7"}}}"#, &["zsh", "go@1.21", "jq@1.7"]; "object keeps order")]
    #[test_case(r#"{"packages": {"github:org/repo/ref": {}}}"#, &["github:org/repo/ref"]; "flake reference")]
    #[test_case(r#"{"packages": null}"#, &[]; "null")]
    #[test_case(r#"{}"#, &[]; "missing")]
    fn test_decode_shapes(src: &str, want: &[&str]) {
        assert_eq!(mutator(src).versioned_names(), want);
    }

    #[test]
    fn test_decode_patch_defaults() {
        let pkgs = mutator(
            r#"{"packages": {
                "a": "1",
                "b": {"patch_glibc": true},
                "c": {"patch_glibc": true, "patch": "never"},
                "d": {"patch": ""}
            }}"#,
        );
        let modes: Vec<PatchMode> = pkgs.collection().iter().map(|p| p.patch).collect();
        assert_eq!(
            modes,
            [PatchMode::Auto, PatchMode::Always, PatchMode::Never, PatchMode::Auto]
        );
    }

    #[test]
    fn test_decode_invalid_patch_mode() {
        let err = serde_json::from_str::<PackageList>(r#"{"go": {"patch": "sometimes"}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid patch mode"), "{}", err);
    }

    #[test]
    fn test_is_enabled_on_platform() {
        let mut pkg = Package::version_only("go", "");
        assert!(pkg.is_enabled_on_platform("x86_64-linux"));

        pkg.excluded_platforms = strings(&["x86_64-linux"]);
        assert!(!pkg.is_enabled_on_platform("x86_64-linux"));
        assert!(pkg.is_enabled_on_platform("aarch64-darwin"));

        pkg.excluded_platforms.clear();
        pkg.platforms = strings(&["aarch64-darwin"]);
        assert!(!pkg.is_enabled_on_platform("x86_64-linux"));
        assert!(pkg.is_enabled_on_platform("aarch64-darwin"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut pkgs = mutator("{\n  \"packages\": []\n}");
        pkgs.add("go@1.21").unwrap();
        let once = text(&pkgs);
        pkgs.add("go@1.21").unwrap();
        assert_eq!(text(&pkgs), once);
        assert_eq!(once, "{\n  \"packages\": [\"go@1.21\"]\n}");
        assert_eq!(pkgs.versioned_names(), ["go@1.21"]);
    }

    #[test_case(r#"{"packages": {"go": "1.21"}}"#, &["go@1.22"], "{\n  \"packages\": {\"go\": \"1.22\"}\n}"; "object switches version")]
    #[test_case(r#"{"packages": {"go": {"version": "1.21", "disable_plugin": true}}}"#, &["go@1.22"], "{\n  \"packages\": {\"go\": {\"version\": \"1.22\", \"disable_plugin\": true}}\n}"; "object entry switches version")]
    #[test_case(r#"{"packages": ["go@1.21"]}"#, &["go@1.21", "go@1.22"], "{\n  \"packages\": [\n    \"go@1.21\",\n    \"go@1.22\"\n  ]\n}"; "list keeps both")]
    fn test_add_other_version(src: &str, want: &[&str], want_text: &str) {
        let mut pkgs = mutator(src);
        pkgs.add("go@1.22").unwrap();
        assert_eq!(pkgs.versioned_names(), want);
        assert_eq!(text(&pkgs), want_text);

        let reloaded = mutator(&pkgs.ast.borrow().pack());
        assert_eq!(reloaded.collection(), pkgs.collection());
    }

    #[test]
    fn test_remove_needs_exact_version() {
        let mut pkgs = mutator(r#"{"packages": {"go": "1.21"}}"#);
        pkgs.remove("go@1.20").unwrap();
        assert_eq!(pkgs.versioned_names(), ["go@1.21"]);
        assert_eq!(text(&pkgs), r#"{"packages": {"go": "1.21"}}"#);

        pkgs.remove("go@1.21").unwrap();
        assert!(pkgs.collection().is_empty());
    }

    #[test]
    fn test_add_platforms_legacy_migration() {
        let mut pkgs = mutator(r#"{"packages": ["go", "python@3.10"]}"#);
        let mut out = Vec::new();
        pkgs.add_platforms(&mut out, "python@3.10", &strings(&["x86_64-darwin"]))
            .unwrap();

        assert_eq!(
            text(&pkgs),
            "{\"packages\": {\n  \"go\": \"\",\n  \"python\": {\n    \"version\": \"3.10\",\n    \"platforms\": [\"x86_64-darwin\"]\n  }\n}}"
        );
        assert_eq!(pkgs.get("python@3.10").unwrap().platforms, ["x86_64-darwin"]);
        let message = String::from_utf8(out).unwrap();
        assert!(message.contains("Added platform x86_64-darwin to package python@3.10"), "{}", message);
    }

    #[test]
    fn test_add_platforms_skips_present() {
        let src = "{\"packages\": {\"go\": {\"platforms\": [\"x86_64-linux\"]}}}";
        let mut pkgs = mutator(src);
        let mut out = Vec::new();
        pkgs.add_platforms(&mut out, "go", &strings(&["x86_64-linux"])).unwrap();
        assert_eq!(text(&pkgs), src);
        assert!(out.is_empty());
    }

    #[test]
    fn test_platform_lists_are_exclusive() {
        let src = "{\"packages\": {\"go\": {\"excluded_platforms\": [\"x86_64-linux\"]}, \"jq\": {\"platforms\": [\"x86_64-linux\"]}}}";
        let mut pkgs = mutator(src);
        let mut out = Vec::new();

        let err = pkgs
            .add_platforms(&mut out, "go", &strings(&["aarch64-darwin"]))
            .unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("already has `excluded_platforms` defined"));

        let err = pkgs
            .exclude_platforms(&mut out, "jq", &strings(&["aarch64-darwin"]))
            .unwrap_err();
        assert!(err.to_string().contains("already has `platforms` defined"));

        assert_eq!(text(&pkgs), src);
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_platform_and_missing_package() {
        let mut pkgs = mutator(r#"{"packages": {"go": ""}}"#);
        let mut out = Vec::new();
        let err = pkgs.add_platforms(&mut out, "go", &strings(&["windows"])).unwrap_err();
        assert!(err.to_string().starts_with("Unsupported platform: windows"));

        let err = pkgs
            .exclude_platforms(&mut out, "ripgrep", &strings(&["x86_64-linux"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "package ripgrep not found");
    }

    #[test]
    fn test_set_outputs_appends_new_only() {
        let mut pkgs = mutator("{\"packages\": {\"prometheus\": {\"outputs\": [\"out\"]}}}");
        let mut out = Vec::new();
        pkgs.set_outputs(&mut out, "prometheus", &strings(&["out", "cli", "cli"]))
            .unwrap();
        assert_eq!(pkgs.get("prometheus").unwrap().outputs, ["out", "cli"]);
        assert_eq!(
            text(&pkgs),
            "{\"packages\": {\"prometheus\": {\"outputs\": [\"out\", \"cli\"]}}}"
        );
        assert!(String::from_utf8(out).unwrap().contains("Added outputs cli to package prometheus"));
    }

    #[test]
    fn test_set_allow_insecure() {
        let mut pkgs = mutator(r#"{"packages": {"python": "2.7"}}"#);
        let mut out = Vec::new();
        pkgs.set_allow_insecure(&mut out, "python@2.7", &strings(&["python-2.7.18.7"]))
            .unwrap();
        assert_eq!(pkgs.get("python@2.7").unwrap().allow_insecure, ["python-2.7.18.7"]);
        assert_eq!(
            text(&pkgs),
            "{\"packages\": {\"python\": {\n  \"version\": \"2.7\",\n  \"allow_insecure\": [\"python-2.7.18.7\"]\n}}}"
        );
    }

    #[test]
    fn test_set_disable_plugin_skips_unchanged() {
        let src = r#"{"packages": {"php": ""}}"#;
        let mut pkgs = mutator(src);
        pkgs.set_disable_plugin("php", false).unwrap();
        assert_eq!(text(&pkgs), src);

        pkgs.set_disable_plugin("php", true).unwrap();
        assert!(pkgs.get("php").unwrap().disable_plugin);
        assert!(text(&pkgs).contains("\"disable_plugin\": true"));
    }

    #[test]
    fn test_set_patch_modes() {
        let mut pkgs = mutator(r#"{"packages": {"go": {"version": "1.21", "patch_glibc": true}}}"#);
        assert_eq!(pkgs.get("go@1.21").unwrap().patch, PatchMode::Always);

        pkgs.set_patch("go@1.21", PatchMode::Never).unwrap();
        assert_eq!(
            text(&pkgs),
            r#"{"packages": {"go": {"version": "1.21", "patch": "never"}}}"#
        );

        pkgs.set_patch("go@1.21", PatchMode::Auto).unwrap();
        assert_eq!(
            text(&pkgs),
            r#"{"packages": {"go": {"version": "1.21"}}}"#
        );
        let go = pkgs.get("go@1.21").unwrap();
        assert_eq!((go.patch, go.patch_glibc), (PatchMode::Auto, false));
    }

    #[test]
    fn test_set_patch_glibc() {
        let mut pkgs = mutator(r#"{"packages": {"go": "1.21"}}"#);
        pkgs.set_patch_glibc("go@1.21", false).unwrap();
        assert_eq!(text(&pkgs), r#"{"packages": {"go": "1.21"}}"#);

        pkgs.set_patch_glibc("go@1.21", true).unwrap();
        assert_eq!(pkgs.get("go@1.21").unwrap().patch, PatchMode::Always);
        assert!(text(&pkgs).contains("\"patch\": \"always\""));
    }

    #[test]
    fn test_missing() {
        assert_eq!(
            missing(&strings(&["a"]), &strings(&["a", "b", "b", "c"])),
            ["b", "c"]
        );
    }
}
