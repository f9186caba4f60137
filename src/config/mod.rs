//! devbox.json: the typed config and the syntax tree it is edited through.
//!
//! A [`ConfigFile`] and its [`PackagesMutator`] share one syntax tree.
//! Every setter updates the typed fields and the tree together, so
//! [`ConfigFile::bytes`] always reflects the in-memory config while
//! keeping the comments and layout of everything that wasn't edited.
//! Neither type is `Send` or `Sync`.

pub mod ast;
pub mod packages;
pub mod parser;
pub mod shellcmd;
pub mod versioned;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

pub use self::ast::{ConfigAst, PathItem};
pub use self::packages::{Package, PackagesMutator};
pub use self::parser::{validate_devbox_version, validate_nixpkg};
pub use self::shellcmd::{CmdFormat, Commands};
pub use self::versioned::{join_name_version, parse_versioned_name};
use crate::core::{ConfigError, Result};

pub const DEFAULT_NAME: &str = "devbox.json";

pub const DEFAULT_INIT_HOOK: &str = "echo 'Welcome to devbox!' > /dev/null";

/// The nixpkgs commit to fall back to when a config doesn't pin one.
pub const DEFAULT_NIXPKGS_COMMIT: &str = "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62";

pub fn is_config_name(name: &str) -> bool {
    name == DEFAULT_NAME
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Commands run at shell startup.
    pub init_hook: Option<Commands>,
    #[serde(deserialize_with = "parser::null_as_default")]
    pub scripts: BTreeMap<String, Commands>,
}

/// Deprecated: versioned packages don't need a pinned nixpkgs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NixpkgsConfig {
    #[serde(deserialize_with = "parser::null_as_default")]
    pub commit: String,
}

/// A named script together with the comment written above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub commands: Commands,
    pub comments: String,
}

/// The top-level string fields that can be set with
/// [`ConfigFile::set_string_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    Name,
    Description,
    EnvFrom,
    DevboxVersion,
}

impl StringField {
    /// The field's key in devbox.json.
    pub fn key(self) -> &'static str {
        match self {
            StringField::Name => "name",
            StringField::Description => "description",
            StringField::EnvFrom => "env_from",
            StringField::DevboxVersion => "devbox_version",
        }
    }
}

/// A devbox environment, as defined by a devbox.json file.
#[derive(Debug)]
pub struct ConfigFile {
    abs_root_path: Option<PathBuf>,

    name: String,
    description: String,
    devbox_version: String,
    packages: PackagesMutator,
    env: BTreeMap<String, String>,
    /// Only "envsec" is supported.
    env_from: String,
    shell: Option<ShellConfig>,
    nixpkgs: Option<NixpkgsConfig>,
    /// References to other configs: local paths, URLs or built-in plugins.
    include: Vec<String>,

    ast: Rc<RefCell<ConfigAst>>,
}

impl ConfigFile {
    /// The file this config was loaded from, if any.
    pub fn abs_root_path(&self) -> Option<&Path> {
        self.abs_root_path.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn devbox_version(&self) -> &str {
        &self.devbox_version
    }

    pub fn env_from(&self) -> &str {
        &self.env_from
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn packages(&self) -> &PackagesMutator {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut PackagesMutator {
        &mut self.packages
    }

    pub fn top_level_packages(&self) -> &[Package] {
        self.packages.collection()
    }

    pub fn get_package(&self, versioned_name: &str) -> Option<&Package> {
        self.packages.get(versioned_name)
    }

    pub fn nixpkgs_commit_hash(&self) -> &str {
        self.nixpkgs.as_ref().map_or("", |n| n.commit.as_str())
    }

    pub fn init_hook(&self) -> Commands {
        self.shell
            .as_ref()
            .and_then(|s| s.init_hook.clone())
            .unwrap_or_default()
    }

    /// The named scripts, each with the comment written right above its
    /// name in the file.
    pub fn scripts(&self) -> BTreeMap<String, Script> {
        let Some(shell) = &self.shell else {
            return BTreeMap::new();
        };
        let ast = self.ast.borrow();
        shell
            .scripts
            .iter()
            .map(|(name, commands)| {
                let path = [PathItem::Key("shell"), PathItem::Key("scripts"), PathItem::Key(name.as_str())];
                let script = Script {
                    commands: commands.clone(),
                    comments: ast.before_comment(&path),
                };
                (name.clone(), script)
            })
            .collect()
    }

    /// Replaces the environment variables.
    pub fn set_env(&mut self, env: BTreeMap<String, String>) -> Result<()> {
        self.ast.borrow_mut().set_env(&env)?;
        self.env = env;
        Ok(())
    }

    /// Sets a top-level string field. An empty value removes it.
    pub fn set_string_field(&mut self, field: StringField, value: &str) -> Result<()> {
        if field == StringField::DevboxVersion {
            parser::devbox_version_req(value)?;
        }
        self.ast.borrow_mut().set_string_field(field.key(), value)?;
        let slot = match field {
            StringField::Name => &mut self.name,
            StringField::Description => &mut self.description,
            StringField::EnvFrom => &mut self.env_from,
            StringField::DevboxVersion => &mut self.devbox_version,
        };
        *slot = value.to_string();
        Ok(())
    }

    /// The document as it would be saved. Tabs are written as two spaces.
    pub fn bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// A SHA-256 of the document without comments or whitespace, so two
    /// configs hash the same exactly when their values are the same.
    pub fn hash(&self) -> String {
        let mut root = self.ast.borrow().root().clone();
        root.minimize();
        let mut hasher = Sha256::new();
        hasher.update(root.pack().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Writes the config to `path`, which is either a directory or a path
    /// whose file name is devbox.json.
    ///
    /// The document is written to a temporary file next to the target and
    /// renamed over it, so a failed save leaves the previous file intact.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let target = if path.file_name().map_or(false, |n| n == DEFAULT_NAME) {
            path.to_path_buf()
        } else {
            path.join(DEFAULT_NAME)
        };
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes())?;
        tmp.as_file().sync_all()?;
        let permissions = match fs::metadata(&target) {
            Ok(meta) => meta.permissions(),
            Err(_) => default_permissions(tmp.as_file())?,
        };
        fs::set_permissions(tmp.path(), permissions)?;
        tmp.persist(&target).map_err(|err| ConfigError::Io(err.error))?;
        debug!(path = %target.display(), "saved config");
        Ok(())
    }

    /// Writes the config back to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        match &self.abs_root_path {
            Some(path) => self.save_to(path),
            None => Err(ConfigError::internal("config was not loaded from a file")),
        }
    }
}

#[cfg(unix)]
fn default_permissions(_file: &fs::File) -> Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(file: &fs::File) -> Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ast.borrow().pack().replace('\t', "  "))
    }
}

/// Configs are equal when their values are, whatever their formatting.
impl PartialEq for ConfigFile {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hash_ignores_formatting() {
        let a = ConfigFile::load_bytes(br#"{"packages": {"go": "1.21"}}"#).unwrap();
        let b = ConfigFile::load_bytes(
            b"// My project\n{\n  \"packages\": {\n    \"go\": \"1.21\", // compiler\n  },\n}\n",
        )
        .unwrap();
        let c = ConfigFile::load_bytes(br#"{"packages": {"go": "1.22"}}"#).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert!(a == b);
        assert!(a != c);
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_hash_ignores_string_escapes() {
        let a = ConfigFile::load_bytes(br#"{"name": "A"}"#).unwrap();
        let b = ConfigFile::load_bytes(br#"{"name": "\u0041"}"#).unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_bytes_replaces_tabs() {
        let mut cfg = ConfigFile::load_bytes(b"{}").unwrap();
        cfg.packages_mut().add("go@latest").unwrap();
        assert_eq!(
            cfg.to_string(),
            "{\n  \"packages\": {\n    \"go\": \"latest\"\n  }\n}"
        );
        assert_eq!(cfg.bytes(), cfg.to_string().into_bytes());
    }

    #[test]
    fn test_set_string_field() {
        let mut cfg = ConfigFile::load_bytes(b"{\n  \"name\": \"demo\"\n}").unwrap();
        cfg.set_string_field(StringField::Description, "A demo").unwrap();
        cfg.set_string_field(StringField::Name, "").unwrap();
        assert_eq!(cfg.name(), "");
        assert_eq!(cfg.description(), "A demo");
        assert_eq!(cfg.to_string(), "{\n  \"description\": \"A demo\"\n}");
    }

    #[test]
    fn test_set_env() {
        let mut cfg = ConfigFile::load_bytes(b"{\n  \"env\": {\n    \"FOO\": \"1\"\n  }\n}").unwrap();
        let env = BTreeMap::from([
            ("PATH_EXTRA".to_string(), "/opt/bin".to_string()),
            ("FOO".to_string(), "2".to_string()),
        ]);
        cfg.set_env(env.clone()).unwrap();
        assert_eq!(cfg.env(), &env);
        assert_eq!(
            cfg.to_string(),
            "{\n  \"env\": {\n    \"FOO\": \"2\",\n    \"PATH_EXTRA\": \"/opt/bin\"\n  }\n}"
        );
    }

    #[test]
    fn test_scripts_with_comments() {
        let cfg = ConfigFile::load_bytes(
            b"{\n  \"shell\": {\n    \"scripts\": {\n      // Starts the server\n      \"serve\": \"go run .\",\n      \"lint\": [\"golangci-lint run\"]\n    }\n  }\n}",
        )
        .unwrap();
        let scripts = cfg.scripts();
        assert_eq!(scripts["serve"].comments, "Starts the server");
        assert_eq!(scripts["serve"].commands.to_string(), "go run .");
        assert_eq!(scripts["lint"].comments, "");
        assert_eq!(scripts["lint"].commands.marshal_as, CmdFormat::Array);
    }

    #[test]
    fn test_save_without_path_is_internal_error() {
        let cfg = ConfigFile::load_bytes(b"{}").unwrap();
        let err = cfg.save().unwrap_err();
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_is_config_name() {
        assert!(is_config_name("devbox.json"));
        assert!(!is_config_name("devbox.lock"));
    }
}
