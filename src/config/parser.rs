//! Loading and validating devbox.json files.

use semver::{Version, VersionReq};
use serde::{Deserialize, Deserializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use super::ast::ConfigAst;
use super::packages::{PackageList, PackagesMutator};
use super::{ConfigFile, NixpkgsConfig, ShellConfig, DEFAULT_INIT_HOOK};
use crate::core::{ConfigError, Result};

/// The typed fields of a devbox.json file, decoded from its strict JSON
/// form. `null` reads as the field's empty value.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFields {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "null_as_default")]
    devbox_version: String,
    packages: PackageList,
    #[serde(deserialize_with = "null_as_default")]
    env: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    env_from: String,
    shell: Option<ShellConfig>,
    nixpkgs: Option<NixpkgsConfig>,
    #[serde(deserialize_with = "null_as_default")]
    include: Vec<String>,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ConfigFile {
    /// Reads and validates the devbox.json at `path`. [`ConfigFile::save`]
    /// writes back to the same file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read(path)?;
        let mut cfg = Self::load_bytes(&source)?;
        cfg.abs_root_path = Some(fs::canonicalize(path)?);
        debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Parses and validates a devbox.json document.
    ///
    /// The typed fields are decoded from the document's strict JSON form,
    /// while the syntax tree keeps the source text so that comments and
    /// formatting survive a later save.
    pub fn load_bytes(source: &[u8]) -> Result<Self> {
        let ast = ConfigAst::parse(source)?;
        let fields: ConfigFields = serde_json::from_str(&ast.root().standardize())?;
        let ast = Rc::new(RefCell::new(ast));

        let cfg = ConfigFile {
            abs_root_path: None,
            name: fields.name,
            description: fields.description,
            devbox_version: fields.devbox_version,
            packages: PackagesMutator::new(fields.packages.0, Rc::clone(&ast)),
            env: fields.env,
            env_from: fields.env_from,
            shell: fields.shell,
            nixpkgs: fields.nixpkgs,
            include: fields.include,
            ast,
        };
        validate(&cfg)?;
        Ok(cfg)
    }

    /// The config written by `devbox init`.
    pub fn default_config() -> Result<Self> {
        Self::load_bytes(default_source().as_bytes())
    }
}

fn default_source() -> String {
    let init_hook = serde_json::Value::from(DEFAULT_INIT_HOOK);
    format!(
        r#"{{
  "$schema": "https://raw.githubusercontent.com/jetify-com/devbox/main/.schema/devbox.schema.json",
  "packages": [],
  "shell": {{
    "init_hook": [
      {init_hook}
    ],
    "scripts": {{
      "test": [
        "echo \"Error: no test specified\" && exit 1"
      ]
    }}
  }}
}}
"#
    )
}

fn validate(cfg: &ConfigFile) -> Result<()> {
    validate_nixpkg(cfg)?;
    validate_scripts(cfg)?;
    devbox_version_req(cfg.devbox_version())?;
    Ok(())
}

/// Checks the running devbox version against the project's
/// `devbox_version` requirement, such as `~0.10.0` or `>=0.9, <1.0`.
/// A missing or empty requirement accepts any version.
pub fn validate_devbox_version(cfg: &ConfigFile, current: &str) -> Result<()> {
    let Some(req) = devbox_version_req(cfg.devbox_version())? else {
        return Ok(());
    };
    let running = Version::parse(current.trim())
        .map_err(|_| ConfigError::user(format!("Invalid current devbox version: {}", current)))?;
    if !req.matches(&running) {
        return Err(ConfigError::user(format!(
            "Devbox version mismatch: project requires version {} but your running version is {}",
            cfg.devbox_version(),
            current
        )));
    }
    Ok(())
}

pub(crate) fn devbox_version_req(constraint: &str) -> Result<Option<VersionReq>> {
    let constraint = constraint.trim();
    if constraint.is_empty() {
        return Ok(None);
    }
    VersionReq::parse(constraint).map(Some).map_err(|_| {
        ConfigError::user(format!(
            "Invalid devbox_version constraint in config: {}",
            constraint
        ))
    })
}

/// A pinned nixpkgs commit must be a full 40 character hash.
pub fn validate_nixpkg(cfg: &ConfigFile) -> Result<()> {
    const COMMIT_LENGTH: usize = 40;

    let hash = cfg.nixpkgs_commit_hash();
    if hash.is_empty() || hash.len() == COMMIT_LENGTH {
        return Ok(());
    }
    Err(ConfigError::user(format!(
        "Expected nixpkgs.commit to be of length {} but it has length {}",
        COMMIT_LENGTH,
        hash.len()
    )))
}

fn validate_scripts(cfg: &ConfigFile) -> Result<()> {
    let Some(shell) = &cfg.shell else {
        return Ok(());
    };
    for (name, body) in &shell.scripts {
        if name.trim().is_empty() {
            return Err(ConfigError::user("cannot have script with empty name in devbox.json"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ConfigError::user(format!(
                "cannot have script name with whitespace in devbox.json: {}",
                name
            )));
        }
        if body.to_string().trim().is_empty() {
            return Err(ConfigError::user(format!(
                "cannot have an empty script body in devbox.json: {}",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config_loads() {
        let cfg = ConfigFile::default_config().unwrap();
        assert!(cfg.packages().collection().is_empty());
        assert_eq!(cfg.init_hook().cmds, [DEFAULT_INIT_HOOK]);
        assert!(cfg.scripts().contains_key("test"));
    }

    #[test_case(r#"{"nixpkgs": {"commit": "abc"}}"#, false; "short commit")]
    #[test_case(r#"{"nixpkgs": {"commit": "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62"}}"#, true; "full commit")]
    #[test_case(r#"{"nixpkgs": {}}"#, true; "no commit")]
    fn test_validate_nixpkg(src: &str, ok: bool) {
        let result = ConfigFile::load_bytes(src.as_bytes());
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert!(err.is_user_error());
            assert_eq!(
                err.to_string(),
                "Expected nixpkgs.commit to be of length 40 but it has length 3"
            );
        }
    }

    #[test_case("", "0.10.0"; "no constraint")]
    #[test_case("~0.10.0", "0.10.3"; "tilde")]
    #[test_case(">=0.9, <1.0", "0.10.0"; "range")]
    #[test_case("0.10.0", "0.10.0"; "bare version")]
    fn test_devbox_version_met(constraint: &str, current: &str) {
        let src = serde_json::json!({ "devbox_version": constraint }).to_string();
        let cfg = ConfigFile::load_bytes(src.as_bytes()).unwrap();
        validate_devbox_version(&cfg, current).unwrap();
    }

    #[test_case("~0.10.0", "0.11.0")]
    #[test_case("^1.2", "0.14.0")]
    #[test_case(">=0.9, <1.0", "1.0.0")]
    fn test_devbox_version_unmet(constraint: &str, current: &str) {
        let src = serde_json::json!({ "devbox_version": constraint }).to_string();
        let cfg = ConfigFile::load_bytes(src.as_bytes()).unwrap();
        let err = validate_devbox_version(&cfg, current).unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(
            err.to_string(),
            format!(
                "Devbox version mismatch: project requires version {} but your running version is {}",
                constraint, current
            )
        );
    }

    #[test]
    fn test_invalid_devbox_version_constraint() {
        let err = ConfigFile::load_bytes(br#"{"devbox_version": "not a version"}"#).unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(
            err.to_string(),
            "Invalid devbox_version constraint in config: not a version"
        );
    }

    #[test]
    fn test_set_invalid_devbox_version_is_rejected() {
        let mut cfg = ConfigFile::load_bytes(br#"{"devbox_version": "~0.10.0"}"#).unwrap();
        let err = cfg
            .set_string_field(crate::config::StringField::DevboxVersion, ">=banana")
            .unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(cfg.devbox_version(), "~0.10.0");
        assert_eq!(cfg.to_string(), r#"{"devbox_version": "~0.10.0"}"#);
    }

    #[test]
    fn test_invalid_current_devbox_version() {
        let cfg = ConfigFile::load_bytes(br#"{"devbox_version": "~0.10.0"}"#).unwrap();
        let err = validate_devbox_version(&cfg, "dev").unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "Invalid current devbox version: dev");
    }

    #[test]
    fn test_nulls_read_as_empty() {
        let cfg = ConfigFile::load_bytes(
            br#"{"name": null, "env": null, "include": null, "shell": {"scripts": null}, "packages": null}"#,
        )
        .unwrap();
        assert_eq!(cfg.name(), "");
        assert!(cfg.env().is_empty());
        assert!(cfg.scripts().is_empty());
    }

    #[test]
    fn test_wrong_field_type_is_decode_error() {
        let err = ConfigFile::load_bytes(br#"{"packages": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)), "{:?}", err);
    }
}
