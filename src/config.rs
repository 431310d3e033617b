//! Configuration profiles
//!
//! Credentials live in `config.yaml` under the config directory
//! (`$ASA_CONFIG_DIR`, else `~/.asa-cli`). Top-level keys describe the
//! default profile; named profiles sit under `profiles.<name>`:
//!
//! ```yaml
//! client_id: SEARCHADS.aaaa
//! team_id: SEARCHADS.aaaa
//! key_id: bbbb
//! private_key_path: /home/me/.asa-cli/private-key.pem
//! profiles:
//!   agency:
//!     client_id: SEARCHADS.cccc
//!     team_id: SEARCHADS.cccc
//!     key_id: dddd
//!     org_id: "1234567"
//!     private_key_path: /home/me/keys/agency.pem
//! ```
//!
//! `ASA_CLIENT_ID`, `ASA_TEAM_ID`, `ASA_KEY_ID`, `ASA_ORG_ID` and
//! `ASA_PRIVATE_KEY_PATH` override whatever the file says.

use crate::search_ads::token_storage::TOKEN_CACHE_FILE;
use crate::search_ads::types::{AsaError, Credentials};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "ASA_CONFIG_DIR";

pub const CONFIG_FILE: &str = "config.yaml";

pub const DEFAULT_PROFILE: &str = "default";

const DEFAULT_DIR_NAME: &str = ".asa-cli";

/// Credential settings of one profile as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileSettings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_id: String,
    /// Accepts `org_id: 123` as well as `org_id: "123"`
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "string_or_number"
    )]
    pub org_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key_path: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

impl ProfileSettings {
    /// Apply `ASA_*` overrides; `lookup` returns the value of a variable
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 5] = [
            ("ASA_CLIENT_ID", &mut self.client_id),
            ("ASA_TEAM_ID", &mut self.team_id),
            ("ASA_KEY_ID", &mut self.key_id),
            ("ASA_ORG_ID", &mut self.org_id),
            ("ASA_PRIVATE_KEY_PATH", &mut self.private_key_path),
        ];
        for (name, field) in fields {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                tracing::debug!("Using {} from environment", name);
                *field = value;
            }
        }
    }
}

/// Whole `config.yaml` document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub default: ProfileSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ProfileSettings>,
}

impl ConfigFile {
    /// Read the file at `path`; a missing file is an empty config
    pub async fn read(path: &Path) -> Result<Self, AsaError> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AsaError::Config(format!(
                    "error reading config {:?}: {}",
                    path, e
                )))
            }
        };

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&data)
            .map_err(|e| AsaError::Config(format!("error parsing config {:?}: {}", path, e)))
    }

    /// Settings for `profile` (`None` or `"default"` means the top level)
    pub fn profile(&self, profile: &str) -> Result<&ProfileSettings, AsaError> {
        if is_default_profile(profile) {
            return Ok(&self.default);
        }
        self.profiles
            .get(profile)
            .ok_or_else(|| AsaError::Config(format!("profile {:?} not found in config", profile)))
    }

    /// Replace the settings of `profile`
    pub fn set_profile(&mut self, profile: &str, settings: ProfileSettings) {
        if is_default_profile(profile) {
            self.default = settings;
        } else {
            self.profiles.insert(profile.to_string(), settings);
        }
    }
}

fn is_default_profile(profile: &str) -> bool {
    profile.is_empty() || profile == DEFAULT_PROFILE
}

/// Resolved configuration of the active profile
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub profile: String,
    pub dir: PathBuf,
    pub settings: ProfileSettings,
}

impl Config {
    /// Load `profile` from the standard location, applying env overrides
    pub async fn load(profile: Option<&str>) -> Result<Self, AsaError> {
        let dir = config_dir()?;
        Self::load_from(&dir, profile, |name| std::env::var(name).ok()).await
    }

    /// Load `profile` from `dir` with an explicit environment lookup
    pub async fn load_from<F>(dir: &Path, profile: Option<&str>, env: F) -> Result<Self, AsaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = profile
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROFILE)
            .to_string();

        let file = ConfigFile::read(&dir.join(CONFIG_FILE)).await?;
        let mut settings = file.profile(&profile)?.clone();
        settings.apply_env(env);

        tracing::debug!("Loaded configuration profile {:?} from {:?}", profile, dir);

        Ok(Self {
            profile,
            dir: dir.to_path_buf(),
            settings,
        })
    }

    /// Credentials for the token provider
    pub fn credentials(&self) -> Credentials {
        let org_id = Some(self.settings.org_id.trim().to_string()).filter(|id| !id.is_empty());
        Credentials {
            client_id: self.settings.client_id.trim().to_string(),
            team_id: self.settings.team_id.trim().to_string(),
            key_id: self.settings.key_id.trim().to_string(),
            private_key_path: expand_path(self.settings.private_key_path.trim()),
            org_id,
        }
    }

    /// Per-profile token cache file
    pub fn token_cache_path(&self) -> PathBuf {
        token_cache_path(&self.dir, &self.profile)
    }
}

/// `<dir>/profiles/<profile>/token_cache.json`
pub fn token_cache_path(dir: &Path, profile: &str) -> PathBuf {
    let profile = if profile.is_empty() {
        DEFAULT_PROFILE
    } else {
        profile
    };
    dir.join("profiles").join(profile).join(TOKEN_CACHE_FILE)
}

/// Configuration directory (`$ASA_CONFIG_DIR`, else `~/.asa-cli`)
pub fn config_dir() -> Result<PathBuf, AsaError> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| AsaError::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(DEFAULT_DIR_NAME))
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Write `settings` as `profile` into `<dir>/config.yaml`
///
/// Other profiles in the file are preserved. The directory is created with
/// 0700 and the file written with 0600 permissions on Unix. A file that
/// exists but cannot be parsed is left untouched and reported.
pub async fn save_profile(
    dir: &Path,
    profile: &str,
    mut settings: ProfileSettings,
) -> Result<PathBuf, AsaError> {
    let path = dir.join(CONFIG_FILE);
    let mut file = ConfigFile::read(&path).await?;

    settings.private_key_path = expand_path(&settings.private_key_path)
        .to_string_lossy()
        .into_owned();
    file.set_profile(profile, settings);

    let yaml = serde_yaml::to_string(&file)
        .map_err(|e| AsaError::Storage(format!("serializing config: {}", e)))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AsaError::Storage(format!("cannot create config directory: {}", e)))?;
    set_permissions(dir, 0o700).await?;

    tokio::fs::write(&path, yaml)
        .await
        .map_err(|e| AsaError::Storage(format!("error writing config: {}", e)))?;
    set_permissions(&path, 0o600).await?;

    tracing::info!("Configuration for profile {:?} written to {:?}", profile, path);
    Ok(path)
}

#[cfg(unix)]
async fn set_permissions(path: &Path, mode: u32) -> Result<(), AsaError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| AsaError::Storage(format!("setting permissions on {:?}: {}", path, e)))
}

#[cfg(not(unix))]
async fn set_permissions(_path: &Path, _mode: u32) -> Result<(), AsaError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
client_id: SEARCHADS.default
team_id: SEARCHADS.default
key_id: key-default
private_key_path: /keys/default.pem
profiles:
  agency:
    client_id: SEARCHADS.agency
    team_id: SEARCHADS.agency
    key_id: key-agency
    org_id: "777"
    private_key_path: /keys/agency.pem
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    async fn dir_with(contents: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(CONFIG_FILE), contents)
            .await
            .unwrap();
        dir
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[tokio::test]
    async fn test_load_default_profile() {
        let dir = dir_with(SAMPLE).await;
        let config = Config::load_from(dir.path(), None, no_env).await.unwrap();
        assert_eq!(config.profile, "default");
        assert_eq!(config.settings.client_id, "SEARCHADS.default");
        assert!(config.credentials().org_id.is_none());
    }

    #[tokio::test]
    async fn test_load_named_profile() {
        let dir = dir_with(SAMPLE).await;
        let config = Config::load_from(dir.path(), Some("agency"), no_env)
            .await
            .unwrap();
        let creds = config.credentials();
        assert_eq!(creds.client_id, "SEARCHADS.agency");
        assert_eq!(creds.org_id.as_deref(), Some("777"));
        assert_eq!(creds.private_key_path, PathBuf::from("/keys/agency.pem"));
    }

    #[tokio::test]
    async fn test_unknown_profile_is_an_error() {
        let dir = dir_with(SAMPLE).await;
        let err = Config::load_from(dir.path(), Some("nope"), no_env)
            .await
            .unwrap_err();
        assert!(matches!(err, AsaError::Config(_)));
        assert_eq!(err.to_string(), "profile \"nope\" not found in config");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path(), None, no_env).await.unwrap();
        assert_eq!(config.settings, ProfileSettings::default());
        assert!(config.credentials().validate().is_err());
    }

    #[tokio::test]
    async fn test_unquoted_numeric_org_id() {
        let dir = dir_with("client_id: c\norg_id: 40669820\n").await;
        let config = Config::load_from(dir.path(), None, no_env).await.unwrap();
        assert_eq!(config.settings.org_id, "40669820");
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_a_config_error() {
        let dir = dir_with("client_id: [unclosed").await;
        let err = Config::load_from(dir.path(), None, no_env).await.unwrap_err();
        assert!(matches!(err, AsaError::Config(_)));
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let dir = dir_with(SAMPLE).await;
        let env: HashMap<&str, &str> = [("ASA_KEY_ID", "key-env"), ("ASA_ORG_ID", "999")]
            .into_iter()
            .collect();
        let config = Config::load_from(dir.path(), Some("agency"), |name| {
            env.get(name).map(|v| v.to_string())
        })
        .await
        .unwrap();
        assert_eq!(config.settings.key_id, "key-env");
        assert_eq!(config.settings.org_id, "999");
        assert_eq!(config.settings.client_id, "SEARCHADS.agency");
    }

    #[tokio::test]
    async fn test_token_cache_path_per_profile() {
        let dir = dir_with(SAMPLE).await;
        let config = Config::load_from(dir.path(), Some("agency"), no_env)
            .await
            .unwrap();
        assert_eq!(
            config.token_cache_path(),
            dir.path().join("profiles/agency/token_cache.json")
        );
        assert_eq!(
            token_cache_path(dir.path(), ""),
            dir.path().join("profiles/default/token_cache.json")
        );
    }

    // ========================================================================
    // Saving
    // ========================================================================

    #[tokio::test]
    async fn test_save_preserves_other_profiles() {
        let dir = dir_with(SAMPLE).await;
        let settings = ProfileSettings {
            client_id: "SEARCHADS.new".to_string(),
            team_id: "SEARCHADS.new".to_string(),
            key_id: "key-new".to_string(),
            org_id: String::new(),
            private_key_path: "/keys/new.pem".to_string(),
        };
        save_profile(dir.path(), "staging", settings.clone())
            .await
            .unwrap();

        let file = ConfigFile::read(&dir.path().join(CONFIG_FILE)).await.unwrap();
        assert_eq!(file.profiles["staging"], settings);
        assert_eq!(file.profiles["agency"].key_id, "key-agency");
        assert_eq!(file.default.key_id, "key-default");
    }

    #[tokio::test]
    async fn test_save_default_profile_into_new_dir() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("nested");
        let settings = ProfileSettings {
            client_id: "c".to_string(),
            team_id: "t".to_string(),
            key_id: "k".to_string(),
            org_id: "1".to_string(),
            private_key_path: "/k.pem".to_string(),
        };
        let path = save_profile(&dir, DEFAULT_PROFILE, settings).await.unwrap();

        let config = Config::load_from(&dir, None, no_env).await.unwrap();
        assert_eq!(config.settings.org_id, "1");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let file_mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(file_mode & 0o777, 0o600);
            let dir_mode = std::fs::metadata(&dir).unwrap().permissions().mode();
            assert_eq!(dir_mode & 0o777, 0o700);
        }
        #[cfg(not(unix))]
        let _ = path;
    }

    #[tokio::test]
    async fn test_save_refuses_to_clobber_unparseable_file() {
        let dir = dir_with("client_id: [unclosed").await;
        let err = save_profile(dir.path(), DEFAULT_PROFILE, ProfileSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AsaError::Config(_)));
        let contents = std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(contents, "client_id: [unclosed");
    }

    // ========================================================================
    // Paths
    // ========================================================================

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/abs/key.pem"), PathBuf::from("/abs/key.pem"));
        assert_eq!(expand_path("rel/key.pem"), PathBuf::from("rel/key.pem"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/key.pem"), home.join("key.pem"));
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let dir = TempDir::new().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, dir.path());
        let resolved = config_dir().unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);
        assert_eq!(resolved, dir.path());
    }

    #[test]
    #[serial]
    fn test_config_dir_default() {
        std::env::remove_var(CONFIG_DIR_ENV);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config_dir().unwrap(), home.join(".asa-cli"));
        }
    }
}
