use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "cradle";

const MASK: &str = "********";

/// Keys accepted by `config get` and `config set`
pub const KEYS: [&str; 5] = [
    "session.server_url",
    "session.api_url",
    "session.api_token",
    "session.realm_name",
    "session.client_name",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Copy safe to print, with the API token hidden
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.session.api_token.is_empty() {
            masked.session.api_token = MASK.to_string();
        }
        masked
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    // CRADLE_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("CRADLE_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .context("Could not determine config directory")
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_file()?)
}

pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_file()?, config)
}

pub fn save_config_to(config_file: &Path, config: &Config) -> Result<()> {
    if let Some(config_dir) = config_file.parent() {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(config_dir, perms)?;
            }
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(config_file, contents)
        .with_context(|| format!("Failed to write config file: {}", config_file.display()))?;

    // The file holds an API token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(config_file, perms)?;
    }

    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    let session = &config.session;
    match key {
        "session.server_url" => non_empty(&session.server_url),
        "session.api_url" => non_empty(&session.api_url),
        "session.api_token" => non_empty(&session.api_token).map(|_| MASK.to_string()),
        "session.realm_name" => non_empty(&session.realm_name),
        "session.client_name" => non_empty(&session.client_name),
        _ => None,
    }
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let session = &mut config.session;
    match key {
        "session.server_url" => session.server_url = value.to_string(),
        "session.api_url" => session.api_url = value.to_string(),
        "session.api_token" => session.api_token = value.to_string(),
        "session.realm_name" => session.realm_name = value.to_string(),
        "session.client_name" => session.client_name = value.to_string(),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        let api_url = "https://mgh.thinknode.io/api/v1.0";
        set_config_value(&mut config, "session.api_url", api_url).unwrap();
        set_config_value(&mut config, "session.realm_name", "dosimetry").unwrap();
        save_config_to(&file, &config).unwrap();

        let loaded = load_config_from(&file).unwrap();
        assert_eq!(loaded.session, config.session);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let file_mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
            assert_eq!(file_mode, 0o600);
            let parent = file.parent().unwrap();
            let dir_mode = fs::metadata(parent).unwrap().permissions().mode() & 0o777;
            assert_eq!(dir_mode, 0o700);
        }
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, "[session]\nrealm_name = \"dosimetry\"\n").unwrap();

        let config = load_config_from(&file).unwrap();
        assert_eq!(config.session.realm_name, "dosimetry");
        assert_eq!(config.session.server_url, session::DEFAULT_SERVER_URL);
        assert_eq!(config.session.client_name, session::DEFAULT_CLIENT_NAME);
    }

    #[test]
    fn test_token_is_masked() {
        let mut config = Config::default();
        assert_eq!(get_config_value(&config, "session.api_token"), None);

        set_config_value(&mut config, "session.api_token", "secret").unwrap();
        assert_eq!(get_config_value(&config, "session.api_token").as_deref(), Some(MASK));
        assert_eq!(config.masked().session.api_token, MASK);
        assert_eq!(config.session.api_token, "secret");
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(set_config_value(&mut config, "session.password", "x").is_err());
        assert_eq!(get_config_value(&config, "session.password"), None);
    }
}
