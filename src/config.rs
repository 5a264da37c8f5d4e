//! User settings: `~/.meow-cli.yaml` overlaid with `CCAT_*` environment variables

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MeowError, Result};

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "CCAT_";

/// File name looked up in the home directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = ".meow-cli.yaml";

/// Top-level settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cat: CatSettings,
}

/// Everything needed to run the Cheshire Cat container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatSettings {
    pub image: String,
    pub version: String,
    pub container_name: String,
    /// Container TCP port published on host port 80
    pub port: u16,
    pub plugins_dir: PathBuf,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for CatSettings {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("meow-cli");

        Self {
            image: "cheshire-cat-ai".to_string(),
            version: "1.0".to_string(),
            container_name: "cheshire-cat".to_string(),
            port: 80,
            plugins_dir: base.join("plugins"),
            data_dir: base.join("data"),
            static_dir: base.join("static"),
        }
    }
}

impl CatSettings {
    /// `image:version`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

/// Default config location, `$HOME/.meow-cli.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
}

impl Settings {
    /// Load settings from `explicit` (must exist) or the default path (optional),
    /// then apply environment overrides.
    ///
    /// Returns the settings and the file they were read from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let (mut settings, source) = match explicit {
            Some(path) => (Self::from_file(path)?, Some(path.to_path_buf())),
            None => match default_config_path() {
                Some(path) if path.is_file() => (Self::from_file(&path)?, Some(path)),
                _ => (Self::default(), None),
            },
        };

        settings.apply_env(std::env::vars())?;
        Ok((settings, source))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MeowError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay `CCAT_CAT_*` variables; unrelated variables are ignored
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let cat = &mut self.cat;
            match key {
                "CAT_IMAGE" => cat.image = value,
                "CAT_VERSION" => cat.version = value,
                "CAT_CONTAINER_NAME" => cat.container_name = value,
                "CAT_PORT" => {
                    cat.port = value.parse().map_err(|_| {
                        MeowError::Config(format!("{ENV_PREFIX}{key}: `{value}` is not a port"))
                    })?
                }
                "CAT_PLUGINS_DIR" => cat.plugins_dir = PathBuf::from(value),
                "CAT_DATA_DIR" => cat.data_dir = PathBuf::from(value),
                "CAT_STATIC_DIR" => cat.static_dir = PathBuf::from(value),
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("cat:\n  version: \"1.7\"\n").unwrap();
        assert_eq!(settings.cat.version, "1.7");
        assert_eq!(settings.cat.image, "cheshire-cat-ai");
        assert_eq!(settings.cat.image_ref(), "cheshire-cat-ai:1.7");
    }

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(Settings::from_yaml("\n").unwrap(), Settings::default());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = Settings::from_yaml("cat: [unterminated").unwrap_err();
        assert!(matches!(err, MeowError::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut settings =
            Settings::from_yaml("cat:\n  container_name: from-file\n  port: 8080\n").unwrap();
        settings
            .apply_env(vars(&[
                ("CCAT_CAT_CONTAINER_NAME", "from-env"),
                ("CCAT_CAT_DATA_DIR", "/srv/cat/data"),
                ("PATH", "/usr/bin"),
                ("CCAT_UNKNOWN", "ignored"),
            ]))
            .unwrap();

        assert_eq!(settings.cat.container_name, "from-env");
        assert_eq!(settings.cat.port, 8080);
        assert_eq!(settings.cat.data_dir, PathBuf::from("/srv/cat/data"));
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(vars(&[("CCAT_CAT_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("CCAT_CAT_PORT"));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, MeowError::Config(_)));
    }

    #[test]
    fn explicit_file_is_reported_as_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meow.yaml");
        std::fs::write(&path, "cat:\n  image: my-cat\n").unwrap();

        let (settings, source) = Settings::load(Some(&path)).unwrap();
        assert_eq!(source.as_deref(), Some(path.as_path()));
        // CCAT_CAT_IMAGE may be set by the environment running the tests
        if std::env::var("CCAT_CAT_IMAGE").is_err() {
            assert_eq!(settings.cat.image, "my-cat");
        }
    }
}
