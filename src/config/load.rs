//! The main config loading module for pydata-preview.
//!
//! Handles loading and deserializing settings from `pdv.toml`.
//!
//! Provides and manages the main [Config] struct, as well as the internal [RawConfig] used for
//! parsing. Also implements default config generation for `pdv --init`.

use crate::config::{ConfigError, Decoder, Editor, OptionSource, Render, keys};
use crate::core::{ComposeOptions, DecoderSettings};
use crate::utils::get_home;

use serde::Deserialize;
use tracing::{debug, warn};

use std::path::{Path, PathBuf};
use std::{fs, io};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "PDV_CONFIG";

/// Raw configuration as read from the toml file.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RawConfig {
    decoder: Decoder,
    render: Render,
    editor: Editor,
}

/// Main configuration struct for pydata-preview.
#[derive(Debug, Clone, Default)]
pub struct Config {
    decoder: Decoder,
    render: Render,
    editor: Editor,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            decoder: raw.decoder,
            render: raw.render,
            editor: raw.editor,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    /// A missing or broken file yields the internal defaults.
    pub fn load() -> Self {
        let path = Self::default_path();

        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Read and parse a specific config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawConfig>(content).map(Config::from)
    }

    // Getters

    #[inline]
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    #[inline]
    pub fn render(&self) -> &Render {
        &self.render
    }

    #[inline]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Gateway settings resolved through [OptionSource].
    pub fn decoder_settings(&self, workspace_root: Option<PathBuf>) -> DecoderSettings {
        DecoderSettings::from_options(self).with_workspace_root(workspace_root)
    }

    pub fn compose_options(&self) -> ComposeOptions {
        self.render.compose_options()
    }

    /// Determine the default configuration file path.
    /// Checks the PDV_CONFIG environment variable first,
    /// Checks for XDG_CONFIG_HOME after,
    /// then defaults to ~/.config/pydata-preview/pdv.toml.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("pydata-preview/pdv.toml");
        }

        if let Some(home) = get_home() {
            return home.join(".config/pydata-preview/pdv.toml");
        }
        PathBuf::from("pdv.toml")
    }

    /// Generate a default configuration file at the specified path.
    /// If the file already exists, returns an error.
    pub fn generate_default(path: &Path, minimal: bool) -> io::Result<()> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {:?}", path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = if minimal { MINIMAL_TOML } else { FULL_TOML };
        fs::write(path, content)
    }
}

impl OptionSource for Config {
    fn get_option(&self, key: &str) -> String {
        match key {
            keys::INTERPRETER => self.decoder.interpreter().to_string(),
            keys::SCRIPT => self.decoder.script().to_string(),
            keys::MODE => self.decoder.mode_str().to_string(),
            keys::TIMEOUT_SECS => self.decoder.timeout_secs().to_string(),
            _ => crate::config::DEFAULT_OPTION.to_string(),
        }
    }
}

const FULL_TOML: &str = r##"# pdv.toml - default configuration for pydata-preview
#
# Commented values are the internal defaults.

[decoder]
# Interpreter used to run the decoding script. "default" looks for python3/python on PATH.
interpreter = "default"
# Decoding script. "default" uses the bundled read_files.py.
# ${workspaceFolder} is replaced with the workspace root (or removed if there is none).
script = "default"
# "preview" bounds large collections, "full" prints everything.
# mode = "preview"
# Seconds before a decode is reported as failed. 0 disables the timeout.
# timeout_secs = 0
# Number of decode worker threads used by `pdv watch`.
# workers = 2

[render]
# Optional stylesheet linked from the document head.
# stylesheet = ""
# font_family = "Menlo, Consolas, \"Ubuntu Mono\", \"Roboto Mono\", \"DejaVu Sans Mono\", monospace"
# max_lines = 20000
# max_line_chars = 200000
# show_file_info = true

[editor]
# Command used to reopen a file as plain text.
# cmd = "nvim"
"##;

const MINIMAL_TOML: &str = r##"# pdv.toml - minimal configuration
# Only a few basic options. The rest uses internal defaults.

[decoder]
interpreter = "default"
script = "default"

[editor]
cmd = "nvim"
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DecodeMode;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_report_default_option() {
        let cfg = Config::default();
        assert_eq!(cfg.get_option(keys::INTERPRETER), "default");
        assert_eq!(cfg.get_option(keys::SCRIPT), "default");
        assert_eq!(cfg.get_option("unknown.key"), "default");

        let settings = cfg.decoder_settings(None);
        assert!(settings.interpreter.is_none());
        assert!(settings.script.is_none());
        assert_eq!(settings.mode, DecodeMode::Preview);
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn test_parse_overrides() -> Result<(), Box<dyn std::error::Error>> {
        let cfg = Config::from_toml(
            r#"
            [decoder]
            interpreter = "/opt/py/bin/python"
            script = "${workspaceFolder}/tools/reader.py"
            mode = "full"
            timeout_secs = 7
            workers = 99

            [render]
            stylesheet = "preview.css"
            max_lines = 0
            "#,
        )?;

        let settings = cfg.decoder_settings(Some(PathBuf::from("/ws")));
        assert_eq!(settings.interpreter.as_deref(), Some("/opt/py/bin/python"));
        assert_eq!(
            settings.script.as_deref(),
            Some("${workspaceFolder}/tools/reader.py")
        );
        assert_eq!(settings.workspace_root, Some(PathBuf::from("/ws")));
        assert_eq!(settings.mode, DecodeMode::Full);
        assert_eq!(settings.timeout, Some(Duration::from_secs(7)));
        assert_eq!(cfg.decoder().workers(), crate::config::decoder::MAX_WORKERS);

        let options = cfg.compose_options();
        assert_eq!(options.stylesheet.as_deref(), Some("preview.css"));
        assert_eq!(options.max_lines, usize::MAX);
        Ok(())
    }

    #[test]
    fn test_generate_default_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("pdv.toml");

        Config::generate_default(&path, false)?;
        let cfg = Config::from_path(&path)?;
        assert_eq!(cfg.get_option(keys::INTERPRETER), "default");
        assert_eq!(cfg.editor().cmd(), "nvim");

        let err = Config::generate_default(&path, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        Ok(())
    }

    #[test]
    fn test_broken_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("pdv.toml");
        fs::write(&path, "[decoder\ninterpreter = ")?;
        assert!(matches!(
            Config::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }
}
