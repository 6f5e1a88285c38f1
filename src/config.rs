//! Configuration for pydata-preview.
//!
//! Settings are read from `pdv.toml` (see [load::Config::default_path]) and split into sections:
//! - [decoder]: interpreter/script overrides, decode mode, timeout, worker count
//! - [render]: stylesheet, font and output bounds of the composed document
//! - [editor]: the command used to reopen a file as plain text
//!
//! The rest of the crate reads the decoder overrides through [OptionSource], so a host with its
//! own option storage can plug in without going through the TOML file.

pub mod decoder;
pub mod editor;
pub mod load;
pub mod render;

pub use decoder::Decoder;
pub use editor::Editor;
pub use load::Config;
pub use render::Render;

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Value returned by an [OptionSource] for an unset option.
pub const DEFAULT_OPTION: &str = "default";

/// Option keys understood by the decoder gateway.
pub mod keys {
    pub const INTERPRETER: &str = "decoder.interpreter";
    pub const SCRIPT: &str = "decoder.script";
    pub const MODE: &str = "decoder.mode";
    pub const TIMEOUT_SECS: &str = "decoder.timeout_secs";
}

/// The configuration collaborator: a flat key lookup answering [DEFAULT_OPTION] when unset.
pub trait OptionSource {
    fn get_option(&self, key: &str) -> String;
}

impl OptionSource for HashMap<String, String> {
    fn get_option(&self, key: &str) -> String {
        self.get(key)
            .cloned()
            .unwrap_or_else(|| DEFAULT_OPTION.to_string())
    }
}

/// Errors while reading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
