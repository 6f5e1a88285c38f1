//! Decoder configuration options.
//!
//! The `[decoder]` table of pdv.toml. `interpreter` and `script` take the literal "default" to
//! mean "use the platform default".

use crate::config::DEFAULT_OPTION;

use serde::Deserialize;

/// Upper bound for decode worker threads.
pub const MAX_WORKERS: usize = 16;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Decoder {
    interpreter: String,
    script: String,
    mode: String,
    timeout_secs: u64,
    workers: usize,
}

impl Decoder {
    #[inline]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    #[inline]
    pub fn script(&self) -> &str {
        &self.script
    }

    #[inline]
    pub fn mode_str(&self) -> &str {
        &self.mode
    }

    #[inline]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Worker count clamped to `1..=MAX_WORKERS`.
    pub fn workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            interpreter: DEFAULT_OPTION.into(),
            script: DEFAULT_OPTION.into(),
            mode: "preview".into(),
            timeout_secs: 0,
            workers: 2,
        }
    }
}
