//! Format classification for pydata-preview.
//!
//! Maps a file path to the [FormatKind] the decoding script should use. Classification only
//! ever looks at the dot-delimited suffix chain of the path, never at file contents.
//!
//! Compound suffixes are handled through "wrapper" tokens (`gz`, `tar`): when the final token is
//! a wrapper, the last two tokens are joined (`pkl.gz`) and classified together.
//!
//! Unknown suffixes fall back to [FormatKind::NumericArray]. This mirrors the behavior users
//! already rely on. An explicit `Unknown` variant is a candidate for a future revision.

use phf::phf_map;
use std::fmt;
use tracing::{debug, info};

/// Closed set of binary format families the decoder understands.
///
/// The discriminants are the integer tags passed to the decoding script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    NumericArray = 0,
    GenericObject = 1,
    ModelCheckpoint = 2,
    CompressedGenericObject = 3,
}

impl FormatKind {
    /// Integer tag understood by the decoding script.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Human readable label, used in headers and `pdv classify` output.
    pub fn label(self) -> &'static str {
        match self {
            FormatKind::NumericArray => "numeric-array",
            FormatKind::GenericObject => "generic-object",
            FormatKind::ModelCheckpoint => "model-checkpoint",
            FormatKind::CompressedGenericObject => "compressed-generic-object",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Suffix (or compound suffix) to format mapping.
static SUFFIX_KIND_MAP: phf::Map<&'static str, FormatKind> = phf_map! {
    "npz" => FormatKind::NumericArray,
    "npy" => FormatKind::NumericArray,
    "pkl" => FormatKind::GenericObject,
    "pck" => FormatKind::GenericObject,
    "pickle" => FormatKind::GenericObject,
    "pkl.gz" => FormatKind::CompressedGenericObject,
    "pth" => FormatKind::ModelCheckpoint,
    "pt" => FormatKind::ModelCheckpoint,
    "ckpt" => FormatKind::ModelCheckpoint,
};

/// Tokens that denote a compression/archive layer around the real format.
const WRAPPER_TOKENS: &[&str] = &["gz", "tar"];

/// How the host represents absolute paths.
///
/// Some hosts hand out drive-letter paths with an extra leading separator (`/C:/data/a.npy`).
/// [PathStyle::DriveLetter] strips that separator before anything else looks at the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStyle {
    #[default]
    Posix,
    DriveLetter,
}

impl PathStyle {
    /// The style of the platform this binary was built for.
    pub fn native() -> Self {
        if cfg!(windows) {
            PathStyle::DriveLetter
        } else {
            PathStyle::Posix
        }
    }

    /// Normalize a host path for classification and for handing to the decoder.
    ///
    /// Only a single leading `/` directly followed by `<letter>:` is removed.
    pub fn normalize<'a>(self, path: &'a str) -> &'a str {
        match self {
            PathStyle::Posix => path,
            PathStyle::DriveLetter => {
                let bytes = path.as_bytes();
                if bytes.len() >= 3
                    && bytes[0] == b'/'
                    && bytes[1].is_ascii_alphabetic()
                    && bytes[2] == b':'
                {
                    &path[1..]
                } else {
                    path
                }
            }
        }
    }
}

/// The dot-delimited trailing tokens of a file name.
///
/// Only the file name component is split, so dots in directory names never leak in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixChain<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> SuffixChain<'a> {
    pub fn from_path(path: &'a str) -> Self {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let tokens = name.split('.').skip(1).collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    /// The final token, if the name has any dot at all.
    pub fn primary(&self) -> Option<&'a str> {
        self.tokens.last().copied()
    }

    /// The suffix used for lookup: either the primary token or, behind a wrapper token, the
    /// last two tokens joined with a dot.
    pub fn lookup_key(&self) -> Option<String> {
        let primary = self.primary()?;
        if WRAPPER_TOKENS.contains(&primary) && self.tokens.len() >= 2 {
            let inner = self.tokens[self.tokens.len() - 2];
            return Some(format!("{inner}.{primary}"));
        }
        Some(primary.to_string())
    }
}

/// Classify a suffix (or compound suffix) string.
///
/// Returns `None` for anything not in the table; callers decide the fallback.
pub fn kind_for_suffix(suffix: &str) -> Option<FormatKind> {
    SUFFIX_KIND_MAP.get(suffix).copied()
}

/// Classify a path using the native path style.
pub fn classify(path: &str) -> FormatKind {
    classify_with(path, PathStyle::native())
}

/// Classify a path under an explicit path style. Total: never fails.
pub fn classify_with(path: &str, style: PathStyle) -> FormatKind {
    let normalized = style.normalize(path);
    let chain = SuffixChain::from_path(normalized);
    let key = chain.lookup_key();

    match key.as_deref().and_then(kind_for_suffix) {
        Some(kind) => {
            debug!(path = normalized, suffix = ?key, %kind, "classified");
            kind
        }
        None => {
            info!(
                path = normalized,
                suffix = ?key,
                "unrecognized suffix, falling back to numeric-array"
            );
            FormatKind::NumericArray
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        let cases = [
            ("a.npz", FormatKind::NumericArray),
            ("a.npy", FormatKind::NumericArray),
            ("a.pkl", FormatKind::GenericObject),
            ("a.pck", FormatKind::GenericObject),
            ("a.pickle", FormatKind::GenericObject),
            ("a.pkl.gz", FormatKind::CompressedGenericObject),
            ("a.pth", FormatKind::ModelCheckpoint),
            ("a.pt", FormatKind::ModelCheckpoint),
            ("a.ckpt", FormatKind::ModelCheckpoint),
        ];
        for (path, expected) in cases {
            assert_eq!(
                classify_with(path, PathStyle::Posix),
                expected,
                "wrong kind for {path}"
            );
        }
    }

    #[test]
    fn test_unknown_suffix_falls_back() {
        for path in ["a.csv", "a", "a.tar.gz", "a.gz", "dir.pkl/file", "a.PKL", ".hidden"] {
            assert_eq!(
                classify_with(path, PathStyle::Posix),
                FormatKind::NumericArray,
                "expected fallback for {path}"
            );
        }
    }

    #[test]
    fn test_spec_examples() {
        assert_eq!(
            classify_with("archive.pkl.gz", PathStyle::Posix),
            FormatKind::CompressedGenericObject
        );
        assert_eq!(
            classify_with("weights.pt", PathStyle::Posix),
            FormatKind::ModelCheckpoint
        );
        assert_eq!(
            classify_with("data.npy", PathStyle::Posix),
            FormatKind::NumericArray
        );
    }

    #[test]
    fn test_drive_letter_normalization() {
        assert_eq!(
            PathStyle::DriveLetter.normalize("/C:/data/a.npy"),
            "C:/data/a.npy"
        );
        assert_eq!(PathStyle::DriveLetter.normalize("/home/a.npy"), "/home/a.npy");
        assert_eq!(PathStyle::Posix.normalize("/C:/data/a.npy"), "/C:/data/a.npy");
        assert_eq!(
            classify_with("/C:/data/a.pkl.gz", PathStyle::DriveLetter),
            classify_with("C:/data/a.pkl.gz", PathStyle::DriveLetter)
        );
    }

    #[test]
    fn test_suffix_chain_ignores_directory_dots() {
        let chain = SuffixChain::from_path("/data/v1.2/model.ckpt");
        assert_eq!(chain.tokens(), &["ckpt"]);
        assert_eq!(chain.lookup_key().as_deref(), Some("ckpt"));

        let chain = SuffixChain::from_path(r"C:\runs\a.b.pkl.gz");
        assert_eq!(chain.tokens(), &["b", "pkl", "gz"]);
        assert_eq!(chain.lookup_key().as_deref(), Some("pkl.gz"));
    }

    #[test]
    fn test_tags_match_script_contract() {
        assert_eq!(FormatKind::NumericArray.tag(), 0);
        assert_eq!(FormatKind::GenericObject.tag(), 1);
        assert_eq!(FormatKind::ModelCheckpoint.tag(), 2);
        assert_eq!(FormatKind::CompressedGenericObject.tag(), 3);
    }
}
