//! Miscellaneous utility functions for pydata-preview.
//!
//! [cli] parses the command line. [helpers] holds the path utilities used by the config loader
//! and the decoder gateway, plus the editor launcher behind "reopen as text".

pub mod cli;
pub mod helpers;

pub use helpers::{
    expand_home_path, get_home, open_in_editor, readable_path, shorten_home_path,
};
