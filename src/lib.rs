//! Library crate for pydata-preview.
//!
//! The shipped application is the `pdv` binary (`src/main.rs`).
//!
//! The pipeline is file path -> [core::classify] -> [core::invoke] -> [core::compose] ->
//! panel content, owned per file by a [session::PreviewSession]. The library is split so the
//! binary, the integration tests and other hosts can share it.

pub mod app;
pub mod config;
pub mod core;
pub mod logging;
pub mod session;
pub mod utils;
