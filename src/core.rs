//! Core pipeline logic for pydata-preview.
//!
//! This module contains the non-host "engine" pieces:
//! - [format]: suffix based format classification (see [classify], [FormatKind]).
//! - [array]: pure helpers that reshape flat buffers and render them as brackets or tables.
//! - [proc]: the decoder process gateway (see [invoke], [DecodeRequest], [DecodeResult]).
//! - [markup]: turns decoder lines into a bounded HTML document (see [compose]).
//! - [formatter]: file attributes shown in the document header.
//! - [worker]: background decode threads and message passing back into the host.

pub mod array;
pub mod format;
pub mod formatter;
pub mod markup;
pub mod proc;
pub mod worker;

pub use array::{NdArray, ShapeError, multi_array_to_string, table_html, to_nested};
pub use format::{FormatKind, PathStyle, SuffixChain, classify, classify_with};
pub use formatter::FileInfo;
pub use markup::{ComposeOptions, RenderedDocument, compose, compose_error, compose_with};
pub use proc::{
    DecodeError, DecodeMode, DecodeOutput, DecodeRequest, DecodeResult, DecoderSettings, invoke,
};
pub use worker::{DecodeResponse, DecodeTicket, Workers};
