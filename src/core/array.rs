//! Array rendering helpers.
//!
//! Pure functions over flat numeric buffers:
//! - reorder a column-major (Fortran) buffer into row-major order
//! - rebuild nested row-major structure from a flat buffer and a shape
//! - stringify nested arrays with bracket notation (`[[1,2],[3,4]]`)
//! - render 2-D arrays as HTML tables
//!
//! None of these touch the filesystem or the decoder.

use crate::core::markup::escape_html;

use std::fmt::{self, Display, Write};
use thiserror::Error;

/// Errors raised when a buffer and a shape disagree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("buffer holds {len} elements but shape {shape:?} needs {expected}")]
    LengthMismatch {
        len: usize,
        shape: Vec<usize>,
        expected: usize,
    },
    #[error("shape must have at least one dimension")]
    EmptyShape,
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("expected a 2-D array, got {0} dimension(s)")]
    NotTwoDimensional(usize),
    #[error("cannot render an empty table")]
    EmptyTable,
    #[error("shape {0:?} holds more elements than fit in memory")]
    TooLarge(Vec<usize>),
}

/// A nested row-major array.
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray<T> {
    Leaf(Vec<T>),
    Nested(Vec<NdArray<T>>),
}

impl<T> NdArray<T> {
    /// Number of nesting levels, a leaf counts as one.
    pub fn ndim(&self) -> usize {
        match self {
            NdArray::Leaf(_) => 1,
            NdArray::Nested(children) => 1 + children.first().map_or(1, NdArray::ndim),
        }
    }

    /// Rows of a 2-D array.
    pub fn rows(&self) -> Result<Vec<&[T]>, ShapeError> {
        let NdArray::Nested(children) = self else {
            return Err(ShapeError::NotTwoDimensional(1));
        };
        children
            .iter()
            .map(|child| match child {
                NdArray::Leaf(values) => Ok(values.as_slice()),
                NdArray::Nested(_) => Err(ShapeError::NotTwoDimensional(self.ndim())),
            })
            .collect()
    }
}

impl<T: Display> NdArray<T> {
    /// Bracket notation without spaces, e.g. `[[1,2],[3,4]]`.
    pub fn to_bracket_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_brackets(&mut out);
        out
    }

    fn write_brackets(&self, out: &mut String) -> fmt::Result {
        out.push('[');
        match self {
            NdArray::Leaf(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write!(out, "{v}")?;
                }
            }
            NdArray::Nested(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    child.write_brackets(out)?;
                }
            }
        }
        out.push(']');
        Ok(())
    }

    /// Render a 2-D array as an HTML table with row/column labels.
    pub fn to_table_html(&self) -> Result<String, ShapeError> {
        table_html(&self.rows()?, DEFAULT_TABLE_CLASS)
    }
}

impl<T: Display> Display for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bracket_string())
    }
}

/// CSS class attached to generated tables.
pub const DEFAULT_TABLE_CLASS: &str = "fixed_headers";

/// Product of the dimensions, `None` on overflow.
fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

fn check_len(len: usize, shape: &[usize]) -> Result<(), ShapeError> {
    if shape.is_empty() {
        return Err(ShapeError::EmptyShape);
    }
    let expected = element_count(shape).ok_or_else(|| ShapeError::TooLarge(shape.to_vec()))?;
    if len != expected {
        return Err(ShapeError::LengthMismatch {
            len,
            shape: shape.to_vec(),
            expected,
        });
    }
    Ok(())
}

/// Map a row-major (C) index to the position of the same element in a column-major buffer.
///
/// For shape `(4, 5, 6)` the element `[1][2][3]` sits at `1 + 2*4 + 3*4*5` in Fortran order.
pub fn c_to_fortran_index(c_index: usize, shape: &[usize]) -> usize {
    if shape.contains(&0) {
        return 0;
    }
    let mut digits = vec![0; shape.len()];
    let mut remaining = c_index;
    for (digit, &dim) in digits.iter_mut().zip(shape).rev() {
        *digit = remaining % dim;
        remaining /= dim;
    }
    let mut stride = 1usize;
    let mut res = 0usize;
    for (&digit, &dim) in digits.iter().zip(shape) {
        res = res.saturating_add(digit.saturating_mul(stride));
        stride = stride.saturating_mul(dim);
    }
    res
}

/// Reorder a column-major buffer into row-major order.
pub fn fortran_to_c_order<T: Clone>(buf: &[T], shape: &[usize]) -> Result<Vec<T>, ShapeError> {
    check_len(buf.len(), shape)?;
    Ok((0..buf.len())
        .map(|i| buf[c_to_fortran_index(i, shape)].clone())
        .collect())
}

/// Rebuild nested row-major structure from a flat row-major buffer.
pub fn to_nested<T: Clone>(flat: &[T], shape: &[usize]) -> Result<NdArray<T>, ShapeError> {
    check_len(flat.len(), shape)?;
    Ok(build_nested(flat, shape))
}

fn build_nested<T: Clone>(flat: &[T], shape: &[usize]) -> NdArray<T> {
    match shape {
        [] | [_] => NdArray::Leaf(flat.to_vec()),
        [outer, rest @ ..] => {
            // check_len already bounded the full product.
            let piece = rest.iter().product::<usize>();
            let children = (0..*outer)
                .map(|i| build_nested(&flat[i * piece..(i + 1) * piece], rest))
                .collect();
            NdArray::Nested(children)
        }
    }
}

/// Stringify a flat row-major buffer with bracket notation.
pub fn multi_array_to_string<T: Clone + Display>(
    flat: &[T],
    shape: &[usize],
) -> Result<String, ShapeError> {
    Ok(to_nested(flat, shape)?.to_bracket_string())
}

/// Render rows as an HTML table.
///
/// The first header cell is empty, then `col N` headers; every row starts with a `row N` label.
/// Cell values are HTML escaped.
pub fn table_html<T: Display, R: AsRef<[T]>>(rows: &[R], class: &str) -> Result<String, ShapeError> {
    let Some(first) = rows.first() else {
        return Err(ShapeError::EmptyTable);
    };
    let cols = first.as_ref().len();

    let mut head = String::from("<thead><tr><td></td>");
    for c in 0..cols {
        let _ = write!(head, "<th>col {c}</th>");
    }
    head.push_str("</tr></thead>");

    let mut body = String::from("<tbody>");
    for (r, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != cols {
            return Err(ShapeError::Ragged {
                row: r,
                found: row.len(),
                expected: cols,
            });
        }
        let _ = write!(body, "<tr><td>row {r}</td>");
        for value in row {
            let _ = write!(body, "<td>{}</td>", escape_html(&value.to_string()));
        }
        body.push_str("</tr>");
    }
    body.push_str("</tbody>");

    Ok(format!(
        "<table class=\"{}\">{head}{body}</table>",
        escape_html(class)
    ))
}
