//! Core compute primitives.
//!
//! Dense row-major matrices back the document-term, document-topic and
//! embedding tables used by the topic models.

mod matrix;

pub use matrix::{argmax, Matrix};
