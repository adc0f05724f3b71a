//! Pure helpers for handling links.
//!
//! - [`sanitize_input`] - per-field sanitizers for untrusted values
//! - [`deep_link_parser`] - `freshcuts://` URI parser
//! - [`link_generator`] - canonical URI generation from typed parameters

pub mod deep_link_parser;
pub mod link_generator;
pub mod sanitize_input;
