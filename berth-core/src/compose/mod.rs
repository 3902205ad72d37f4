//! Compose-style stack definition parsing and validation.
//!
//! This module decodes stack definition documents (a Compose subset: `services`,
//! `networks`, `volumes`) into typed structures and validates the fields the
//! provisioners consume.

pub mod entries;
pub mod parser;
pub mod types;
pub mod validate;

#[cfg(test)]
mod parser_tests;

pub use entries::{MountEntry, MountSource, PortEntry};
pub use parser::ComposeParser;
pub use types::*;
pub use validate::validate;
