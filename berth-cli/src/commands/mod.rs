//! CLI command implementations

pub mod stack;
