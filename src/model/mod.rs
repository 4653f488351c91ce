//! Core data model: syntax definitions and the filesystem they live on.

pub mod definition;
pub mod filesystem;
