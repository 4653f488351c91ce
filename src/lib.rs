// Syntax registry library - exposes all core modules for the tool and tests

pub mod config;
pub mod config_io;
pub mod model;
pub mod primitives;
pub mod registry;

#[cfg(feature = "runtime")]
pub mod services;
