//! Low-level primitives used by detection
//!
//! This module contains pure text heuristics that need no registry state.

pub mod sniffer;
