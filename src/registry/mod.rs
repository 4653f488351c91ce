//! Layered syntax registry.
//!
//! Syntaxes come from a read-only bundled layer and a user-writable directory
//! that overrides or extends it. The registry resolves syntaxes by name,
//! detects the syntax of a document from its filename or content, and
//! persists user edits.

pub mod codec;
pub mod error;
pub mod events;
pub mod index;
pub mod layers;
pub mod manager;
pub mod mapping;

pub use error::{InvalidName, SyntaxError};
pub use events::{ChangeNotifier, SyntaxChange};
pub use index::{MappingConflicts, MappingTables};
pub use layers::{BundledLayer, UserLayer};
pub use manager::{SettingState, SyntaxRegistry, NONE_NAME, XML_NAME};
pub use mapping::{MappingKind, MappingSnapshot};
