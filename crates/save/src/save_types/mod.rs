// ---------------------------------------------------------------------------
// Save document types and version constants (split into submodules)
// ---------------------------------------------------------------------------

mod catalog;
mod document;
mod records;
mod version;

// Re-export everything so callers see the same flat namespace.
pub use catalog::*;
pub use document::*;
pub use records::*;
pub use version::*;
