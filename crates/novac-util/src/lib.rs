//! novac-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every stage of the compiler pipeline:
//!
//! - [`Symbol`]: interned strings for identifiers, labels, and function names
//! - [`SourceLocation`]: file/line/column/offset positions carried by tokens
//!   and diagnostics
//! - [`Diagnostic`] / [`Handler`]: the per-stage error collector; stages never
//!   print, the driver drains handlers
//! - [`IndexVec`] / [`Idx`]: typed-index vectors backing the AST, HIR, and
//!   MIR arenas
//!
//! These are deliberately small and dependency-light. The compiler is
//! single-threaded; the only global state is the string interner.

pub mod diagnostic;
pub mod index_vec;
pub mod location;
pub mod symbol;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use location::SourceLocation;
pub use symbol::Symbol;

// Re-export the hash maps used throughout the compiler so downstream crates
// agree on one hasher.
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
