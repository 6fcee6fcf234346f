//! novac-hir - High-level IR and AST lowering
//!
//! The HIR is typed and block-structured: functions hold basic blocks of
//! instructions over a per-function value arena. Control flow is explicit
//! except for `break`/`continue`, which stay as pseudo-instructions carrying
//! an optional label; their targets are resolved during MIR generation,
//! which has loop analysis available.
//!
//! Closures are detected here: free variables of inner functions are
//! collected, an environment struct is synthesized per closure, an `__env`
//! parameter is appended to the closure's signature, and three side-tables
//! on the module record the environment layout, the captured names/values,
//! and which outer function returns which closure.

pub mod builder;
pub mod hir;
pub mod lower;

#[cfg(test)]
mod tests;

pub use builder::HirBuilder;
pub use hir::*;
pub use lower::generate_hir;
