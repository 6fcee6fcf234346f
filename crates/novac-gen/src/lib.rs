//! novac-gen - LLVM IR Code Generation
//!
//! Straight structural lowering from MIR to LLVM IR over inkwell. No
//! analysis happens here beyond type caching: blocks are pre-created per
//! MIR block, statements map to instructions, terminators to branches, and
//! the runtime surface (`printf`, the `nova_*` array/object functions) is
//! declared lazily on first reference.
//!
//! Untyped (`Any`) values travel as `i64` everywhere; pointers are coerced
//! through `ptrtoint`/`inttoptr` at use sites, which is what makes the
//! closure environment pointer passable through ordinary call boundaries.

pub mod error;
pub mod llvm;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{CodeGenError, Result};
pub use llvm::LlvmCodeGen;
pub use types::TypeMapper;
