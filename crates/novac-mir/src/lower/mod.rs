//! HIR to MIR lowering.

mod hir_to_mir;

pub use hir_to_mir::generate_mir;
