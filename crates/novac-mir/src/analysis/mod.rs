//! CFG analysis over HIR functions, run before lowering: dominance,
//! reachability, and loop/switch context construction.

pub mod cfg;
pub mod loops;

pub use cfg::ControlFlowGraph;
pub use loops::{ContextId, LoopAnalysis, LoopContext};
