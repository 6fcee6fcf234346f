//! Error types for LLVM code generation.

use thiserror::Error;

/// Error type for LLVM code generation. Invariant violations are fatal: the
/// offending module is discarded and the driver is told to stop.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// Target block not found during code generation
    #[error("Target block 'bb{0}' not found")]
    BlockNotFound(u32),

    /// Function not found
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    /// Call through an operand that names no function
    #[error("Call target is not a function name")]
    IndirectCallUnresolved,

    /// LLVM operation failed
    #[error("LLVM operation failed: {0}")]
    LlvmOperationFailed(String),

    /// The final module verifier rejected the output
    #[error("LLVM verifier failed: {0}")]
    VerifierFailed(String),

    /// Type mapping error
    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    /// Target machine or triple initialization failed
    #[error("Target initialization failed: {0}")]
    TargetInitFailed(String),

    /// Emission to disk failed
    #[error("Emit failed: {0}")]
    EmitFailed(String),

    /// JIT execution failed
    #[error("JIT execution failed: {0}")]
    JitFailed(String),
}

/// Result type alias for code generation operations.
pub type Result<T> = std::result::Result<T, CodeGenError>;
