//! novac-lex - Lexical Analyzer
//!
//! Transforms TypeScript/JavaScript source into a token stream. Two
//! ambiguities make this lexer context-sensitive:
//!
//! - `/` is a regex literal opener or a division operator depending on the
//!   previous token (see [`lexer::can_precede_regex`]).
//! - Template literals are captured whole, back-tick to back-tick;
//!   interpolation is split later by the parser, which runs a nested lexer
//!   over each `${ ... }` chunk.
//!
//! Recovery is local: an unterminated literal or comment produces a
//! diagnostic at its opening location and lexing resumes at the next
//! recognizable character. The token stream always ends with `EndOfFile`.

pub mod cursor;
pub mod lexer;
pub mod token;

#[cfg(test)]
mod edge_cases;

pub use lexer::Lexer;
pub use token::{NumberValue, Token, TokenKind};
