//! Lexer edge cases and the token-stream reconstruction law.

use proptest::prelude::*;

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

fn lex(source: &str) -> (Vec<Token>, bool) {
    let mut lexer = Lexer::from_source(source);
    let tokens = lexer.all_tokens().to_vec();
    (tokens, lexer.has_errors())
}

/// Rebuild the source from token lexemes plus the trivia between them.
fn reconstruct(source: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pos = 0usize;
    for token in tokens {
        if token.kind == TokenKind::EndOfFile {
            break;
        }
        let start = token.location.offset as usize;
        out.push_str(&source[pos..start]); // skipped whitespace/comments
        out.push_str(&token.lexeme);
        pos = start + token.lexeme.len();
    }
    out.push_str(&source[pos..]);
    out
}

#[test]
fn lexemes_are_exact_source_slices() {
    let source = "let re = /a[/]+/g; const n = 0x1F_n2\n`t ${x}`";
    let (tokens, _) = lex(source);
    let mut last_end = 0usize;
    for token in &tokens {
        if token.kind == TokenKind::EndOfFile {
            continue;
        }
        let start = token.location.offset as usize;
        assert!(start >= last_end, "tokens overlap at {}", start);
        assert_eq!(
            &source[start..start + token.lexeme.len()],
            token.lexeme,
            "lexeme mismatch for {:?}",
            token
        );
        last_end = start + token.lexeme.len();
    }
}

#[test]
fn reconstruction_round_trip() {
    for source in [
        "let x = 1 + 2;",
        "function f(a, b) { return a / b; } // trailing",
        "x = /ab\\/cd/gi; y /= 2",
        "`hello ${ {a:1}.a }` /* tail */",
        "class C { #p = 1; static get q() { return 2 } }",
    ] {
        let (tokens, _) = lex(source);
        assert_eq!(reconstruct(source, &tokens), source);
    }
}

#[test]
fn slash_contexts_from_the_spec() {
    // Expression positions: regex.
    for (source, index) in [
        ("return /a/;", 1usize),
        ("f(, /a/)", 3), // after comma
        ("( /a/ )", 1),
        ("x = /a/", 2),
        ("/a/", 0), // start of file
    ] {
        let (tokens, _) = lex(source);
        assert_eq!(
            tokens[index].kind,
            TokenKind::RegexLiteral,
            "expected regex in {:?}",
            source
        );
    }

    // Value positions: division.
    for (source, index) in [("a /b/ c", 1usize), ("f() /b/ c", 3), ("a[0] /b/ c", 4)] {
        let (tokens, _) = lex(source);
        assert_eq!(
            tokens[index].kind,
            TokenKind::Slash,
            "expected division in {:?}",
            source
        );
    }
}

#[test]
fn typescript_keywords_lex_as_keywords() {
    let (tokens, _) = lex("abstract readonly satisfies keyof infer asserts unique using");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::KeywordAbstract,
            TokenKind::KeywordReadonly,
            TokenKind::KeywordSatisfies,
            TokenKind::KeywordKeyof,
            TokenKind::KeywordInfer,
            TokenKind::KeywordAsserts,
            TokenKind::KeywordUnique,
            TokenKind::KeywordUsing,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn locations_track_lines_and_columns() {
    let (tokens, _) = lex("a\n  bb\n");
    assert_eq!((tokens[0].location.line, tokens[0].location.column), (1, 1));
    assert_eq!((tokens[1].location.line, tokens[1].location.column), (2, 3));
}

#[test]
fn dollar_identifiers() {
    let (tokens, errors) = lex("$jq _x $1");
    assert!(!errors);
    assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
}

#[test]
fn invalid_character_recovers() {
    let (tokens, errors) = lex("let \u{00a7} x = 1;");
    assert!(errors);
    assert_eq!(tokens[1].kind, TokenKind::Invalid);
    // The rest of the stream is intact.
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
}

proptest! {
    /// The spec's lexer law: re-concatenating lexemes plus skipped trivia
    /// yields the input, for arbitrary input, valid or not.
    #[test]
    fn reconstruction_holds_for_arbitrary_ascii(source in "[ -~\t\n]{0,200}") {
        let (tokens, _) = lex(&source);
        prop_assert_eq!(reconstruct(&source, &tokens), source);
    }

    #[test]
    fn token_offsets_are_monotonic(source in "[ -~\t\n]{0,200}") {
        let (tokens, _) = lex(&source);
        let mut last_end = 0usize;
        for token in &tokens {
            if token.kind == TokenKind::EndOfFile { continue; }
            let start = token.location.offset as usize;
            prop_assert!(start >= last_end);
            last_end = start + token.lexeme.len();
        }
    }
}
