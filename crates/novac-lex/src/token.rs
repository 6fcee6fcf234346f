//! Token kinds and token helpers.

use std::fmt;

use novac_util::SourceLocation;

/// The kind of a lexical token.
///
/// Covers the JavaScript and TypeScript keyword sets, all literal forms, and
/// every multi-character operator of the source grammar. `EndOfFile` and
/// `Invalid` are sentinels; `Invalid` doubles as the start-of-file marker for
/// regex context tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Identifier,
    NumberLiteral,
    StringLiteral,
    TemplateLiteral,
    RegexLiteral,
    TrueLiteral,
    FalseLiteral,
    NullLiteral,
    UndefinedLiteral,

    // JavaScript keywords
    KeywordBreak,
    KeywordCase,
    KeywordCatch,
    KeywordClass,
    KeywordConst,
    KeywordContinue,
    KeywordDebugger,
    KeywordDefault,
    KeywordDelete,
    KeywordDo,
    KeywordElse,
    KeywordExport,
    KeywordExtends,
    KeywordFinally,
    KeywordFor,
    KeywordFunction,
    KeywordIf,
    KeywordImport,
    KeywordIn,
    KeywordInstanceof,
    KeywordLet,
    KeywordNew,
    KeywordReturn,
    KeywordSuper,
    KeywordSwitch,
    KeywordThis,
    KeywordThrow,
    KeywordTry,
    KeywordTypeof,
    KeywordVar,
    KeywordVoid,
    KeywordWhile,
    KeywordWith,
    KeywordYield,
    KeywordAwait,
    KeywordAsync,
    KeywordFrom,
    KeywordAs,
    KeywordOf,

    // TypeScript keywords
    KeywordType,
    KeywordInterface,
    KeywordNamespace,
    KeywordDeclare,
    KeywordAbstract,
    KeywordPublic,
    KeywordPrivate,
    KeywordProtected,
    KeywordReadonly,
    KeywordStatic,
    KeywordGet,
    KeywordSet,
    KeywordOverride,
    KeywordSatisfies,
    KeywordKeyof,
    KeywordInfer,
    KeywordIs,
    KeywordAsserts,
    KeywordUnique,
    KeywordImplements,
    KeywordEnum,
    KeywordUsing,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    PlusPlus,
    MinusMinus,

    // Bitwise operators
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,

    // Assignment operators
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    StarStarEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpersandEqual,
    PipeEqual,
    CaretEqual,
    AmpersandAmpersandEqual,
    PipePipeEqual,
    QuestionQuestionEqual,

    // Comparison operators
    EqualEqual,
    ExclamationEqual,
    EqualEqualEqual,
    ExclamationEqualEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Logical operators
    AmpersandAmpersand,
    PipePipe,
    Exclamation,
    Question,
    QuestionQuestion,
    QuestionDot,

    // Punctuation
    Dot,
    DotDotDot,
    Arrow,
    Colon,
    Semicolon,
    Comma,
    Hash,
    At,

    // Brackets
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    // Sentinels
    EndOfFile,
    Invalid,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KeywordBreak
                | KeywordCase
                | KeywordCatch
                | KeywordClass
                | KeywordConst
                | KeywordContinue
                | KeywordDebugger
                | KeywordDefault
                | KeywordDelete
                | KeywordDo
                | KeywordElse
                | KeywordExport
                | KeywordExtends
                | KeywordFinally
                | KeywordFor
                | KeywordFunction
                | KeywordIf
                | KeywordImport
                | KeywordIn
                | KeywordInstanceof
                | KeywordLet
                | KeywordNew
                | KeywordReturn
                | KeywordSuper
                | KeywordSwitch
                | KeywordThis
                | KeywordThrow
                | KeywordTry
                | KeywordTypeof
                | KeywordVar
                | KeywordVoid
                | KeywordWhile
                | KeywordWith
                | KeywordYield
                | KeywordAwait
                | KeywordAsync
                | KeywordFrom
                | KeywordAs
                | KeywordOf
                | KeywordType
                | KeywordInterface
                | KeywordNamespace
                | KeywordDeclare
                | KeywordAbstract
                | KeywordPublic
                | KeywordPrivate
                | KeywordProtected
                | KeywordReadonly
                | KeywordStatic
                | KeywordGet
                | KeywordSet
                | KeywordOverride
                | KeywordSatisfies
                | KeywordKeyof
                | KeywordInfer
                | KeywordIs
                | KeywordAsserts
                | KeywordUnique
                | KeywordImplements
                | KeywordEnum
                | KeywordUsing
        )
    }

    pub fn is_literal(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            NumberLiteral
                | StringLiteral
                | TemplateLiteral
                | RegexLiteral
                | TrueLiteral
                | FalseLiteral
                | NullLiteral
                | UndefinedLiteral
        )
    }

    pub fn is_operator(self) -> bool {
        !self.is_keyword()
            && !self.is_literal()
            && !matches!(
                self,
                TokenKind::Identifier | TokenKind::EndOfFile | TokenKind::Invalid
            )
    }

    /// Compound-assignment kinds, used by the parser's assignment stratum.
    pub fn is_assignment_op(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal
                | PlusEqual
                | MinusEqual
                | StarEqual
                | SlashEqual
                | PercentEqual
                | StarStarEqual
                | LessLessEqual
                | GreaterGreaterEqual
                | GreaterGreaterGreaterEqual
                | AmpersandEqual
                | PipeEqual
                | CaretEqual
                | AmpersandAmpersandEqual
                | PipePipeEqual
                | QuestionQuestionEqual
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Map an identifier lexeme to its keyword (or keyword-literal) kind.
pub fn keyword_from_ident(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "break" => KeywordBreak,
        "case" => KeywordCase,
        "catch" => KeywordCatch,
        "class" => KeywordClass,
        "const" => KeywordConst,
        "continue" => KeywordContinue,
        "debugger" => KeywordDebugger,
        "default" => KeywordDefault,
        "delete" => KeywordDelete,
        "do" => KeywordDo,
        "else" => KeywordElse,
        "export" => KeywordExport,
        "extends" => KeywordExtends,
        "finally" => KeywordFinally,
        "for" => KeywordFor,
        "function" => KeywordFunction,
        "if" => KeywordIf,
        "import" => KeywordImport,
        "in" => KeywordIn,
        "instanceof" => KeywordInstanceof,
        "let" => KeywordLet,
        "new" => KeywordNew,
        "return" => KeywordReturn,
        "super" => KeywordSuper,
        "switch" => KeywordSwitch,
        "this" => KeywordThis,
        "throw" => KeywordThrow,
        "try" => KeywordTry,
        "typeof" => KeywordTypeof,
        "var" => KeywordVar,
        "void" => KeywordVoid,
        "while" => KeywordWhile,
        "with" => KeywordWith,
        "yield" => KeywordYield,
        "await" => KeywordAwait,
        "async" => KeywordAsync,
        "from" => KeywordFrom,
        "as" => KeywordAs,
        "of" => KeywordOf,
        "type" => KeywordType,
        "interface" => KeywordInterface,
        "namespace" => KeywordNamespace,
        "declare" => KeywordDeclare,
        "abstract" => KeywordAbstract,
        "public" => KeywordPublic,
        "private" => KeywordPrivate,
        "protected" => KeywordProtected,
        "readonly" => KeywordReadonly,
        "static" => KeywordStatic,
        "get" => KeywordGet,
        "set" => KeywordSet,
        "override" => KeywordOverride,
        "satisfies" => KeywordSatisfies,
        "keyof" => KeywordKeyof,
        "infer" => KeywordInfer,
        "is" => KeywordIs,
        "asserts" => KeywordAsserts,
        "unique" => KeywordUnique,
        "implements" => KeywordImplements,
        "enum" => KeywordEnum,
        "using" => KeywordUsing,
        "true" => TrueLiteral,
        "false" => FalseLiteral,
        "null" => NullLiteral,
        "undefined" => UndefinedLiteral,
        _ => return None,
    })
}

/// A lexical token: kind, raw lexeme, and source location.
///
/// The lexeme is the exact source slice, so concatenating lexemes with the
/// skipped trivia between them reconstructs the input. Literal values are
/// cooked on demand by [`cook_string`] / [`cook_number`] / [`template_text`].
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_not(&self, kind: TokenKind) -> bool {
        self.kind != kind
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.lexeme)
    }
}

/// Numeric literal value after cooking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Float(f64),
}

/// Cook a raw number lexeme into a value.
///
/// Handles `0x`/`0b`/`0o` prefixes, underscore separators, fraction,
/// exponent, and a trailing BigInt `n` (which is dropped; BigInt values are
/// not distinguished past the lexer).
pub fn cook_number(lexeme: &str) -> NumberValue {
    let mut text: String = lexeme.chars().filter(|&c| c != '_').collect();
    if text.ends_with('n') {
        text.pop();
    }

    if text.len() > 2 {
        let radix = match &text[..2] {
            "0x" | "0X" => Some(16),
            "0o" | "0O" => Some(8),
            "0b" | "0B" => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return match i64::from_str_radix(&text[2..], radix) {
                Ok(v) => NumberValue::Int(v),
                Err(_) => NumberValue::Float(0.0),
            };
        }
    }

    if !text.contains('.') && !text.contains('e') && !text.contains('E') {
        if let Ok(v) = text.parse::<i64>() {
            return NumberValue::Int(v);
        }
    }
    NumberValue::Float(text.parse::<f64>().unwrap_or(0.0))
}

/// Cook a raw string lexeme (quotes included) into its value.
///
/// Unknown escape sequences keep both the backslash and the character.
pub fn cook_string(lexeme: &str) -> String {
    let mut chars = lexeme.chars();
    let quote = chars.next().unwrap_or('"');
    let mut value = String::with_capacity(lexeme.len());

    while let Some(c) = chars.next() {
        if c == quote && chars.clone().next().is_none() {
            break; // closing quote
        }
        if c == '\\' {
            match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some('b') => value.push('\u{0008}'),
                Some('f') => value.push('\u{000C}'),
                Some('v') => value.push('\u{000B}'),
                Some('0') => value.push('\0'),
                Some('\\') => value.push('\\'),
                Some('\'') => value.push('\''),
                Some('"') => value.push('"'),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            }
        } else {
            value.push(c);
        }
    }
    value
}

/// The inner text of a template literal lexeme, back-ticks stripped.
pub fn template_text(lexeme: &str) -> &str {
    lexeme
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(lexeme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(keyword_from_ident("const"), Some(TokenKind::KeywordConst));
        assert_eq!(
            keyword_from_ident("satisfies"),
            Some(TokenKind::KeywordSatisfies)
        );
        assert_eq!(keyword_from_ident("true"), Some(TokenKind::TrueLiteral));
        assert_eq!(keyword_from_ident("foo"), None);
    }

    #[test]
    fn classification() {
        assert!(TokenKind::KeywordAwait.is_keyword());
        assert!(TokenKind::RegexLiteral.is_literal());
        assert!(TokenKind::QuestionQuestionEqual.is_operator());
        assert!(TokenKind::QuestionQuestionEqual.is_assignment_op());
        assert!(!TokenKind::Identifier.is_operator());
        assert!(!TokenKind::EndOfFile.is_operator());
    }

    #[test]
    fn cook_number_forms() {
        assert_eq!(cook_number("42"), NumberValue::Int(42));
        assert_eq!(cook_number("1_000_000"), NumberValue::Int(1_000_000));
        assert_eq!(cook_number("0xFF"), NumberValue::Int(255));
        assert_eq!(cook_number("0b1010"), NumberValue::Int(10));
        assert_eq!(cook_number("0o777"), NumberValue::Int(511));
        assert_eq!(cook_number("3.14"), NumberValue::Float(3.14));
        assert_eq!(cook_number("1e3"), NumberValue::Float(1000.0));
        assert_eq!(cook_number("123n"), NumberValue::Int(123));
    }

    #[test]
    fn cook_string_escapes() {
        assert_eq!(cook_string(r#""a\nb""#), "a\nb");
        assert_eq!(cook_string(r#"'it\'s'"#), "it's");
        // Unknown escapes keep both characters.
        assert_eq!(cook_string(r#""\q""#), "\\q");
    }

    #[test]
    fn template_text_strips_backticks() {
        assert_eq!(template_text("`hello ${name}!`"), "hello ${name}!");
    }
}
