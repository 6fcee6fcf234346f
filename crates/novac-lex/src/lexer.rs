//! The main lexer.
//!
//! A direct-coded scanner: one function per token family, dispatched on the
//! first character. The lexer records the kind of the last token it returned
//! (`last_token_kind`) to decide whether a `/` opens a regex literal or is a
//! division operator; see [`can_precede_regex`].

use novac_util::{Handler, SourceLocation, Symbol};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Returns true if a `/` after a token of this kind starts a regex literal.
///
/// The allow-set is the fixed list of punctuators and keywords that cannot be
/// followed by a binary division: positions where the grammar expects an
/// expression to start. `Invalid` stands for start-of-file.
pub fn can_precede_regex(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Invalid // start of file
            | LeftParen
            | LeftBracket
            | LeftBrace
            | Comma
            | Semicolon
            | Colon
            | Question
            | Plus
            | Minus
            | Star
            | Slash
            | Percent
            | StarStar
            | Less
            | Greater
            | LessEqual
            | GreaterEqual
            | EqualEqual
            | ExclamationEqual
            | EqualEqualEqual
            | ExclamationEqualEqual
            | Ampersand
            | Pipe
            | Caret
            | AmpersandAmpersand
            | PipePipe
            | Equal
            | PlusEqual
            | MinusEqual
            | StarEqual
            | SlashEqual
            | PercentEqual
            | LessLess
            | GreaterGreater
            | GreaterGreaterGreater
            | Arrow
            | KeywordReturn
            | KeywordThrow
            | KeywordCase
            | KeywordNew
            | KeywordIn
            | KeywordOf
            | KeywordTypeof
            | KeywordDelete
            | KeywordVoid
            | KeywordYield
            | KeywordAwait
            | KeywordIf
            | KeywordElse
            | KeywordWhile
            | KeywordDo
            | KeywordFor
            | KeywordSwitch
            | KeywordWith
            | KeywordExport
            | KeywordDefault
            | Exclamation
            | Tilde
            | QuestionQuestion
    )
}

/// The lexer. Produces tokens on demand and memoizes the full stream on the
/// first [`Lexer::all_tokens`] call.
pub struct Lexer<'src> {
    file: Symbol,
    cursor: Cursor<'src>,
    handler: Handler,
    tokens: Vec<Token>,
    memoized: bool,
    peeked: Option<Token>,
    last_token_kind: TokenKind,
}

impl<'src> Lexer<'src> {
    pub fn new(filename: &str, source: &'src str) -> Self {
        Self {
            file: Symbol::intern(filename),
            cursor: Cursor::new(source),
            handler: Handler::new(),
            tokens: Vec::new(),
            memoized: false,
            peeked: None,
            last_token_kind: TokenKind::Invalid,
        }
    }

    /// Convenience constructor for tests; the file name becomes `<input>`.
    pub fn from_source(source: &'src str) -> Self {
        Self::new("<input>", source)
    }

    /// Returns the next token, consuming it.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.scan_token()
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Token {
        if self.peeked.is_none() {
            let token = self.scan_token();
            self.peeked = Some(token);
        }
        self.peeked.clone().unwrap()
    }

    /// The complete token stream, ending with `EndOfFile`. Memoized on first
    /// call; later calls return the same vector.
    pub fn all_tokens(&mut self) -> &[Token] {
        if !self.memoized {
            loop {
                let token = self.next_token();
                let done = token.kind == TokenKind::EndOfFile;
                self.tokens.push(token);
                if done {
                    break;
                }
            }
            self.memoized = true;
        }
        &self.tokens
    }

    /// Force regex interpretation of a `/` at the current position.
    ///
    /// Used by the parser's fallback when it expects an expression and the
    /// stream shows a `Slash`. Returns an `Invalid` token if the current
    /// character is not `/`.
    pub fn try_lex_regex(&mut self) -> Token {
        if !self.cursor.is_at_end() && self.cursor.current_char() == '/' {
            let start = self.cursor.position();
            let location = self.current_location();
            let kind = self.lex_regex(location);
            let lexeme = self.cursor.slice(start, self.cursor.position());
            let token = Token::new(kind, lexeme, location);
            self.last_token_kind = token.kind;
            token
        } else {
            Token::new(TokenKind::Invalid, "", self.current_location())
        }
    }

    pub fn has_errors(&self) -> bool {
        self.handler.has_errors()
    }

    /// Rendered diagnostics, in source order.
    pub fn errors(&self) -> Vec<String> {
        self.handler.rendered()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The underlying source text. The parser needs this for its regex
    /// re-lex fallback and for verbatim JSX text slices.
    pub fn source(&self) -> &'src str {
        self.cursor.source()
    }

    /// The interned file name this lexer reports locations against.
    pub fn file(&self) -> Symbol {
        self.file
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(
            self.file,
            self.cursor.line(),
            self.cursor.column(),
            self.cursor.position() as u32,
        )
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.cursor.position();
        let location = self.current_location();

        if self.cursor.is_at_end() {
            self.last_token_kind = TokenKind::EndOfFile;
            return Token::new(TokenKind::EndOfFile, "", location);
        }

        let c = self.cursor.current_char();

        let kind = if c == '/'
            && self.cursor.peek_char(1) != '='
            && can_precede_regex(self.last_token_kind)
        {
            self.lex_regex(location)
        } else if c.is_ascii_digit() {
            self.lex_number(location)
        } else if c == '"' || c == '\'' {
            self.lex_string(c, location)
        } else if c == '`' {
            self.lex_template(location)
        } else if is_identifier_start(c) {
            self.lex_identifier_or_keyword(start)
        } else {
            self.lex_operator(location)
        };

        let lexeme = self.cursor.slice(start, self.cursor.position());
        let token = Token::new(kind, lexeme, location);
        self.last_token_kind = token.kind;
        token
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.cursor.current_char();
            if is_whitespace(c) {
                self.cursor.advance();
            } else if c == '/' && self.cursor.peek_char(1) == '/' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
            } else if c == '/' && self.cursor.peek_char(1) == '*' {
                let open = self.current_location();
                self.cursor.advance();
                self.cursor.advance();
                let mut closed = false;
                while !self.cursor.is_at_end() {
                    if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                        self.cursor.advance();
                        self.cursor.advance();
                        closed = true;
                        break;
                    }
                    self.cursor.advance();
                }
                if !closed {
                    self.handler.error("Unterminated block comment", open);
                }
            } else {
                break;
            }
        }
    }

    fn lex_number(&mut self, _location: SourceLocation) -> TokenKind {
        if self.cursor.current_char() == '0' {
            let prefix = self.cursor.peek_char(1);
            let digit_test: Option<fn(char) -> bool> = match prefix {
                'b' | 'B' => Some(|c| c == '0' || c == '1'),
                'o' | 'O' => Some(|c| ('0'..='7').contains(&c)),
                'x' | 'X' => Some(|c| c.is_ascii_hexdigit()),
                _ => None,
            };
            if let Some(is_digit) = digit_test {
                let open = self.current_location();
                self.cursor.advance(); // 0
                self.cursor.advance(); // prefix
                let mut any = false;
                while is_digit(self.cursor.current_char()) || self.cursor.current_char() == '_' {
                    any = any || self.cursor.current_char() != '_';
                    self.cursor.advance();
                }
                if !any {
                    self.handler.error("invalid numeric literal prefix", open);
                }
                self.cursor.eat('n');
                return TokenKind::NumberLiteral;
            }
        }

        while self.cursor.current_char().is_ascii_digit() || self.cursor.current_char() == '_' {
            self.cursor.advance();
        }

        // Fractional part
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() || self.cursor.current_char() == '_' {
                self.cursor.advance();
            }
        }

        // Exponent
        if matches!(self.cursor.current_char(), 'e' | 'E') {
            self.cursor.advance();
            if matches!(self.cursor.current_char(), '+' | '-') {
                self.cursor.advance();
            }
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        // BigInt suffix
        self.cursor.eat('n');

        TokenKind::NumberLiteral
    }

    fn lex_string(&mut self, quote: char, location: SourceLocation) -> TokenKind {
        self.cursor.advance(); // opening quote

        loop {
            if self.cursor.is_at_end() {
                self.handler.error("Unterminated string", location);
                return TokenKind::StringLiteral;
            }
            let c = self.cursor.current_char();
            if c == quote {
                self.cursor.advance();
                return TokenKind::StringLiteral;
            }
            if c == '\\' {
                self.cursor.advance();
                if !self.cursor.is_at_end() {
                    self.cursor.advance();
                }
            } else {
                self.cursor.advance();
            }
        }
    }

    /// Capture the whole back-tick-delimited text as one token. Interpolation
    /// parsing is deferred to the parser, which re-lexes each `${ ... }`
    /// chunk with a nested lexer.
    fn lex_template(&mut self, location: SourceLocation) -> TokenKind {
        self.cursor.advance(); // opening back-tick

        loop {
            if self.cursor.is_at_end() {
                self.handler.error("Unterminated template literal", location);
                return TokenKind::TemplateLiteral;
            }
            match self.cursor.current_char() {
                '`' => {
                    self.cursor.advance();
                    return TokenKind::TemplateLiteral;
                }
                '\\' => {
                    self.cursor.advance();
                    if !self.cursor.is_at_end() {
                        self.cursor.advance();
                    }
                }
                _ => self.cursor.advance(),
            }
        }
    }

    fn lex_identifier_or_keyword(&mut self, start: usize) -> TokenKind {
        while is_identifier_part(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice(start, self.cursor.position());
        keyword_from_ident(text).unwrap_or(TokenKind::Identifier)
    }

    /// Scan a regex literal body and flags. The leading `/` has not been
    /// consumed. Slashes inside `[...]` character classes do not terminate
    /// the body; a bare newline in the body is an error.
    fn lex_regex(&mut self, location: SourceLocation) -> TokenKind {
        self.cursor.advance(); // opening '/'

        loop {
            if self.cursor.is_at_end() {
                self.handler
                    .error("Unterminated regular expression", location);
                return TokenKind::Invalid;
            }
            match self.cursor.current_char() {
                '/' => break,
                '\n' => {
                    self.handler
                        .error("Unterminated regular expression", location);
                    return TokenKind::Invalid;
                }
                '\\' => {
                    self.cursor.advance();
                    if !self.cursor.is_at_end() {
                        self.cursor.advance();
                    }
                }
                '[' => {
                    // Character class: '/' inside does not end the regex.
                    self.cursor.advance();
                    while !self.cursor.is_at_end() && self.cursor.current_char() != ']' {
                        if self.cursor.current_char() == '\\' {
                            self.cursor.advance();
                            if !self.cursor.is_at_end() {
                                self.cursor.advance();
                            }
                        } else {
                            self.cursor.advance();
                        }
                    }
                    self.cursor.eat(']');
                }
                _ => self.cursor.advance(),
            }
        }

        self.cursor.advance(); // closing '/'

        while matches!(
            self.cursor.current_char(),
            'g' | 'i' | 'm' | 's' | 'u' | 'y' | 'd'
        ) {
            self.cursor.advance();
        }

        TokenKind::RegexLiteral
    }

    fn lex_operator(&mut self, location: SourceLocation) -> TokenKind {
        use TokenKind::*;
        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            '+' => {
                if self.cursor.eat('+') {
                    PlusPlus
                } else if self.cursor.eat('=') {
                    PlusEqual
                } else {
                    Plus
                }
            }
            '-' => {
                if self.cursor.eat('-') {
                    MinusMinus
                } else if self.cursor.eat('=') {
                    MinusEqual
                } else {
                    Minus
                }
            }
            '*' => {
                if self.cursor.eat('*') {
                    if self.cursor.eat('=') {
                        StarStarEqual
                    } else {
                        StarStar
                    }
                } else if self.cursor.eat('=') {
                    StarEqual
                } else {
                    Star
                }
            }
            '/' => {
                if self.cursor.eat('=') {
                    SlashEqual
                } else {
                    Slash
                }
            }
            '%' => {
                if self.cursor.eat('=') {
                    PercentEqual
                } else {
                    Percent
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') {
                        EqualEqualEqual
                    } else {
                        EqualEqual
                    }
                } else if self.cursor.eat('>') {
                    Arrow
                } else {
                    Equal
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') {
                        ExclamationEqualEqual
                    } else {
                        ExclamationEqual
                    }
                } else {
                    Exclamation
                }
            }
            '<' => {
                if self.cursor.eat('<') {
                    if self.cursor.eat('=') {
                        LessLessEqual
                    } else {
                        LessLess
                    }
                } else if self.cursor.eat('=') {
                    LessEqual
                } else {
                    Less
                }
            }
            '>' => {
                if self.cursor.eat('>') {
                    if self.cursor.eat('>') {
                        if self.cursor.eat('=') {
                            GreaterGreaterGreaterEqual
                        } else {
                            GreaterGreaterGreater
                        }
                    } else if self.cursor.eat('=') {
                        GreaterGreaterEqual
                    } else {
                        GreaterGreater
                    }
                } else if self.cursor.eat('=') {
                    GreaterEqual
                } else {
                    Greater
                }
            }
            '&' => {
                if self.cursor.eat('&') {
                    if self.cursor.eat('=') {
                        AmpersandAmpersandEqual
                    } else {
                        AmpersandAmpersand
                    }
                } else if self.cursor.eat('=') {
                    AmpersandEqual
                } else {
                    Ampersand
                }
            }
            '|' => {
                if self.cursor.eat('|') {
                    if self.cursor.eat('=') {
                        PipePipeEqual
                    } else {
                        PipePipe
                    }
                } else if self.cursor.eat('=') {
                    PipeEqual
                } else {
                    Pipe
                }
            }
            '?' => {
                if self.cursor.eat('?') {
                    if self.cursor.eat('=') {
                        QuestionQuestionEqual
                    } else {
                        QuestionQuestion
                    }
                } else if self.cursor.eat('.') {
                    QuestionDot
                } else {
                    Question
                }
            }
            '.' => {
                if self.cursor.current_char() == '.' && self.cursor.peek_char(1) == '.' {
                    self.cursor.advance();
                    self.cursor.advance();
                    DotDotDot
                } else {
                    Dot
                }
            }
            '^' => {
                if self.cursor.eat('=') {
                    CaretEqual
                } else {
                    Caret
                }
            }
            '~' => Tilde,
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '#' => Hash,
            '@' => At,
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            '[' => LeftBracket,
            ']' => RightBracket,
            other => {
                self.handler
                    .error(format!("unexpected character '{}'", other), location);
                Invalid
            }
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::from_source(source);
        lexer.all_tokens().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn basic_declaration() {
        assert_eq!(
            kinds("let x = 42;"),
            vec![
                KeywordLet,
                Identifier,
                Equal,
                NumberLiteral,
                Semicolon,
                EndOfFile
            ]
        );
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("a === b >>>= c ??= d ?. e => f ..."),
            vec![
                Identifier,
                EqualEqualEqual,
                Identifier,
                GreaterGreaterGreaterEqual,
                Identifier,
                QuestionQuestionEqual,
                Identifier,
                QuestionDot,
                Identifier,
                Arrow,
                Identifier,
                DotDotDot,
                EndOfFile
            ]
        );
    }

    #[test]
    fn regex_after_expression_starters() {
        // '/' at start of file, after '(', ',', '=', and 'return' is a regex.
        assert_eq!(kinds("/ab/g")[0], RegexLiteral);
        assert_eq!(kinds("f(/a/, /b/)")[2], RegexLiteral);
        assert_eq!(kinds("x = /a/i")[2], RegexLiteral);
        assert_eq!(kinds("return /a/;")[1], RegexLiteral);
    }

    #[test]
    fn division_after_value_positions() {
        // '/' after identifier, ')' or ']' is division.
        assert_eq!(kinds("a / b")[1], Slash);
        assert_eq!(kinds("f(x) / 2")[4], Slash);
        assert_eq!(kinds("a[0] / 2")[4], Slash);
    }

    #[test]
    fn regex_character_class_hides_slash() {
        let mut lexer = Lexer::from_source("= /a[/]b/g");
        let tokens = lexer.all_tokens();
        assert_eq!(tokens[1].kind, RegexLiteral);
        assert_eq!(tokens[1].lexeme, "/a[/]b/g");
    }

    #[test]
    fn regex_newline_is_error() {
        let mut lexer = Lexer::from_source("= /ab\ncd/");
        lexer.all_tokens();
        assert!(lexer.has_errors());
    }

    #[test]
    fn template_is_one_token() {
        let mut lexer = Lexer::from_source("`hello ${name}!`");
        let tokens = lexer.all_tokens();
        assert_eq!(tokens[0].kind, TemplateLiteral);
        assert_eq!(tokens[0].lexeme, "`hello ${name}!`");
        assert_eq!(tokens[1].kind, EndOfFile);
    }

    #[test]
    fn comments_produce_no_tokens() {
        assert_eq!(
            kinds("a // line\n/* block\nspans */ b"),
            vec![Identifier, Identifier, EndOfFile]
        );
    }

    #[test]
    fn block_comment_updates_lines() {
        let mut lexer = Lexer::from_source("/* a\nb */ x");
        let tokens = lexer.all_tokens().to_vec();
        assert_eq!(tokens[0].location.line, 2);
    }

    #[test]
    fn unterminated_string_recovers() {
        let mut lexer = Lexer::from_source("\"abc\nlet y = 1;");
        let tokens = lexer.all_tokens().to_vec();
        assert!(lexer.has_errors());
        // Lexing continued to the end of input.
        assert_eq!(tokens.last().unwrap().kind, EndOfFile);
    }

    #[test]
    fn try_lex_regex_forces_interpretation() {
        let mut lexer = Lexer::from_source("/ab/");
        let token = lexer.try_lex_regex();
        assert_eq!(token.kind, RegexLiteral);
        assert_eq!(token.lexeme, "/ab/");
    }

    #[test]
    fn bigint_and_separators() {
        let mut lexer = Lexer::from_source("1_000n 0xFFn");
        let tokens = lexer.all_tokens();
        assert_eq!(tokens[0].lexeme, "1_000n");
        assert_eq!(tokens[1].lexeme, "0xFFn");
    }
}
