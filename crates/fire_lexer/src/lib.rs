use logos::Logos;

/// Process escape sequences in a string or char literal
fn process_escape_sequences(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('0') => result.push('\0'),
                Some(other) => {
                    // Unknown escape - keep as-is
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Consume a `/* ... */` comment after its opening `/*`. Comments do not nest.
fn block_comment(lex: &mut logos::Lexer<'_, Token>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// Span in source code (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A token with its span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Dropped by [`Lexer`]; never reaches the parser
    #[token("/*", block_comment)]
    BlockComment,

    // === Keywords ===
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("throw")]
    Throw,
    #[token("class")]
    Class,
    #[token("enum")]
    Enum,
    #[token("namespace")]
    Namespace,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("none")]
    NoneLit,
    #[token("self")]
    SelfLower,

    // === Literals ===
    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().replace('_', "").parse::<i64>().ok())]
    IntLiteral(i64),

    #[regex(r"[0-9][0-9_]*u", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].replace('_', "").parse::<u64>().ok()
    })]
    SizeLiteral(u64),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*", |lex| lex.slice().replace('_', "").parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        let inner = &s[1..s.len()-1];
        Some(process_escape_sequences(inner))
    })]
    StringLiteral(String),

    #[regex(r"'([^'\\]|\\.)'", |lex| {
        let s = lex.slice();
        process_escape_sequences(&s[1..s.len() - 1]).chars().next()
    })]
    CharLiteral(char),

    // === Identifiers ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // === Punctuation ===
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("::")]
    ColonColon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,

    // === Special ===
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::BlockComment => write!(f, "/* */"),
            Token::Fn => write!(f, "fn"),
            Token::Let => write!(f, "let"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Try => write!(f, "try"),
            Token::Catch => write!(f, "catch"),
            Token::Throw => write!(f, "throw"),
            Token::Class => write!(f, "class"),
            Token::Enum => write!(f, "enum"),
            Token::Namespace => write!(f, "namespace"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::NoneLit => write!(f, "none"),
            Token::SelfLower => write!(f, "self"),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::SizeLiteral(n) => write!(f, "{}u", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "\"{}\"", s),
            Token::CharLiteral(c) => write!(f, "'{}'", c),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Tilde => write!(f, "~"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::SlashEq => write!(f, "/="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::ColonColon => write!(f, "::"),
            Token::Semi => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Ellipsis => write!(f, "..."),
            Token::Arrow => write!(f, "->"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer wrapper that produces SpannedTokens
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Token>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: Token::lexer(source),
            finished: false,
        }
    }

    /// Tokenize the entire source into a Vec, terminated by `Token::Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();

        loop {
            let spanned = lexer.next_token()?;
            let is_eof = spanned.token == Token::Eof;
            tokens.push(spanned);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        if self.finished {
            let len = self.inner.source().len();
            return Ok(SpannedToken {
                token: Token::Eof,
                span: Span::new(len, len),
            });
        }

        loop {
            return match self.inner.next() {
                Some(Ok(Token::BlockComment)) => continue,
                Some(Ok(token)) => {
                    let span = self.inner.span();
                    Ok(SpannedToken {
                        token,
                        span: Span::new(span.start, span.end),
                    })
                }
                Some(Err(())) => {
                    let span = self.inner.span();
                    let slice = self.inner.slice();
                    let message = if slice.starts_with("/*") {
                        "unterminated block comment".to_string()
                    } else {
                        format!("unexpected character: '{}'", slice)
                    };
                    Err(LexError {
                        message,
                        span: Span::new(span.start, span.end),
                    })
                }
                None => {
                    self.finished = true;
                    let len = self.inner.source().len();
                    Ok(SpannedToken {
                        token: Token::Eof,
                        span: Span::new(len, len),
                    })
                }
            };
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let source = "fn main() { let x = 5; }";
        let tokens = Lexer::tokenize(source).unwrap();

        assert!(matches!(tokens[0].token, Token::Fn));
        assert!(matches!(tokens[1].token, Token::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2].token, Token::LParen));
        assert!(matches!(tokens[3].token, Token::RParen));
        assert!(matches!(tokens[4].token, Token::LBrace));
        assert!(matches!(tokens[5].token, Token::Let));
        assert!(matches!(tokens[6].token, Token::Ident(ref s) if s == "x"));
        assert!(matches!(tokens[7].token, Token::Eq));
        assert!(matches!(tokens[8].token, Token::IntLiteral(5)));
        assert!(matches!(tokens[9].token, Token::Semi));
        assert!(matches!(tokens[10].token, Token::RBrace));
        assert!(matches!(tokens[11].token, Token::Eof));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            kinds("1_000 10u 2.5"),
            vec![
                Token::IntLiteral(1000),
                Token::SizeLiteral(10),
                Token::FloatLiteral(2.5),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_char_escapes() {
        assert_eq!(
            kinds(r"'a' '\n' '\''"),
            vec![
                Token::CharLiteral('a'),
                Token::CharLiteral('\n'),
                Token::CharLiteral('\''),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_multi_char_punctuation() {
        assert_eq!(
            kinds("Color::Red xs: int... a << b >> c"),
            vec![
                Token::Ident("Color".into()),
                Token::ColonColon,
                Token::Ident("Red".into()),
                Token::Ident("xs".into()),
                Token::Colon,
                Token::Ident("int".into()),
                Token::Ellipsis,
                Token::Ident("a".into()),
                Token::Shl,
                Token::Ident("b".into()),
                Token::Shr,
                Token::Ident("c".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n /* block\n comment */ 2"),
            vec![Token::IntLiteral(1), Token::IntLiteral(2), Token::Eof]
        );
    }

    #[test]
    fn test_block_comment_edges() {
        assert_eq!(
            kinds("a /** starred * text **/ / b /**/"),
            vec![Token::Ident("a".into()), Token::Slash, Token::Ident("b".into()), Token::Eof]
        );
        let err = Lexer::tokenize("let x = 1; /* never closed").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert_eq!(err.span, Span::new(11, 26));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::tokenize("let x = $;").unwrap_err();
        assert_eq!(err.span, Span::new(8, 9));
        assert!(err.message.contains('$'));
    }
}
