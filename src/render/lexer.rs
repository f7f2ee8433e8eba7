//! Java token scanner for syntax highlighting.
//!
//! The scanner never fails: unterminated strings and comments run to the
//! end of the input, and any character it does not recognize becomes an
//! operator token. Concatenating the span texts reproduces the input.

/// Highlighting class of a source span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    StringLit,
    CharLit,
    Comment,
    Annotation,
    Operator,
    Whitespace,
}

impl TokenKind {
    /// CSS class the stylesheet colors this kind with.
    ///
    /// `None` renders in the document foreground color.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            TokenKind::Keyword => Some("k"),
            TokenKind::StringLit | TokenKind::CharLit => Some("s"),
            TokenKind::Comment => Some("c"),
            TokenKind::Number => Some("m"),
            TokenKind::Annotation => Some("nd"),
            TokenKind::Operator => Some("o"),
            TokenKind::Identifier | TokenKind::Whitespace => None,
        }
    }
}

/// One run of source text sharing a token kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: TokenKind,
    pub text: String,
}

/// Java keywords plus the `true`/`false`/`null` literals, sorted
const JAVA_KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

fn is_keyword(word: &str) -> bool {
    JAVA_KEYWORDS.binary_search(&word).is_ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Scans Java source into highlighting spans.
pub fn lex_java(source: &str) -> Vec<Span> {
    let chars: Vec<char> = source.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];

        let kind = if c.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            TokenKind::Whitespace
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            TokenKind::Comment
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            TokenKind::Comment
        } else if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            if quote == '"' {
                TokenKind::StringLit
            } else {
                TokenKind::CharLit
            }
        } else if c == '@' && chars.get(i + 1).is_some_and(|&n| n.is_alphabetic()) {
            i += 1;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            TokenKind::Annotation
        } else if c.is_ascii_digit() {
            // covers hex, underscores, and float/long suffixes in one run
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            TokenKind::Number
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if is_keyword(&word) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        } else {
            i += 1;
            TokenKind::Operator
        };

        spans.push(Span {
            kind,
            text: chars[start..i].iter().collect(),
        });
    }

    spans
}
