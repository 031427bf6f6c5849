//! Tag tokenizer — splits raw LLM text into tag and text tokens.
//!
//! This is deliberately not XML: model output interleaves prose with
//! loosely-formed tags, so anything that does not scan as a complete tag
//! (`<name>`, `</name>`, `<name attr="v"/>`) is kept as literal text.
//! Every token retains its raw slice so callers can reconstruct the
//! original text of any region verbatim.

/// What a token is.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<name>` — opening tag. Attributes on a non-self-closing tag are
    /// accepted but dropped; the grammar never uses them.
    Open(String),
    /// `</name>` — closing tag.
    Close(String),
    /// `<name attr="value" …/>` — self-closing tag with attributes.
    SelfClose {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// A run of literal text.
    Text,
}

/// One token plus the raw input slice it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: String,
}

impl Token {
    fn text(raw: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Text,
            raw: raw.into(),
        }
    }
}

/// Tokenize raw text. Consecutive literal runs are coalesced into a
/// single `Text` token.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut text_buf = String::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < input.len() {
        if bytes[pos] == b'<' {
            if let Some((token, consumed)) = scan_tag(&input[pos..]) {
                if !text_buf.is_empty() {
                    tokens.push(Token::text(std::mem::take(&mut text_buf)));
                }
                tokens.push(token);
                pos += consumed;
                continue;
            }
            // Not a well-formed tag: the '<' is literal.
            text_buf.push('<');
            pos += 1;
        } else {
            // Advance one full character.
            let ch = input[pos..].chars().next().unwrap_or('\u{FFFD}');
            text_buf.push(ch);
            pos += ch.len_utf8();
        }
    }

    if !text_buf.is_empty() {
        tokens.push(Token::text(text_buf));
    }

    tokens
}

/// Try to scan one complete tag at the start of `input` (which begins
/// with '<'). Returns the token and the number of bytes consumed, or
/// `None` if the region does not form a tag.
fn scan_tag(input: &str) -> Option<(Token, usize)> {
    let mut chars = input.char_indices().peekable();
    chars.next(); // consume '<'

    let closing = match chars.peek() {
        Some((_, '/')) => {
            chars.next();
            true
        }
        _ => false,
    };

    // Tag name: [A-Za-z_][A-Za-z0-9_]*
    let name_start = chars.peek().map(|(i, _)| *i)?;
    match chars.peek() {
        Some((_, c)) if c.is_ascii_alphabetic() || *c == '_' => {}
        _ => return None,
    }
    let mut name_end = name_start;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name_end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    let name = input[name_start..name_end].to_string();

    if closing {
        // Optional whitespace, then '>'.
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        return match chars.next() {
            Some((i, '>')) => Some((
                Token {
                    kind: TokenKind::Close(name),
                    raw: input[..i + 1].to_string(),
                },
                i + 1,
            )),
            _ => None,
        };
    }

    // Attributes, then '>', or '/>'.
    let mut attrs: Vec<(String, String)> = Vec::new();
    loop {
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        match chars.peek().copied() {
            Some((i, '>')) => {
                chars.next();
                let kind = TokenKind::Open(name);
                return Some((
                    Token {
                        kind,
                        raw: input[..i + 1].to_string(),
                    },
                    i + 1,
                ));
            }
            Some((_, '/')) => {
                chars.next();
                return match chars.next() {
                    Some((j, '>')) => Some((
                        Token {
                            kind: TokenKind::SelfClose { name, attrs },
                            raw: input[..j + 1].to_string(),
                        },
                        j + 1,
                    )),
                    _ => None,
                };
            }
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {
                // attr name
                let attr_start = chars.peek().map(|(i, _)| *i)?;
                let mut attr_end = attr_start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        attr_end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let attr_name = input[attr_start..attr_end].to_string();

                // '='
                match chars.next() {
                    Some((_, '=')) => {}
                    _ => return None,
                }
                // '"'
                match chars.next() {
                    Some((_, '"')) => {}
                    _ => return None,
                }
                // value until closing '"'
                let value_start = chars.peek().map(|(i, _)| *i)?;
                let mut value_end = None;
                for (i, c) in chars.by_ref() {
                    if c == '"' {
                        value_end = Some(i);
                        break;
                    }
                }
                let value_end = value_end?;
                attrs.push((attr_name, input[value_start..value_end].to_string()));
            }
            _ => return None,
        }
    }
}

/// Split a trailing integer off a tag name: `"hitpoint12"` →
/// `("hitpoint", Some(12))`, `"title"` → `("title", None)`.
pub fn split_tag_suffix(name: &str) -> (&str, Option<u32>) {
    let digits_at = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    match digits_at {
        Some(i) if i > 0 => {
            let (prefix, digits) = name.split_at(i);
            (prefix, digits.parse().ok())
        }
        _ => (name, None),
    }
}

/// Remove all tag markup, keeping only the literal text runs.
pub fn strip_tags(input: &str) -> String {
    tokenize(input)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Text)
        .map(|t| t.raw)
        .collect()
}

/// Find the first matching `Close(name)` at or after `start`.
pub(crate) fn find_close(tokens: &[Token], start: usize, name: &str) -> Option<usize> {
    tokens[start..]
        .iter()
        .position(|t| matches!(&t.kind, TokenKind::Close(n) if n == name))
        .map(|i| start + i)
}
