use super::{Array, Member, Name, Node, Object, Str, Value};
use crate::core::SyntaxError;

type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Objects and arrays nested deeper than this are rejected rather than
/// risking the stack.
pub const MAX_DEPTH: usize = 128;

/// Parses a JWCC document. The whole input must be exactly one value,
/// optionally surrounded by whitespace and comments.
pub fn parse(src: &str) -> ParseResult<Value> {
    let mut p = Parser { src, pos: 0, depth: 0 };
    let value = p.value()?;
    if p.pos < src.len() {
        return Err(p.error(format!(
            "invalid character {:?} after top-level value",
            p.peek_char().unwrap_or_default()
        )));
    }
    Ok(value)
}

/// Like [`parse`], for input that has not been checked for UTF-8 yet.
pub fn parse_bytes(b: &[u8]) -> ParseResult<Value> {
    match std::str::from_utf8(b) {
        Ok(src) => parse(src),
        Err(e) => {
            let prefix = &b[..e.valid_up_to()];
            let line = prefix.iter().filter(|c| **c == b'\n').count() + 1;
            let column = prefix.iter().rev().take_while(|c| **c != b'\n').count() + 1;
            Err(SyntaxError {
                message: "invalid UTF-8".to_string(),
                offset: e.valid_up_to(),
                line,
                column,
            })
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(consumed, |i| &consumed[i + 1..])
            .chars()
            .count()
            + 1;
        SyntaxError {
            message: message.into(),
            offset: self.pos,
            line,
            column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn expect(&mut self, b: u8) -> ParseResult<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("looking for {:?}", b as char)))
        }
    }

    fn unexpected(&self, context: &str) -> SyntaxError {
        match self.peek_char() {
            Some(c) => self.error(format!("invalid character {:?} {}", c, context)),
            None => self.error(format!("unexpected end of input {}", context)),
        }
    }

    /// Consumes whitespace and comments.
    fn extra(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' => match bytes.get(self.pos + 1) {
                    Some(b'/') => {
                        self.pos = self.src[self.pos..]
                            .find('\n')
                            .map_or(self.src.len(), |n| self.pos + n);
                    }
                    Some(b'*') => match self.src[self.pos + 2..].find("*/") {
                        Some(n) => self.pos += 2 + n + 2,
                        None => return Err(self.error("unterminated block comment")),
                    },
                    _ => return Err(self.error("invalid character '/' in whitespace")),
                },
                _ => break,
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn value(&mut self) -> ParseResult<Value> {
        let before = self.extra()?;
        let node = self.node()?;
        let after = self.extra()?;
        Ok(Value {
            before,
            node,
            after,
            fresh: false,
        })
    }

    fn node(&mut self) -> ParseResult<Node> {
        match self.peek() {
            Some(b'{') => self.nested(Self::object).map(Node::Object),
            Some(b'[') => self.nested(Self::array).map(Node::Array),
            Some(b'"') => self.string().map(Node::String),
            Some(b't') => self.literal("true", Node::Bool(true)),
            Some(b'f') => self.literal("false", Node::Bool(false)),
            Some(b'n') => self.literal("null", Node::Null),
            Some(b'-' | b'0'..=b'9') => self.number().map(Node::Number),
            _ => Err(self.unexpected("looking for beginning of value")),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(format!("exceeded max nesting depth of {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn literal(&mut self, word: &str, node: Node) -> ParseResult<Node> {
        if self.src[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(node)
        } else {
            Err(self.unexpected(&format!("in literal {}", word)))
        }
    }

    fn object(&mut self) -> ParseResult<Object> {
        self.expect(b'{')?;
        let mut obj = Object::default();
        loop {
            // Reached only at the start or right after a comma.
            let before = self.extra()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                obj.trailing_comma = !obj.members.is_empty();
                obj.after = before;
                return Ok(obj);
            }
            if self.peek() != Some(b'"') {
                return Err(self.unexpected("looking for beginning of object key string"));
            }
            let key = self.string()?;
            let name_after = self.extra()?;
            if self.peek() != Some(b':') {
                return Err(self.unexpected("after object key"));
            }
            self.pos += 1;
            let value = self.value()?;
            obj.members.push(Member {
                name: Name {
                    before,
                    key,
                    after: name_after,
                },
                value,
            });
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    if let Some(last) = obj.members.last_mut() {
                        obj.after = split_closing(&mut last.value.after);
                    }
                    return Ok(obj);
                }
                _ => return Err(self.unexpected("after object key:value pair")),
            }
        }
    }

    fn array(&mut self) -> ParseResult<Array> {
        self.expect(b'[')?;
        let mut arr = Array::default();
        loop {
            let before = self.extra()?;
            if self.peek() == Some(b']') {
                self.pos += 1;
                arr.trailing_comma = !arr.elements.is_empty();
                arr.after = before;
                return Ok(arr);
            }
            let node = self.node()?;
            let after = self.extra()?;
            arr.elements.push(Value {
                before,
                node,
                after,
                fresh: false,
            });
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    if let Some(last) = arr.elements.last_mut() {
                        arr.after = split_closing(&mut last.after);
                    }
                    return Ok(arr);
                }
                _ => return Err(self.unexpected("after array element")),
            }
        }
    }

    fn string(&mut self) -> ParseResult<Str> {
        let start = self.pos;
        self.expect(b'"')?;
        let mut value = String::new();
        loop {
            let c = match self.peek_char() {
                Some(c) => c,
                None => return Err(self.error("unterminated string literal")),
            };
            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    value.push(self.escape()?);
                }
                c if (c as u32) < 0x20 => {
                    return Err(self.error(format!("invalid control character {:?} in string literal", c)))
                }
                c => {
                    self.pos += c.len_utf8();
                    value.push(c);
                }
            }
        }
        Ok(Str::from_raw(value, self.src[start..self.pos].to_string()))
    }

    fn escape(&mut self) -> ParseResult<char> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(self.error("unterminated string literal")),
        };
        self.pos += 1;
        let decoded = match c {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let hi = self.hex4()?;
                if (0xD800..0xDC00).contains(&hi) && self.src[self.pos..].starts_with("\\u") {
                    let save = self.pos;
                    self.pos += 2;
                    let lo = self.hex4()?;
                    if (0xDC00..0xE000).contains(&lo) {
                        let code = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                        return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                    self.pos = save;
                }
                char::from_u32(hi).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            other => {
                self.pos -= 1;
                return Err(self.error(format!(
                    "invalid escape character {:?} in string literal",
                    other as char
                )));
            }
        };
        Ok(decoded)
    }

    fn hex4(&mut self) -> ParseResult<u32> {
        let digits = self.src.get(self.pos..self.pos + 4).unwrap_or("");
        match u32::from_str_radix(digits, 16) {
            Ok(n) if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
                self.pos += 4;
                Ok(n)
            }
            _ => Err(self.error("invalid \\u escape in string literal")),
        }
    }

    fn number(&mut self) -> ParseResult<String> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.digits(),
            _ => return Err(self.unexpected("in numeric literal")),
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.unexpected("after decimal point in numeric literal"));
            }
            self.digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.unexpected("in exponent of numeric literal"));
            }
            self.digits();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }
}

/// Splits the extra after the last element of a composite without a
/// trailing comma: text on the element's own line stays with the element,
/// the rest belongs to the closing bracket.
fn split_closing(after: &mut String) -> String {
    match after.find('\n') {
        Some(i) => after.split_off(i),
        None => String::new(),
    }
}
