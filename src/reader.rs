//! Reader turning s-expression text into generic [`Value`]s.

use crate::error::ReadError;
use crate::value::{Value, ValueMap};

type ReadResult<T> = std::result::Result<T, ReadError>;

/// Read exactly one form from `source`.
pub fn read_str(source: &str) -> ReadResult<Value> {
    let mut reader = Reader::new(source);
    reader.skip_ws();
    if reader.eof() {
        return Err(reader.error("unexpected end of input"));
    }
    let value = reader.read_value()?;
    reader.skip_ws();
    if !reader.eof() {
        return Err(reader.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Read every top-level form in `source`.
pub fn read_all(source: &str) -> ReadResult<Vec<Value>> {
    let mut reader = Reader::new(source);
    let mut forms = Vec::new();
    loop {
        reader.skip_ws();
        if reader.eof() {
            break;
        }
        forms.push(reader.read_value()?);
    }
    Ok(forms)
}

struct Reader<'a> {
    src: &'a str,
    bytes: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            index: 0,
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_ascii_whitespace() || ch == b',' {
                self.advance();
            } else if ch == b';' {
                while let Some(ch) = self.current() {
                    self.advance();
                    if ch == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_value(&mut self) -> ReadResult<Value> {
        self.skip_ws();
        let Some(ch) = self.current() else {
            return Err(self.error("unexpected end of input"));
        };

        match ch {
            b'(' => self.read_seq(b')').map(Value::List),
            b'[' => self.read_seq(b']').map(Value::Vector),
            b'{' => self.read_map(),
            b')' | b']' | b'}' => Err(self.error("unexpected closing delimiter")),
            b'"' => self.read_string(),
            b':' => self.read_keyword(),
            b'-' | b'+' | b'0'..=b'9' => self.read_number_or_symbol(),
            _ => self.read_symbol(),
        }
    }

    fn read_seq(&mut self, close: u8) -> ReadResult<Vec<Value>> {
        // consume the opening delimiter
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.current() {
                None => return Err(self.error("unterminated collection")),
                Some(ch) if ch == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(_) => items.push(self.read_value()?),
            }
        }
    }

    fn read_map(&mut self) -> ReadResult<Value> {
        let start = self.index;
        let items = self.read_seq(b'}')?;
        if items.len() % 2 != 0 {
            return Err(ReadError {
                message: "map literal requires an even number of forms".to_string(),
                offset: start,
            });
        }
        let mut map = ValueMap::new();
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn read_string(&mut self) -> ReadResult<Value> {
        // consume opening quote
        self.advance();
        let mut buf = Vec::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                b'"' => {
                    return String::from_utf8(buf)
                        .map(Value::String)
                        .map_err(|_| self.error("invalid UTF-8 in string literal"));
                }
                b'\\' => {
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        other => {
                            return Err(self.error(&format!("unknown escape: \\{}", other as char)));
                        }
                    };
                    buf.push(value);
                }
                _ => buf.push(ch),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn read_keyword(&mut self) -> ReadResult<Value> {
        self.advance(); // consume ':'
        let text = self.take_token();
        if text.is_empty() {
            return Err(self.error("empty keyword"));
        }
        Ok(Value::Keyword(text.to_string()))
    }

    fn read_number_or_symbol(&mut self) -> ReadResult<Value> {
        let start = self.index;
        if matches!(self.current(), Some(b'-' | b'+')) {
            self.advance();
        }
        if !self.current().is_some_and(|ch| ch.is_ascii_digit()) {
            self.index = start;
            return self.read_symbol();
        }
        self.skip_digits();

        let mut is_float = false;
        if self.current() == Some(b'.') && self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.skip_digits();
        }
        if matches!(self.current(), Some(b'e' | b'E')) {
            let mark = self.index;
            self.advance();
            if matches!(self.current(), Some(b'-' | b'+')) {
                self.advance();
            }
            if self.current().is_some_and(|ch| ch.is_ascii_digit()) {
                is_float = true;
                self.skip_digits();
            } else {
                self.index = mark;
            }
        }

        if self.current().is_some_and(is_symbol_char) {
            return Err(self.error("invalid number literal"));
        }

        let text = &self.src[start..self.index];
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error("invalid float literal"))
        } else {
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn read_symbol(&mut self) -> ReadResult<Value> {
        let text = self.take_token();
        if text.is_empty() {
            return Err(self.error("unexpected character"));
        }
        match text {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            "nil" => Ok(Value::Nil),
            _ => Ok(Value::Symbol(text.to_string())),
        }
    }

    fn skip_digits(&mut self) {
        while self.current().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
    }

    fn take_token(&mut self) -> &'a str {
        let start = self.index;
        while self.current().is_some_and(is_symbol_char) {
            self.advance();
        }
        &self.src[start..self.index]
    }

    fn error(&self, message: &str) -> ReadError {
        ReadError {
            message: message.to_string(),
            offset: self.index,
        }
    }
}

fn is_symbol_char(ch: u8) -> bool {
    match ch {
        b'(' | b')' | b'[' | b']' | b'{' | b'}' | b'"' | b';' | b',' => false,
        c if c.is_ascii_whitespace() => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_collections() {
        let value = read_str("(let [a 1 b {:k \"v\"}] (f a))").expect("read");
        let Value::List(items) = value else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::symbol("let"));
        let bindings = items[1].as_vector().expect("binding vector");
        assert_eq!(bindings.len(), 4);
        assert!(matches!(bindings[3], Value::Map(ref map) if map.len() == 1));
    }

    #[test]
    fn reads_atoms() {
        assert_eq!(read_str("nil").expect("nil"), Value::Nil);
        assert_eq!(read_str("-42").expect("int"), Value::Integer(-42));
        assert_eq!(read_str("2.5").expect("float"), Value::Float(2.5));
        assert_eq!(read_str("1e3").expect("exp"), Value::Float(1000.0));
        assert_eq!(read_str(":id").expect("kw"), Value::keyword("id"));
        assert_eq!(read_str("log-step").expect("sym"), Value::symbol("log-step"));
        assert_eq!(read_str("-").expect("minus"), Value::symbol("-"));
        assert_eq!(read_str("\"héllo\\t\"").expect("str"), Value::string("héllo\t"));
    }

    #[test]
    fn skips_comments_and_commas() {
        let forms = read_all("; header\n(f 1, 2) ; trailing\n[3]").expect("read");
        assert_eq!(forms.len(), 2);
        assert_eq!(
            forms[0],
            Value::list([Value::symbol("f"), Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn reports_offsets_for_errors() {
        let err = read_str("(f 1").expect_err("unterminated");
        assert_eq!(err.message, "unterminated collection");
        assert_eq!(err.offset, 4);

        let err = read_str("{:a}").expect_err("odd map");
        assert_eq!(err.offset, 0);

        assert!(read_str("12abc").is_err());
        assert!(read_str("(f) (g)").is_err());
        assert!(read_str("   ").is_err());
    }
}
