use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::BencodeError;
use super::value::Value;

const MAX_DEPTH: usize = 64;

/// Decodes a byte slice containing exactly one bencode value.
///
/// Any bytes after the value are an error; use [`decode_prefix`] when the
/// value is followed by unrelated data.
///
/// # Errors
///
/// Returns [`BencodeError`] on truncated input, malformed integers or
/// length prefixes, unterminated containers, non-string dictionary keys,
/// nesting deeper than 64 levels, or trailing data.
///
/// # Examples
///
/// ```
/// use btget::bencode::decode;
///
/// let value = decode(b"i52e").unwrap();
/// assert_eq!(value.as_integer(), Some(52));
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;
    if consumed != data.len() {
        return Err(BencodeError::TrailingData);
    }
    Ok(value)
}

/// Decodes one bencode value from the front of a byte slice.
///
/// Returns the value together with the number of bytes it occupied. This
/// is what the ut_metadata data message needs: its payload is a bencoded
/// dictionary immediately followed by raw metadata bytes.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut cursor = Cursor { data, pos: 0 };
    let value = cursor.value(0)?;
    Ok((value, cursor.pos))
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            b'0'..=b'9' => self.byte_string().map(Value::Bytes),
            c => Err(BencodeError::UnexpectedByte(c)),
        }
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof)
    }

    fn take_until(&mut self, terminator: u8) -> Result<&[u8], BencodeError> {
        let start = self.pos;
        while self.peek()? != terminator {
            self.pos += 1;
        }
        let slice = &self.data[start..self.pos];
        self.pos += 1;
        Ok(slice)
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        self.pos += 1;
        let digits = self.take_until(b'e')?;
        let text = std::str::from_utf8(digits)
            .map_err(|_| BencodeError::InvalidInteger("not ascii".into()))?;

        if text.is_empty() {
            return Err(BencodeError::InvalidInteger("empty".into()));
        }
        // i-0e and zero-padded integers are not canonical and are rejected.
        if text == "-0" || (text.len() > 1 && (text.starts_with('0') || text.starts_with("-0"))) {
            return Err(BencodeError::InvalidInteger(text.into()));
        }

        let value = text
            .parse::<i64>()
            .map_err(|_| BencodeError::InvalidInteger(text.into()))?;
        Ok(Value::Integer(value))
    }

    fn byte_string(&mut self) -> Result<Bytes, BencodeError> {
        let digits = self.take_until(b':')?;
        let len = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(BencodeError::InvalidLength)?;

        if len > self.data.len() - self.pos {
            return Err(BencodeError::UnexpectedEof);
        }
        let bytes = Bytes::copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(bytes)
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.pos += 1;
        Ok(Value::List(items))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut entries = BTreeMap::new();
        while self.peek()? != b'e' {
            match self.peek()? {
                b'0'..=b'9' => {}
                c => return Err(BencodeError::InvalidDictKey(c)),
            }
            let key = self.byte_string()?;
            let value = self.value(depth + 1)?;
            entries.insert(key, value);
        }
        self.pos += 1;
        Ok(Value::Dict(entries))
    }
}
