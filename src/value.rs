//! Generic nested data produced by the reader.
//!
//! A [`Value`] is the untyped form of tasklang source: atoms, lists (code),
//! vectors (literal data and binding groups) and maps. The transformer reads
//! these values without mutating them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Untyped s-expression data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// The `nil` atom.
    Nil,
    /// Boolean literal.
    Boolean(bool),
    /// Signed integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// UTF-8 string literal.
    String(String),
    /// A bare symbol.
    Symbol(String),
    /// Keyword (stored without the leading colon).
    Keyword(String),
    /// Parenthesised list, semantically code.
    List(Vec<Value>),
    /// Bracketed vector, semantically data or a binding group.
    Vector(Vec<Value>),
    /// Braced map.
    Map(ValueMap),
}

impl Value {
    /// Build a symbol value.
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Build a keyword value from its name (no leading colon).
    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }

    /// Build a string value.
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Build a vector value.
    pub fn vector(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Vector(items.into_iter().collect())
    }

    /// Symbol name, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Keyword name, if this is a keyword.
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Value::Keyword(name) => Some(name),
            _ => None,
        }
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Vector items, if this is a vector.
    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Check whether this value is exactly the keyword `:name`.
    pub fn is_keyword(&self, name: &str) -> bool {
        self.as_keyword() == Some(name)
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Boolean(flag) => write!(f, "{}", flag),
            Value::Integer(num) => write!(f, "{}", num),
            // Debug keeps a trailing `.0` so the text reads back as a float.
            Value::Float(num) => write!(f, "{:?}", num),
            Value::String(text) => write_escaped(f, text),
            Value::Symbol(name) => f.write_str(name),
            Value::Keyword(name) => write!(f, ":{}", name),
            Value::List(items) => write_seq(f, "(", items, ")"),
            Value::Vector(items) => write_seq(f, "[", items, "]"),
            Value::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{} {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

/// Map of generic values. Entry order is kept for display but ignored by
/// equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueMap(Vec<(Value, Value)>);

impl ValueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any existing value under an equal key.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up the value stored under the keyword `:name`.
    pub fn get_keyword(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k.is_keyword(name))
            .map(|(_, v)| v)
    }

    /// Check whether the keyword `:name` is present as a key.
    pub fn contains_keyword(&self, name: &str) -> bool {
        self.get_keyword(name).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.0.iter().map(|(k, v)| (k, v))
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_equality_ignores_insertion_order() {
        let left: ValueMap = [
            (Value::keyword("a"), Value::Integer(1)),
            (Value::keyword("b"), Value::Integer(2)),
        ]
        .into_iter()
        .collect();
        let right: ValueMap = [
            (Value::keyword("b"), Value::Integer(2)),
            (Value::keyword("a"), Value::Integer(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(left, right);
    }

    #[test]
    fn insert_replaces_equal_key() {
        let mut map = ValueMap::new();
        map.insert(Value::keyword("id"), Value::Integer(1));
        map.insert(Value::keyword("id"), Value::Integer(2));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_keyword("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn display_renders_sexpr_text() {
        let value = Value::list([
            Value::symbol("f"),
            Value::keyword("k"),
            Value::string("a \"b\"\n"),
            Value::vector([Value::Integer(1), Value::Float(2.0), Value::Nil]),
        ]);
        assert_eq!(value.to_string(), "(f :k \"a \\\"b\\\"\\n\" [1 2.0 nil])");
    }
}
