//! Value encoding used on the query wire.
//!
//! Only three characters are escaped: `/`, space and `|`. Backslash itself is
//! sent as-is, so values containing a literal `\s`, `\p` or `\/` do not survive
//! a round trip. Carriage returns and newlines are dropped on decode.

use std::fmt;

/// A scalar parameter or field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Int(i64),
  Str(String),
}

impl Value {
  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      Value::Str(_) => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      Value::Int(_) => None,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Int(i) => write!(f, "{i}"),
      Value::Str(s) => f.write_str(s),
    }
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Int(i)
  }
}

impl From<u32> for Value {
  fn from(i: u32) -> Self {
    Value::Int(i64::from(i))
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Str(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Str(s)
  }
}

/// Encode a value for a command line.
pub fn escape(value: &Value) -> String {
  match value {
    Value::Int(i) => i.to_string(),
    Value::Str(s) => s
      .replace('/', "\\/")
      .replace(' ', "\\s")
      .replace('|', "\\p"),
  }
}

/// Decode a raw field value, yielding an integer when the text parses as one.
pub fn unescape(raw: &[u8]) -> Value {
  let text = String::from_utf8_lossy(raw)
    .replace("\\/", "/")
    .replace("\\s", " ")
    .replace("\\p", "|")
    .replace(['\n', '\r'], "");

  match text.trim().parse::<i64>() {
    Ok(i) => Value::Int(i),
    Err(_) => Value::Str(text),
  }
}
