//! Response framing and the `key=value` field grammar.

use std::collections::BTreeMap;

use crate::error::{QueryError, Result};
use crate::escape::{Value, unescape};

/// Field name to decoded value for one record.
pub type Fields = BTreeMap<String, Value>;

const STATUS_SEPARATOR: &[u8] = b"error id=";

/// Parsed body of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
  Single(Fields),
  List(Vec<Fields>),
}

impl CommandResult {
  /// Records in order; a single result yields one record.
  pub fn records(&self) -> &[Fields] {
    match self {
      CommandResult::Single(fields) => std::slice::from_ref(fields),
      CommandResult::List(records) => records,
    }
  }

  pub fn into_records(self) -> Vec<Fields> {
    match self {
      CommandResult::Single(fields) => vec![fields],
      CommandResult::List(records) => records,
    }
  }
}

/// The trailing `error id=.. msg=..` record of every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
  pub id: i64,
  pub message: String,
  pub extra: Fields,
}

impl Status {
  pub fn is_ok(&self) -> bool {
    self.id == 0
  }

  pub fn into_result(self) -> Result<Status> {
    if self.is_ok() {
      return Ok(self);
    }
    Err(QueryError::Server {
      code: self.id,
      message: self.message,
      extra: self.extra,
    })
  }
}

/// A fully parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub result: CommandResult,
  pub status: Status,
}

/// Parse the raw bytes read for `command`, failing on a non-zero status.
pub fn parse_response(command: &str, raw: &[u8]) -> Result<Response> {
  let pos = find(raw, STATUS_SEPARATOR)
    .ok_or_else(|| QueryError::MalformedResponse(String::from_utf8_lossy(raw).into_owned()))?;

  let mut fragment = b"id=".to_vec();
  fragment.extend_from_slice(&raw[pos + STATUS_SEPARATOR.len()..]);
  let status = parse_status(&fragment)?.into_result()?;

  Ok(Response {
    result: parse_body(command, &raw[..pos]),
    status,
  })
}

/// Split a body into records. `*list` commands and multi-record bodies are lists.
pub fn parse_body(command: &str, body: &[u8]) -> CommandResult {
  let mut records: Vec<Fields> = body.split(|&b| b == b'|').map(parse_fields).collect();

  if command.ends_with("list") || records.len() > 1 {
    CommandResult::List(records)
  } else {
    CommandResult::Single(records.pop().unwrap_or_default())
  }
}

/// Parse a status fragment. The `id` field must be numeric.
pub fn parse_status(fragment: &[u8]) -> Result<Status> {
  let extra = parse_fields(fragment);
  let id = extra
    .get("id")
    .and_then(Value::as_int)
    .ok_or(QueryError::MalformedStatus)?;
  let message = extra.get("msg").map(Value::to_string).unwrap_or_default();

  Ok(Status { id, message, extra })
}

/// Tokenize on whitespace and `|`, then split each token at its first `key=`.
///
/// Keys are runs of ASCII word characters; a token such as `-flag=1` yields
/// the key `flag`. Tokens without a key are ignored.
pub fn parse_fields(record: &[u8]) -> Fields {
  let mut fields = Fields::new();
  for token in record.split(|&b| is_separator(b)) {
    if let Some((key, value)) = split_token(token) {
      fields.insert(key, unescape(value));
    }
  }
  fields
}

fn split_token(token: &[u8]) -> Option<(String, &[u8])> {
  for (eq, _) in token.iter().enumerate().filter(|&(_, &b)| b == b'=') {
    let prefix = &token[..eq];
    let start = prefix
      .iter()
      .rposition(|&b| !is_word(b))
      .map_or(0, |p| p + 1);
    if start < eq {
      let key = String::from_utf8_lossy(&prefix[start..]).into_owned();
      return Some((key, &token[eq + 1..]));
    }
  }
  None
}

fn is_separator(b: u8) -> bool {
  matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c | b'|')
}

fn is_word(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  if needle.is_empty() || haystack.len() < needle.len() {
    return None;
  }
  haystack.windows(needle.len()).position(|w| w == needle)
}
