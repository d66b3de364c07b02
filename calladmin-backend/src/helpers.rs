use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn hash_api_key(key: &str) -> String {
  format!("{:x}", Sha256::digest(key.as_bytes()))
}

pub fn now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or_default()
}

/// Render an elapsed time as whole seconds, rounded minutes or rounded hours.
pub fn format_elapsed(secs: i64) -> String {
  let secs = secs.max(0);
  let (count, unit) = if secs < 60 {
    (secs, "second")
  } else if secs < 3600 {
    (secs.saturating_add(30) / 60, "minute")
  } else {
    (secs.saturating_add(1800) / 3600, "hour")
  };
  let plural = if count == 1 { "" } else { "s" };
  format!("{count} {unit}{plural}")
}

/// Remove `^N` color codes and control characters from game text.
pub fn strip_color_codes(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut chars = text.chars().peekable();
  while let Some(c) = chars.next() {
    if c == '^' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
      chars.next();
      continue;
    }
    if c.is_control() {
      continue;
    }
    out.push(c);
  }
  out
}
