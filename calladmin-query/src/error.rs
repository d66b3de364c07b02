use thiserror::Error;

use crate::response::Fields;

/// Status code the query interface returns when the client address is banned.
pub const IP_BANNED: i64 = 3329;

#[derive(Debug, Error)]
pub enum QueryError {
  #[error("could not connect to the query interface at {addr}: {source}")]
  Unreachable {
    addr: String,
    #[source]
    source: std::io::Error,
  },

  #[error("not a query interface")]
  NotQueryInterface,

  #[error("not connected to the query interface")]
  NotConnected,

  #[error("query connection error: {0}")]
  Io(#[from] std::io::Error),

  #[error("timed out waiting for the query interface")]
  Timeout,

  #[error("malformed response: {0:?}")]
  MalformedResponse(String),

  #[error("malformed status")]
  MalformedStatus,

  #[error("ID {code} ({message})")]
  Server {
    code: i64,
    message: String,
    extra: Fields,
  },
}

impl QueryError {
  /// Transport-level failure: refused, reset, unreachable, banner mismatch or timeout.
  pub fn is_connection_error(&self) -> bool {
    matches!(
      self,
      QueryError::Unreachable { .. }
        | QueryError::NotQueryInterface
        | QueryError::NotConnected
        | QueryError::Io(_)
        | QueryError::Timeout
    )
  }

  /// Framing or status failure reported by (or parsed from) the server.
  pub fn is_protocol_error(&self) -> bool {
    !self.is_connection_error()
  }

  /// Numeric status id, when the server answered with one.
  pub fn code(&self) -> Option<i64> {
    match self {
      QueryError::Server { code, .. } => Some(*code),
      _ => None,
    }
  }

  pub fn is_ip_banned(&self) -> bool {
    self.code() == Some(IP_BANNED)
  }
}

pub type Result<T> = std::result::Result<T, QueryError>;
