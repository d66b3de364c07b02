mod error;
mod escape;
mod response;

pub use error::{IP_BANNED, QueryError, Result};
pub use escape::{Value, escape, unescape};
pub use response::{
  CommandResult, Fields, Response, Status, parse_body, parse_fields, parse_response, parse_status,
};

use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info};

use response::find;

/// Default query port of the voice server.
pub const DEFAULT_PORT: u16 = 10011;

/// Limit applied to connecting and to every response read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const BANNER: &[u8] = b"TS3";
const RESPONSE_MARKER: &[u8] = b"msg=ok";
const STATUS_MARKER: &[u8] = b"error id=";
const QUIT: &[u8] = b"quit \n";

/// Progress of a session. Only moves forward; any failure drops back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Disconnected,
  Connected,
  Authenticated,
  ServerSelected,
}

/// Target modes accepted by `sendtextmessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTarget {
  Client = 1,
  Channel = 2,
  Server = 3,
}

/// Bytes read for one exchange.
enum Frame {
  Complete(Vec<u8>),
  TimedOut(Vec<u8>),
  Closed(Vec<u8>),
}

struct Session {
  stream: TcpStream,
  buf: Vec<u8>,
  state: ConnectionState,
}

impl Session {
  /// Read until `marker` shows up or the deadline passes. Bytes after the
  /// marker stay buffered for the next exchange.
  async fn read_until(&mut self, marker: &[u8], limit: Duration) -> io::Result<Frame> {
    let deadline = Instant::now() + limit;
    let mut from = 0;
    let mut chunk = [0u8; 4096];

    loop {
      if let Some(pos) = find(&self.buf[from..], marker) {
        let end = from + pos + marker.len();
        let frame: Vec<u8> = self.buf.drain(..end).collect();
        return Ok(Frame::Complete(frame));
      }
      from = self.buf.len().saturating_sub(marker.len() - 1);

      match timeout_at(deadline, self.stream.read(&mut chunk)).await {
        Err(_) => return Ok(Frame::TimedOut(std::mem::take(&mut self.buf))),
        Ok(Ok(0)) => return Ok(Frame::Closed(std::mem::take(&mut self.buf))),
        Ok(Ok(n)) => self.buf.extend_from_slice(&chunk[..n]),
        Ok(Err(e)) => return Err(e),
      }
    }
  }

  /// Write one command line and read its response.
  async fn exchange(&mut self, command: &str, line: &str, limit: Duration) -> Result<Response> {
    self.stream.write_all(line.as_bytes()).await?;

    match self.read_until(RESPONSE_MARKER, limit).await? {
      Frame::Complete(raw) => parse_response(command, &raw),
      // Error responses carry no `msg=ok`; the status is still in what was read.
      Frame::TimedOut(raw) | Frame::Closed(raw) if find(&raw, STATUS_MARKER).is_some() => {
        self.state = ConnectionState::Disconnected;
        parse_response(command, &raw)
      }
      Frame::TimedOut(_) => Err(QueryError::Timeout),
      Frame::Closed(_) => Err(QueryError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed by the query interface",
      ))),
    }
  }

  async fn close(mut self, limit: Duration) {
    let _ = timeout(limit, self.stream.write_all(QUIT)).await;
    let _ = self.stream.shutdown().await;
  }
}

/// Client for the voice server's text query interface.
///
/// One command is in flight per session: the protocol has no request ids, so
/// the write and the read of its response happen under a single lock.
pub struct ServerQuery {
  host: String,
  port: u16,
  timeout: Duration,
  session: Mutex<Option<Session>>,
}

impl ServerQuery {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
      timeout: DEFAULT_TIMEOUT,
      session: Mutex::new(None),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn addr(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }

  pub async fn state(&self) -> ConnectionState {
    self
      .session
      .lock()
      .await
      .as_ref()
      .map_or(ConnectionState::Disconnected, |s| s.state)
  }

  /// Open the connection and wait for the banner. An existing session is closed first.
  pub async fn connect(&self) -> Result<()> {
    let mut guard = self.session.lock().await;
    if let Some(old) = guard.take() {
      old.close(self.timeout).await;
    }

    let addr = self.addr();
    let stream = match timeout(self.timeout, TcpStream::connect(&addr)).await {
      Ok(Ok(stream)) => stream,
      Ok(Err(source)) => return Err(QueryError::Unreachable { addr, source }),
      Err(_) => return Err(QueryError::Timeout),
    };

    let mut session = Session {
      stream,
      buf: Vec::with_capacity(4096),
      state: ConnectionState::Connected,
    };

    match session.read_until(BANNER, self.timeout).await {
      Ok(Frame::Complete(_)) => {}
      Ok(_) | Err(_) => return Err(QueryError::NotQueryInterface),
    }

    info!(%addr, "connected to query interface");
    *guard = Some(session);
    Ok(())
  }

  /// Send `quit` and close. Does nothing when not connected.
  pub async fn disconnect(&self) {
    if let Some(session) = self.session.lock().await.take() {
      session.close(self.timeout).await;
      debug!(addr = %self.addr(), "disconnected from query interface");
    }
  }

  /// Run a raw command.
  pub async fn command(
    &self,
    name: &str,
    params: &[(&str, Value)],
    options: &[&str],
  ) -> Result<CommandResult> {
    self.run(name, params, options, None).await
  }

  pub async fn login(&self, username: &str, password: &str) -> Result<()> {
    self
      .run(
        "login",
        &[
          ("client_login_name", Value::from(username)),
          ("client_login_password", Value::from(password)),
        ],
        &[],
        Some(ConnectionState::Authenticated),
      )
      .await?;
    Ok(())
  }

  /// Select the virtual server commands apply to.
  pub async fn select_server(&self, server_id: u32) -> Result<()> {
    self
      .run(
        "use",
        &[("sid", Value::from(server_id))],
        &[],
        Some(ConnectionState::ServerSelected),
      )
      .await?;
    Ok(())
  }

  pub async fn send_text_message(&self, target: TextTarget, target_id: i64, msg: &str) -> Result<()> {
    self
      .run(
        "sendtextmessage",
        &[
          ("targetmode", Value::Int(target as i64)),
          ("target", Value::Int(target_id)),
          ("msg", Value::from(msg)),
        ],
        &[],
        None,
      )
      .await?;
    Ok(())
  }

  async fn run(
    &self,
    name: &str,
    params: &[(&str, Value)],
    options: &[&str],
    next: Option<ConnectionState>,
  ) -> Result<CommandResult> {
    let line = build_command(name, params, options);

    let mut guard = self.session.lock().await;
    let session = guard.as_mut().ok_or(QueryError::NotConnected)?;

    debug!(command = name, "sending query command");
    let outcome = session.exchange(name, &line, self.timeout).await;

    match outcome {
      Ok(response) if session.state != ConnectionState::Disconnected => {
        if let Some(next) = next {
          session.state = next;
        }
        Ok(response.result)
      }
      Ok(_) => {
        guard.take();
        Err(QueryError::Timeout)
      }
      Err(e) => {
        guard.take();
        Err(e)
      }
    }
  }
}

/// Build `name key=value.. -option..\n`.
pub fn build_command(name: &str, params: &[(&str, Value)], options: &[&str]) -> String {
  let mut line = name.to_string();
  for (key, value) in params {
    line.push(' ');
    line.push_str(key);
    line.push('=');
    line.push_str(&escape(value));
  }
  for option in options {
    line.push_str(" -");
    line.push_str(option);
  }
  line.push('\n');
  line
}
