#![allow(dead_code)]

use calladmin_backend::broadcaster::{AdminRequestBroadcaster, QuerySettings};
use calladmin_query::{Value, parse_fields};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const GREETING: &[u8] = b"TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface, type \"help\" for a list of commands and \"help <command>\" for information on a specific command.\n\r";
const OK: &[u8] = b"error id=0 msg=ok\n\r";

pub const BANNED: &str = "error id=3329 msg=connection\\sfailed,\\syou\\sare\\sbanned extra_msg=you\\smay\\sretry\\sin\\s600\\sseconds";

/// A query endpoint that accepts any login and records every text message.
pub struct FakeQueryServer {
    pub addr: SocketAddr,
    messages: Arc<Mutex<Vec<String>>>,
    login_error: Arc<Mutex<Option<String>>>,
}

impl FakeQueryServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake query server");
        let addr = listener.local_addr().unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let login_error = Arc::new(Mutex::new(None));

        let (m, e) = (Arc::clone(&messages), Arc::clone(&login_error));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle(socket, Arc::clone(&m), Arc::clone(&e)));
            }
        });

        Self {
            addr,
            messages,
            login_error,
        }
    }

    pub fn settings(&self) -> QuerySettings {
        QuerySettings {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            server_id: 1,
            username: "serveradmin".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn broadcaster(&self, cooldown: i64, admin_level: u32) -> AdminRequestBroadcaster {
        AdminRequestBroadcaster::new(self.settings(), "^1Urban ^7Zone", cooldown, admin_level)
    }

    /// Answer every later login with `status` and hang up.
    pub fn fail_login(&self, status: &str) {
        *self.login_error.lock().unwrap() = Some(status.to_string());
    }

    pub fn accept_login(&self) {
        *self.login_error.lock().unwrap() = None;
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

async fn handle(
    socket: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    login_error: Arc<Mutex<Option<String>>>,
) {
    let (read, mut write) = socket.into_split();
    if write.write_all(GREETING).await.is_err() {
        return;
    }

    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.starts_with("quit") {
            return;
        }
        if line.starts_with("login") {
            let error = login_error.lock().unwrap().clone();
            if let Some(status) = error {
                let _ = write.write_all(format!("{status}\n\r").as_bytes()).await;
                return;
            }
        }
        if line.starts_with("sendtextmessage") {
            if let Some(Value::Str(msg)) = parse_fields(line.as_bytes()).remove("msg") {
                messages.lock().unwrap().push(msg);
            }
        }
        if write.write_all(OK).await.is_err() {
            return;
        }
    }
}

/// Settings pointing at a port nothing listens on.
pub async fn unreachable_settings() -> QuerySettings {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    QuerySettings {
        host: addr.ip().to_string(),
        port: addr.port(),
        server_id: 1,
        username: "serveradmin".to_string(),
        password: "secret".to_string(),
        timeout: Duration::from_millis(500),
    }
}
