//! Scripted SMTP server used by the probe, orchestrator and engine tests.

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// What the server does with a client line: send a reply, or hang up.
pub(crate) type Handler = dyn Fn(&str) -> Option<String> + Send + Sync;

pub(crate) struct FakeSmtpServer {
    pub(crate) addr: SocketAddr,
    pub(crate) transcript: Arc<Mutex<Vec<String>>>,
    pub(crate) connections: Arc<AtomicUsize>,
}

impl FakeSmtpServer {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.transcript.lock().clone()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Starts a server on `bind` (`"127.0.0.1:0"` for an ephemeral port).
///
/// `greeting` of `None` accepts connections but never says anything. `QUIT`
/// is always answered with `221` and closes the session.
pub(crate) async fn spawn<F>(
    bind: &str,
    greeting: Option<&'static str>,
    handler: F,
) -> FakeSmtpServer
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind(bind).await.expect("bind fake smtp server");
    let addr = listener.local_addr().expect("local addr");
    let transcript = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));
    let handler: Arc<Handler> = Arc::new(handler);

    let server = FakeSmtpServer {
        addr,
        transcript: Arc::clone(&transcript),
        connections: Arc::clone(&connections),
    };

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            connections.fetch_add(1, Ordering::SeqCst);
            let transcript = Arc::clone(&transcript);
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let Some(greeting) = greeting else {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    return;
                };
                if write_half.write_all(crlf(greeting).as_bytes()).await.is_err() {
                    return;
                }

                let mut reader = BufReader::new(read_half);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    let line = line.trim_end().to_string();
                    transcript.lock().push(line.clone());

                    if line.eq_ignore_ascii_case("QUIT") {
                        let _ = write_half.write_all(b"221 2.0.0 Bye\r\n").await;
                        return;
                    }
                    match handler(&line) {
                        Some(reply) => {
                            if write_half.write_all(crlf(&reply).as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
            });
        }
    });

    server
}

/// A well-behaved server whose RCPT replies come from `rcpt`.
pub(crate) async fn spawn_rcpt<F>(bind: &str, rcpt: F) -> FakeSmtpServer
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    spawn(bind, Some("220 mx.test ESMTP ready"), move |line| {
        let upper = line.to_ascii_uppercase();
        let reply = if upper.starts_with("EHLO") {
            "250-mx.test\r\n250-PIPELINING\r\n250 SIZE 10240000".to_string()
        } else if upper.starts_with("HELO") || upper.starts_with("MAIL FROM") {
            "250 2.1.0 OK".to_string()
        } else if upper.starts_with("RCPT TO") {
            rcpt(line)
        } else {
            "502 5.5.2 Command not recognized".to_string()
        };
        Some(reply)
    })
    .await
}

/// Returns true when the RCPT line names the fabricated catch-all address.
pub(crate) fn is_fabricated(line: &str) -> bool {
    line.contains("no-reply-does-not-exist-")
}

/// Allocates a port on 127.0.0.1 and returns it once the listener is closed,
/// so connecting to it is refused.
pub(crate) async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr").port()
}

fn crlf(reply: &str) -> String {
    format!("{}\r\n", reply.trim_end_matches("\r\n"))
}
