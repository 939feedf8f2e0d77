// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener`.
///
/// Each connection is served in its own task. When `shutdown` resolves the
/// loop stops accepting and returns; connections still in flight are not
/// waited for.
pub async fn run<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use std::net::SocketAddr;
    use std::path::Path;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    type Server = (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<(), String>>);

    fn site_config(root: &Path) -> Config {
        let mut cfg = Config::load_from("does-not-exist-coi-server").unwrap();
        cfg.site.root = root.to_string_lossy().into_owned();
        cfg.logging.access_log = false;
        cfg
    }

    fn spawn_server(cfg: &Config) -> Server {
        let state = Arc::new(AppState::new(cfg));
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            run(listener, state, async {
                let _ = stop_rx.await;
            })
            .await
            .map_err(|e| e.to_string())
        });
        (addr, stop_tx, server)
    }

    async fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("demo")).unwrap();
        std::fs::write(tmp.path().join("demo/streaming.html"), "<p>demo</p>").unwrap();
        let (addr, stop_tx, server) = spawn_server(&site_config(tmp.path()));

        let ok = raw_request(
            addr,
            "GET /demo/streaming.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        let ok_lower = ok.to_lowercase();
        assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
        assert!(ok_lower.contains("cross-origin-opener-policy: same-origin"));
        assert!(ok_lower.contains("cross-origin-embedder-policy: require-corp"));
        assert!(ok.ends_with("<p>demo</p>"));

        let missing = raw_request(
            addr,
            "GET /does-not-exist HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        let missing_lower = missing.to_lowercase();
        assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");
        assert!(missing_lower.contains("cross-origin-opener-policy: same-origin"));
        assert!(missing_lower.contains("cross-origin-embedder-policy: require-corp"));

        stop_tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_idle_connection_closed_after_keep_alive_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = site_config(tmp.path());
        cfg.performance.keep_alive_timeout = 1;
        let (addr, stop_tx, server) = spawn_server(&cfg);

        // Headers never finish, so the server must give up on its own
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        let mut buf = Vec::new();
        let closed = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            stream.read_to_end(&mut buf),
        )
        .await;
        assert!(closed.is_ok(), "idle connection was not closed");

        stop_tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_malformed_request_is_rejected_by_hyper() {
        let tmp = tempfile::tempdir().unwrap();
        let (addr, stop_tx, server) = spawn_server(&site_config(tmp.path()));

        let bad = raw_request(addr, "GET / HTTP/1.1\r\nHost localhost\r\n\r\n").await;
        assert!(bad.starts_with("HTTP/1.1 400"), "{bad}");
        // Never reaches the handler, so no isolation headers
        assert!(!bad.to_lowercase().contains("cross-origin-opener-policy"));

        stop_tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }
}
