//! HTTP server lifecycle.
//!
//! Binds the API router to a TCP listener and serves until the shutdown
//! future resolves. In-flight requests are allowed to finish.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// Bind a listener on `addr`. Port 0 picks a free port.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("[server] Bound to {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve `app` on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    log::info!("[server] Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("[server] Shutdown requested");
        })
        .await?;

    log::info!("[server] Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispenserConfig;
    use crate::services::Dispenser;
    use crate::store::InMemoryStore;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serves_health_and_shuts_down() {
        let dispenser = Dispenser::new(Arc::new(InMemoryStore::new()), DispenserConfig::default());
        let app = crate::api::router(Arc::new(dispenser));

        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, app, async move {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "got: {}", response);
        assert!(response.contains(r#"{"status":"ok"}"#));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
