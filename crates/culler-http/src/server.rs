//! Control-plane listener

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::{HttpError, HttpResult};

/// Bound control-plane listener
pub struct ControlServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ControlServer {
    /// Bind the listening socket. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr) -> HttpResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Control plane listening");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve `router` until `shutdown` resolves, then drain open requests
    pub async fn serve<F>(self, router: Router, shutdown: F) -> HttpResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| HttpError::ServerError(e.to_string()))?;

        info!(addr = %self.local_addr, "Control plane stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlState, TokenAuth, control_router};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let server = ControlServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        let router = control_router(ControlState::default(), "/", TokenAuth::disabled());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(router, async {
            let _ = rx.await;
        }));

        let stream = tokio::net::TcpStream::connect(addr).await;
        assert!(stream.is_ok());
        drop(stream);

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
