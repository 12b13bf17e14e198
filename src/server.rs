//! Listener/acceptor
//!
//! Binds the relay port and spawns one session task per accepted socket.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::broadcast::Broadcaster;
use crate::connection::Connection;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;
use crate::sink::{Event, SharedSink};

/// Port the relay listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 5000;

/// A bound relay server
pub struct Server {
    listener: TcpListener,
    registry: Registry,
    broadcaster: Broadcaster,
    sink: SharedSink,
}

impl Server {
    /// Bind the listening socket and start the registry
    ///
    /// A bind failure is reported to `sink` as an error status and
    /// returned as [`AppError::Bind`]. It is not retried.
    pub async fn bind(addr: &str, sink: SharedSink) -> Result<Self, AppError> {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = AppError::Bind {
                    addr: addr.to_string(),
                    source,
                };
                error!("{}", err);
                sink.emit(Event::error(err.to_string()));
                return Err(err);
            }
        };

        let registry = Registry::spawn(sink.clone());

        Ok(Self {
            listener,
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            sink,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Address clients should dial
    ///
    /// A wildcard bind is replaced by this machine's first non-loopback
    /// IPv4 address, or loopback if there is none.
    pub fn advertised_addr(&self) -> std::io::Result<SocketAddr> {
        let bound = self.local_addr()?;
        Ok(advertise(bound, || local_ip_address::local_ip().ok()))
    }

    /// Registry of this server's sessions
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// A failed accept is reported and accepting continues. Sessions that
    /// are already running are left alone.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        match self.advertised_addr() {
            Ok(addr) => {
                info!("Chat relay listening on {}", addr);
                self.sink
                    .emit(Event::status(format!("Server started on {}", addr)));
            }
            Err(e) => warn!("Listening on unknown address: {}", e),
        }

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_session(stream, addr),
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        self.sink
                            .emit(Event::error(format!("Failed to accept connection: {}", e)));
                    }
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        let connection = Connection::new(stream);
        info!("New connection {} from {}", connection.id(), addr);

        let registry = self.registry.clone();
        let broadcaster = self.broadcaster.clone();
        let sink = self.sink.clone();

        // Spawn handler task for each connection
        tokio::spawn(async move {
            if let Err(e) = handle_connection(connection, registry, broadcaster).await {
                warn!("Connection from {} ended with error: {}", addr, e);
                sink.emit(Event::error(format!("Error with client {}: {}", addr, e)));
            }
        });
    }
}

/// Swap an unspecified bind address for one reachable by clients
fn advertise(mut bound: SocketAddr, lookup: impl FnOnce() -> Option<IpAddr>) -> SocketAddr {
    if bound.ip().is_unspecified() {
        let ip = lookup()
            .filter(|ip| !ip.is_loopback() && !ip.is_unspecified())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        bound.set_ip(ip);
    }
    bound
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::{mpsc, oneshot};

    use super::*;

    #[tokio::test]
    async fn test_bind_error_reported() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let first = Server::bind("127.0.0.1:0", Arc::new(tx.clone())).await.unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let result = Server::bind(&addr, Arc::new(tx)).await;

        assert!(matches!(result, Err(AppError::Bind { .. })));
        assert!(matches!(
            events.recv().await,
            Some(Event::Status { is_error: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let server = Server::bind("127.0.0.1:0", Arc::new(tx)).await.unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        assert!(matches!(
            events.recv().await,
            Some(Event::Status { is_error: false, .. })
        ));

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[test]
    fn test_advertise_replaces_wildcard() {
        let lan: IpAddr = "192.168.1.20".parse().unwrap();
        let bound: SocketAddr = "0.0.0.0:5000".parse().unwrap();

        assert_eq!(
            advertise(bound, || Some(lan)),
            "192.168.1.20:5000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_advertise_falls_back_to_loopback() {
        let bound: SocketAddr = "0.0.0.0:5000".parse().unwrap();

        assert_eq!(advertise(bound, || None).to_string(), "127.0.0.1:5000");
        assert_eq!(
            advertise(bound, || Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED))).to_string(),
            "127.0.0.1:5000"
        );
    }

    #[test]
    fn test_advertise_keeps_specific_bind() {
        let bound: SocketAddr = "10.0.0.2:6000".parse().unwrap();

        let advertised = advertise(bound, || panic!("no lookup for a specific bind"));

        assert_eq!(advertised, bound);
    }

    #[tokio::test]
    async fn test_started_status_names_dialable_address() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let server = Server::bind("127.0.0.1:0", Arc::new(tx)).await.unwrap();
        let expected = format!("Server started on {}", server.local_addr().unwrap());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        assert_eq!(events.recv().await, Some(Event::status(expected)));

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
