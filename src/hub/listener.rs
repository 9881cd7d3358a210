use std::io;
use std::net::{self, SocketAddr};

use tokio::net::{TcpListener, TcpStream};

/// Listening socket of the hub.
///
/// Binding happens synchronously at startup so the caller knows the final
/// port before the reactor runs.
#[derive(Debug)]
pub struct Listener {
    inner: net::TcpListener,
    requested_port: u16,
    port: u16,
}

impl Listener {
    /// Bind `host:port`. While the port is taken, try the next one up.
    ///
    /// Fails on any other bind error, or when no port above the requested
    /// one is free.
    pub fn bind(host: &str, port: u16) -> io::Result<Self> {
        let mut candidate = port;
        loop {
            match net::TcpListener::bind((host, candidate)) {
                Ok(inner) => {
                    let bound = inner.local_addr()?.port();
                    return Ok(Self {
                        inner,
                        requested_port: port,
                        port: bound,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    candidate = candidate.checked_add(1).ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::AddrInUse,
                            format!("no free port in {port}..=65535"),
                        )
                    })?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Port actually bound.
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Port asked for in [`bind`](Self::bind).
    pub fn requested_port(&self) -> u16 {
        self.requested_port
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept forever, handing every socket to `on_accept`.
    ///
    /// Returns only when accepting fails, which ends the listener.
    pub async fn run<F>(self, mut on_accept: F) -> io::Result<()>
    where
        F: FnMut(TcpStream, SocketAddr) + Send + 'static,
    {
        self.inner.set_nonblocking(true)?;
        let listener = TcpListener::from_std(self.inner)?;
        loop {
            let (stream, addr) = listener.accept().await?;
            on_accept(stream, addr);
        }
    }
}
