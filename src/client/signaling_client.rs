use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::client::{Client, ClientError};
use crate::connection::{Connection, ConnectionError, ConnectionEvent};
use crate::log::LogSink;
use crate::protocol::{ANONYMOUS_ID, ParticipantId};
use crate::{sink_info, sink_warn};

/// A [`Client`] wired to its hub connection.
pub struct SignalingClient {
    client: Client,
    conn: Connection,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    log: Arc<dyn LogSink>,
}

impl SignalingClient {
    /// Connect to the hub and send the self-introduction.
    pub async fn connect(
        host: &str,
        port: u16,
        client: Client,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(ConnectionError::Io)?;
        sink_info!(log, "[{}] connected to hub at {}:{}", client.name(), host, port);

        let (tx, events) = mpsc::unbounded_channel();
        let conn = Connection::spawn(stream, ANONYMOUS_ID, move |ev| {
            let _ = tx.send(ev);
        });
        conn.send_frame(&client.intro_frame()?)?;

        Ok(Self {
            client,
            conn,
            events,
            log,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn local_id(&self) -> ParticipantId {
        self.client.local_id()
    }

    /// Wait for and handle one connection event.
    ///
    /// Protocol violations are logged and skipped. Losing the connection
    /// yields [`ClientError::Disconnected`].
    pub async fn step(&mut self) -> Result<(), ClientError> {
        let Some(event) = self.events.recv().await else {
            return Err(self.lost());
        };

        match event {
            ConnectionEvent::Frame(frame) => {
                let kind = frame.msg_type.name();
                let src = frame.src;
                match self.client.handle_frame(frame) {
                    Ok(out) => {
                        if self.conn.local_id() != self.client.local_id() {
                            self.conn.set_local_id(self.client.local_id());
                        }
                        for f in &out {
                            if let Err(e) = self.conn.send_frame(f) {
                                sink_warn!(self.log, "[{}] send failed: {}", self.client.name(), e);
                                return Err(self.lost());
                            }
                        }
                    }
                    Err(e) => sink_warn!(
                        self.log,
                        "[{}] rejected {} from {}: {}",
                        self.client.name(),
                        kind,
                        src,
                        e
                    ),
                }
                Ok(())
            }
            ConnectionEvent::Rejected(e) => {
                sink_warn!(self.log, "[{}] skipped frame: {}", self.client.name(), e);
                Ok(())
            }
            ConnectionEvent::Closed => Err(self.lost()),
            ConnectionEvent::Failed(e) => {
                sink_warn!(self.log, "[{}] hub connection failed: {}", self.client.name(), e);
                Err(self.lost())
            }
        }
    }

    /// Handle events until the hub connection ends.
    pub async fn run(mut self) -> ClientError {
        loop {
            if let Err(e) = self.step().await {
                return e;
            }
        }
    }

    fn lost(&mut self) -> ClientError {
        self.client.handle_connection_lost();
        ClientError::Disconnected
    }
}

/// Connect, introduce and serve until the hub goes away.
pub async fn run_client(
    host: &str,
    port: u16,
    client: Client,
    log: Arc<dyn LogSink>,
) -> Result<(), ClientError> {
    let session = SignalingClient::connect(host, port, client, log).await?;
    Err(session.run().await)
}
