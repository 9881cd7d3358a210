use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};

use crate::connection::{Connection, ConnectionEvent};
use crate::hub::{Hub, HubEvent, Listener, Outgoing, SessionKey};
use crate::log::LogSink;
use crate::protocol::HUB_ID;
use crate::{sink_debug, sink_error, sink_info, sink_warn};

/// Central hub loop: owns the [`Hub`] engine and maps session -> Connection.
///
/// Every socket task reports back through one channel, so the engine is only
/// ever touched from this loop. Returns when the listener fails.
pub async fn run_hub(listener: Listener, mut hub: Hub, log: Arc<dyn LogSink>) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<HubEvent>();

    sink_info!(
        log,
        "hub '{}' listening on port {}",
        hub.name(),
        listener.local_port()
    );
    if listener.local_port() != listener.requested_port() {
        sink_warn!(
            log,
            "port {} was busy, using {} instead",
            listener.requested_port(),
            listener.local_port()
        );
    }
    spawn_accept_loop(listener, tx.clone());

    let mut sessions: HashMap<SessionKey, Connection> = HashMap::new();
    let mut next_session: SessionKey = 1;

    while let Some(ev) = rx.recv().await {
        match ev {
            HubEvent::Accepted { stream, addr } => {
                let session = next_session;
                next_session += 1;

                let events = tx.clone();
                let conn = Connection::spawn(stream, HUB_ID, move |event| {
                    let _ = events.send(HubEvent::Connection { session, event });
                });
                hub.open_session(session);
                sessions.insert(session, conn);
                sink_info!(log, "accepted {} as session {}", addr, session);
            }

            HubEvent::Connection { session, event } => {
                if !sessions.contains_key(&session) {
                    // Late event from a connection already torn down.
                    sink_debug!(log, "dropping event for closed session {}", session);
                    continue;
                }
                match event {
                    ConnectionEvent::Frame(frame) => {
                        let kind = frame.msg_type.name();
                        match hub.handle_frame(session, frame) {
                            Ok(out) => deliver(&sessions, out, log.as_ref()),
                            Err(e) => {
                                sink_warn!(log, "session {}: rejected {}: {}", session, kind, e)
                            }
                        }
                    }
                    ConnectionEvent::Rejected(e) => {
                        sink_warn!(log, "session {}: skipped frame: {}", session, e);
                    }
                    ConnectionEvent::Closed => {
                        sink_info!(log, "session {} closed by peer", session);
                        close_session(&mut hub, &mut sessions, session);
                    }
                    ConnectionEvent::Failed(e) => {
                        sink_warn!(log, "session {} failed: {}", session, e);
                        close_session(&mut hub, &mut sessions, session);
                    }
                }
            }

            HubEvent::ListenerFailed(e) => {
                sink_error!(log, "listener failed, hub shutting down: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

fn spawn_accept_loop(listener: Listener, events: UnboundedSender<HubEvent>) {
    let accepted = events.clone();
    tokio::spawn(async move {
        let result = listener
            .run(move |stream, addr| {
                let _ = accepted.send(HubEvent::Accepted { stream, addr });
            })
            .await;
        if let Err(e) = result {
            let _ = events.send(HubEvent::ListenerFailed(e));
        }
    });
}

fn close_session(hub: &mut Hub, sessions: &mut HashMap<SessionKey, Connection>, session: SessionKey) {
    sessions.remove(&session);
    hub.handle_disconnect(session);
}

fn deliver(sessions: &HashMap<SessionKey, Connection>, out: Vec<Outgoing>, log: &dyn LogSink) {
    for Outgoing { target, frame } in out {
        let Some(conn) = sessions.get(&target) else {
            sink_warn!(log, "no session {} to deliver {}", target, frame.msg_type.name());
            continue;
        };
        if let Err(e) = conn.send_frame(&frame) {
            sink_warn!(
                log,
                "failed to deliver {} to session {}: {}",
                frame.msg_type.name(),
                target,
                e
            );
        }
    }
}
