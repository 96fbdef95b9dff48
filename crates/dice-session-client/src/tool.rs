// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tool-facing session adapter: channels + port trait.
//!
//! Whatever owns the socket pushes raw text frames into a channel;
//! [`ChannelSession`] decodes them on demand and queues outbound actions.
//! Viewers depend on [`SessionPort`] without knowing about the transport.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use dice_session_proto::{decode_server, encode_client, ClientMessage, ServerMessage};
use tracing::{debug, warn};

use crate::{Reconciliation, Replica};

/// Abstract port for exchanging session frames with the hub.
pub trait SessionPort {
    /// Drain up to `max` decoded hub frames; undecodable frames are skipped.
    fn drain_messages(&mut self, max: usize) -> Vec<ServerMessage>;
    /// Queue an action for the hub. Returns `false` when the link is gone.
    fn send(&mut self, msg: &ClientMessage) -> bool;
}

/// Simple channel-backed session adapter for tools.
#[derive(Default)]
pub struct ChannelSession {
    inbound: Option<Receiver<String>>,
    outbound: Option<Sender<String>>,
}

impl ChannelSession {
    /// Construct a new, unconnected session adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the underlying frame channels.
    pub fn set_channels(&mut self, inbound: Receiver<String>, outbound: Sender<String>) {
        self.inbound = Some(inbound);
        self.outbound = Some(outbound);
    }
}

impl SessionPort for ChannelSession {
    fn drain_messages(&mut self, max: usize) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        let Some(rx) = &self.inbound else {
            return out;
        };
        for _ in 0..max {
            match rx.try_recv() {
                Ok(text) => match decode_server(&text) {
                    Ok(msg) => out.push(msg),
                    Err(err) => debug!(%err, "dropping undecodable hub frame"),
                },
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    fn send(&mut self, msg: &ClientMessage) -> bool {
        let Some(tx) = &self.outbound else {
            return false;
        };
        match encode_client(msg) {
            Ok(text) => tx.send(text).is_ok(),
            Err(err) => {
                debug!(%err, kind = msg.kind(), "failed to encode action");
                false
            }
        }
    }
}

impl Replica {
    /// Applies up to `max` pending hub frames from `port`.
    ///
    /// Frames the replica cannot import are logged and skipped; the next
    /// snapshot will correct the local state.
    pub fn sync_from(&mut self, port: &mut impl SessionPort, max: usize) -> Vec<Reconciliation> {
        port.drain_messages(max)
            .into_iter()
            .filter_map(|msg| match self.apply(msg) {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    warn!(%err, "ignoring hub snapshot");
                    None
                }
            })
            .collect()
    }
}
