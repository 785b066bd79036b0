//! In-process peer sessions over `tokio::sync::mpsc`.
//!
//! Messages cross the channel JSON-encoded, so both ends see exactly what a
//! network peer would send, including request kinds they do not know.

use crate::domain::errors::SessionError;
use crate::ports::outbound::{RequesterSession, ResponderSession};
use crate::protocol::messages::{BackchainRequest, BackchainResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

/// Default number of in-flight messages per direction.
pub const DEFAULT_SESSION_CAPACITY: usize = 64;

struct ChannelEnd {
    counterparty: String,
    outgoing: mpsc::Sender<Vec<u8>>,
    incoming: mpsc::Receiver<Vec<u8>>,
}

impl ChannelEnd {
    async fn send_encoded<T: Serialize + Sync>(&mut self, message: &T) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(message).map_err(|e| SessionError::Encode(e.to_string()))?;
        self.send_raw(bytes).await
    }

    async fn send_raw(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.outgoing
            .send(bytes)
            .await
            .map_err(|_| SessionError::Closed {
                counterparty: self.counterparty.clone(),
            })
    }

    async fn receive_decoded<T: DeserializeOwned>(&mut self) -> Result<T, SessionError> {
        let bytes = self.incoming.recv().await.ok_or_else(|| SessionError::Closed {
            counterparty: self.counterparty.clone(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

/// Resolving end of an in-process session.
pub struct ChannelRequesterSession {
    end: ChannelEnd,
}

/// Serving end of an in-process session.
pub struct ChannelResponderSession {
    end: ChannelEnd,
}

/// Connected requester/responder pair. Each end reports the other's name as
/// its counterparty.
pub fn channel_session_pair(
    requester_name: impl Into<String>,
    responder_name: impl Into<String>,
    capacity: usize,
) -> (ChannelRequesterSession, ChannelResponderSession) {
    let (to_responder, from_requester) = mpsc::channel(capacity);
    let (to_requester, from_responder) = mpsc::channel(capacity);
    (
        ChannelRequesterSession {
            end: ChannelEnd {
                counterparty: responder_name.into(),
                outgoing: to_responder,
                incoming: from_responder,
            },
        },
        ChannelResponderSession {
            end: ChannelEnd {
                counterparty: requester_name.into(),
                outgoing: to_requester,
                incoming: from_requester,
            },
        },
    )
}

impl ChannelRequesterSession {
    /// Send bytes that bypass request encoding.
    pub async fn send_raw(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.end.send_raw(bytes).await
    }
}

impl ChannelResponderSession {
    /// Send bytes that bypass response encoding.
    pub async fn send_raw(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.end.send_raw(bytes).await
    }
}

#[async_trait]
impl RequesterSession for ChannelRequesterSession {
    async fn send(&mut self, request: BackchainRequest) -> Result<(), SessionError> {
        self.end.send_encoded(&request).await
    }

    async fn receive(&mut self) -> Result<BackchainResponse, SessionError> {
        self.end.receive_decoded().await
    }

    fn counterparty(&self) -> &str {
        &self.end.counterparty
    }
}

#[async_trait]
impl ResponderSession for ChannelResponderSession {
    async fn receive(&mut self) -> Result<BackchainRequest, SessionError> {
        self.end.receive_decoded().await
    }

    async fn send(&mut self, response: BackchainResponse) -> Result<(), SessionError> {
        self.end.send_encoded(&response).await
    }

    fn counterparty(&self) -> &str {
        &self.end.counterparty
    }
}
