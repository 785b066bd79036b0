//! Backchain wire messages.
//!
//! Messages are internally tagged by `kind`. Request kinds this node does not
//! know decode to [`BackchainRequest::Unrecognized`] so the responder can
//! reject them as a protocol violation instead of failing to decode.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Hash, SignedGroupParameters, SignedTransaction, TransactionId};

/// Requests sent by the resolving node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackchainRequest {
    /// Send the listed transactions.
    Get { ids: Vec<TransactionId> },
    /// Send the group parameters with this hash (protocol V2).
    GetSignedGroupParameters { hash: Hash },
    /// Resolution finished; end the session.
    Stop,
    #[serde(other)]
    Unrecognized,
}

impl BackchainRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Get { .. } => "Get",
            Self::GetSignedGroupParameters { .. } => "GetSignedGroupParameters",
            Self::Stop => "Stop",
            Self::Unrecognized => "Unrecognized",
        }
    }
}

/// Responses sent by the peer that owns the backchain.
///
/// A `Get` is answered by one `Transaction` per requested id followed by
/// `EndOfBatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackchainResponse {
    Transaction { transaction: SignedTransaction },
    EndOfBatch,
    GroupParameters { parameters: SignedGroupParameters },
}

impl BackchainResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transaction { .. } => "Transaction",
            Self::EndOfBatch => "EndOfBatch",
            Self::GroupParameters { .. } => "GroupParameters",
        }
    }
}
