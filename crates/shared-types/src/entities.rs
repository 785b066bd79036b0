//! # Core Ledger Entities
//!
//! Defines the ledger entities shared by every subsystem of the backchain
//! engine.
//!
//! ## Clusters
//!
//! - **Identity**: `TransactionId`, `TransactionStatus`, `StateRef`
//! - **States**: `ContractState`, `TransactionState`, `StateAndRef`
//! - **Transactions**: `SignedTransaction` (wire/storage form),
//!   `LedgerTransaction` (materialized form handed to contracts)
//! - **Group context**: `GroupParameters`, `SignedGroupParameters`

use primitive_types::H256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A 32-byte SHA-256 hash.
pub type Hash = H256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Opaque, content-derived identifier of a transaction.
///
/// Equality and ordering are exact byte comparisons, so the id can key
/// hash maps and ordered sets alike.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TransactionId(pub H256);

impl TransactionId {
    /// Wrap a raw 32-byte digest.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    /// Build an id from a small integer (test fixtures, benchmarks).
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        Self(H256::from_low_u64_be(value))
    }

    /// Raw bytes of the id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_fixed_bytes()
    }
}

impl From<H256> for TransactionId {
    fn from(hash: H256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({:#x})", self.0)
    }
}

/// Local verification status of a stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Stored but not yet verified.
    Unverified,
    /// Verified; its ancestors are trusted transitively.
    Verified,
    /// Failed verification. Any dependent resolution must fail.
    Invalid,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unverified => "UNVERIFIED",
            Self::Verified => "VERIFIED",
            Self::Invalid => "INVALID",
        };
        f.write_str(label)
    }
}

/// Pointer to one output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// Transaction that created the state.
    pub transaction_id: TransactionId,
    /// Index into that transaction's outputs.
    pub index: u32,
}

impl StateRef {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.index)
    }
}

// =============================================================================
// CLUSTER B: STATES
// =============================================================================

/// User-level state data.
///
/// `state_class` is the canonical name of the state type; contracts use it
/// (together with `properties`) to interpret the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractState {
    /// Canonical state class name, e.g. `com.example.TokenState`.
    pub state_class: String,
    /// Parties with an interest in the state.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Arbitrary state fields.
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl ContractState {
    pub fn new(state_class: impl Into<String>) -> Self {
        Self {
            state_class: state_class.into(),
            participants: Vec::new(),
            properties: serde_json::Value::Null,
        }
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_participants(mut self, participants: Vec<String>) -> Self {
        self.participants = participants;
        self
    }
}

/// A state as it appears in a transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionState {
    /// The state data.
    pub data: ContractState,
    /// Contract class governing the state.
    pub contract: String,
    /// Index of another output of the same transaction that must be
    /// consumed atomically with this one.
    #[serde(default)]
    pub encumbrance: Option<u32>,
}

impl TransactionState {
    pub fn new(data: ContractState, contract: impl Into<String>) -> Self {
        Self {
            data,
            contract: contract.into(),
            encumbrance: None,
        }
    }

    pub fn with_encumbrance(mut self, index: u32) -> Self {
        self.encumbrance = Some(index);
        self
    }
}

/// A resolved state together with the reference it was resolved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state: TransactionState,
    pub reference: StateRef,
}

impl StateAndRef {
    pub fn new(state: TransactionState, reference: StateRef) -> Self {
        Self { state, reference }
    }
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// Metadata carried by every transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// Hash of the group parameters the transaction was built against.
    #[serde(default)]
    pub group_parameters_hash: Option<Hash>,
    /// Checksums of the code packages (CPKs) holding the contracts.
    #[serde(default)]
    pub cpk_checksums: Vec<Hash>,
    /// Platform version that produced the transaction.
    #[serde(default)]
    pub platform_version: u32,
}

#[derive(Serialize)]
struct TransactionContent<'a> {
    inputs: &'a [StateRef],
    references: &'a [StateRef],
    outputs: &'a [TransactionState],
    metadata: &'a TransactionMetadata,
}

/// A transaction in its wire and storage form.
///
/// Inputs and references are unresolved `StateRef`s. The id is the SHA-256
/// of the canonical encoding of the content, so it cannot be chosen freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub id: TransactionId,
    pub inputs: Vec<StateRef>,
    pub references: Vec<StateRef>,
    pub outputs: Vec<TransactionState>,
    pub metadata: TransactionMetadata,
    /// Opaque signatures over the id.
    #[serde(default)]
    pub signatures: Vec<Vec<u8>>,
}

impl SignedTransaction {
    /// Build a transaction and derive its id from the content.
    pub fn new(
        inputs: Vec<StateRef>,
        references: Vec<StateRef>,
        outputs: Vec<TransactionState>,
        metadata: TransactionMetadata,
    ) -> Self {
        let id = Self::compute_id(&inputs, &references, &outputs, &metadata);
        Self {
            id,
            inputs,
            references,
            outputs,
            metadata,
            signatures: Vec::new(),
        }
    }

    pub fn with_signatures(mut self, signatures: Vec<Vec<u8>>) -> Self {
        self.signatures = signatures;
        self
    }

    fn compute_id(
        inputs: &[StateRef],
        references: &[StateRef],
        outputs: &[TransactionState],
        metadata: &TransactionMetadata,
    ) -> TransactionId {
        let content = TransactionContent {
            inputs,
            references,
            outputs,
            metadata,
        };
        let bytes = serde_json::to_vec(&content)
            .expect("transaction content has string keys and serializes to JSON");
        TransactionId::from_bytes(Sha256::digest(&bytes).into())
    }

    /// Whether the stored id matches the content.
    #[must_use]
    pub fn id_matches_content(&self) -> bool {
        Self::compute_id(&self.inputs, &self.references, &self.outputs, &self.metadata) == self.id
    }

    /// Direct dependencies: originating transactions of inputs and references.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<TransactionId> {
        self.inputs
            .iter()
            .chain(self.references.iter())
            .map(|state_ref| state_ref.transaction_id)
            .collect()
    }

    /// Output at `index`, if any.
    #[must_use]
    pub fn output(&self, index: u32) -> Option<&TransactionState> {
        self.outputs.get(index as usize)
    }
}

/// A fully materialized transaction, handed to contracts for verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<TransactionState>,
    pub references: Vec<StateAndRef>,
    pub metadata: TransactionMetadata,
}

impl LedgerTransaction {
    /// Output states wrapped with the refs they will have once committed.
    #[must_use]
    pub fn output_state_and_refs(&self) -> Vec<StateAndRef> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, state)| {
                StateAndRef::new(state.clone(), StateRef::new(self.id, index as u32))
            })
            .collect()
    }

    /// Input states governed by `contract`.
    pub fn inputs_for<'a>(&'a self, contract: &'a str) -> impl Iterator<Item = &'a StateAndRef> {
        self.inputs
            .iter()
            .filter(move |input| input.state.contract == contract)
    }

    /// Output states governed by `contract`.
    pub fn outputs_for<'a>(
        &'a self,
        contract: &'a str,
    ) -> impl Iterator<Item = &'a TransactionState> {
        self.outputs
            .iter()
            .filter(move |output| output.contract == contract)
    }
}

// =============================================================================
// CLUSTER D: GROUP CONTEXT
// =============================================================================

/// Parameters of the membership group a transaction belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    pub epoch: u64,
    pub minimum_platform_version: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl GroupParameters {
    /// Hash identifying these parameters.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let bytes = serde_json::to_vec(self).expect("group parameters serialize to JSON");
        H256(Sha256::digest(&bytes).into())
    }
}

/// Group parameters with the signature of the group's authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedGroupParameters {
    pub parameters: GroupParameters,
    #[serde(default)]
    pub signature: Vec<u8>,
}

impl SignedGroupParameters {
    pub fn new(parameters: GroupParameters, signature: Vec<u8>) -> Self {
        Self {
            parameters,
            signature,
        }
    }

    #[must_use]
    pub fn hash(&self) -> Hash {
        self.parameters.hash()
    }
}
