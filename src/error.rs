// File: src/error.rs
// Version: 1.0.0 - Error taxonomy for decoding, identity, configuration and traversal

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Decode step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Block,
    Envelope,
    Payload,
    ChannelHeader,
    SignatureHeader,
    SerializedIdentity,
    Transaction,
    ChaincodeActionPayload,
    ChaincodeProposalPayload,
    ChaincodeInvocationSpec,
    ProposalResponsePayload,
    ChaincodeAction,
    TxReadWriteSet,
    KvRwSet,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Block => "Block",
            Layer::Envelope => "Envelope",
            Layer::Payload => "Payload",
            Layer::ChannelHeader => "ChannelHeader",
            Layer::SignatureHeader => "SignatureHeader",
            Layer::SerializedIdentity => "SerializedIdentity",
            Layer::Transaction => "Transaction",
            Layer::ChaincodeActionPayload => "ChaincodeActionPayload",
            Layer::ChaincodeProposalPayload => "ChaincodeProposalPayload",
            Layer::ChaincodeInvocationSpec => "ChaincodeInvocationSpec",
            Layer::ProposalResponsePayload => "ProposalResponsePayload",
            Layer::ChaincodeAction => "ChaincodeAction",
            Layer::TxReadWriteSet => "TxReadWriteSet",
            Layer::KvRwSet => "KVRWSet",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while unwrapping a block or one of its transactions.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes at this layer are not a valid encoding of the expected message.
    #[error("failed to decode {layer}: {source}")]
    Malformed {
        layer: Layer,
        #[source]
        source: prost::DecodeError,
    },

    /// A sub-message the next layer depends on is absent.
    #[error("{layer} is missing required field `{field}`")]
    MissingField { layer: Layer, field: &'static str },

    /// `Transaction.actions` is empty.
    #[error("transaction carries no actions")]
    NoActions,

    /// Channel header timestamp cannot be represented as a wall-clock time.
    #[error("channel header timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// Creator identity could not be extracted.
    #[error("creator identity: {0}")]
    Identity(#[from] IdentityError),

    /// A transaction slot inside a block failed.
    #[error("block {block}, transaction {index}: {source}")]
    InTransaction {
        block: u64,
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn malformed(layer: Layer) -> impl FnOnce(prost::DecodeError) -> Self {
        move |source| DecodeError::Malformed { layer, source }
    }

    /// Layer the failure originated in, looking through block wrapping.
    pub fn layer(&self) -> Option<Layer> {
        match self {
            DecodeError::Malformed { layer, .. } | DecodeError::MissingField { layer, .. } => Some(*layer),
            DecodeError::NoActions => Some(Layer::Transaction),
            DecodeError::InvalidTimestamp(_) => Some(Layer::ChannelHeader),
            DecodeError::Identity(_) => Some(Layer::SerializedIdentity),
            DecodeError::InTransaction { source, .. } => source.layer(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to parse certificate: {0}")]
    Certificate(#[source] openssl::error::ErrorStack),

    /// The certificate subject has no OU entry.
    #[error("certificate subject has no organizational unit")]
    NoOrganizationalUnit,

    #[error("certificate subject {0} entry is not valid text")]
    InvalidSubjectEntry(&'static str),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("certificate public key algorithm not supported: {0} (supported: SM2, ECDSA)")]
    UnsupportedKeyAlgorithm(String),

    #[error("key material error: {0}")]
    Key(#[from] openssl::error::ErrorStack),
}

/// Invalid [`BrowseConfig`](crate::model::BrowseConfig), detected before any ledger call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported stop condition kind {0} (expected 0, 1 or 2)")]
    UnsupportedStopCondition(i32),

    #[error("target previous hash is required for this stop condition")]
    MissingTargetHash,

    #[error("target previous hash is not valid hex: {0}")]
    InvalidTargetHash(#[from] hex::FromHexError),
}

/// Failures reported by a [`LedgerQuery`](crate::browser::LedgerQuery) collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("invalid browse configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to query chain info: {0}")]
    ChainInfo(#[source] LedgerError),

    #[error("failed to fetch block {target}: {source}")]
    Fetch {
        target: String,
        #[source]
        source: LedgerError,
    },

    #[error("failed to decode block {number}: {source}")]
    Decode {
        number: u64,
        #[source]
        source: DecodeError,
    },

    #[error("traversal cancelled after {blocks} blocks")]
    Cancelled { blocks: u64 },
}
