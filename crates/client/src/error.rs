use onboard_codec::CodecError;
use onboard_crypto::CryptoError;
use onboard_types::{Address, TransactionStatus, TxId};

use crate::config::ConfigError;

/// Failure reported by a [`Network`](crate::Network) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The request may or may not have reached the node.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node received the request and refused it.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no account keys supplied")]
    EmptyKeySet,
    #[error("connecting to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        source: NetworkError,
    },
    #[error("looking up account {address}: {reason}")]
    AccountLookup { address: Address, reason: String },
    #[error("submitting transaction {tx_id}: {source}")]
    Submission { tx_id: TxId, source: NetworkError },
    #[error("transaction {tx_id} not final before deadline (last status: {last_status:?})")]
    FinalityTimeout {
        tx_id: TxId,
        last_status: Option<TransactionStatus>,
    },
    #[error("transaction {tx_id} sealed without an account-creation event")]
    EventNotFound { tx_id: TxId },
    #[error("transaction result is {0}, not sealed")]
    NotSealed(TransactionStatus),
    #[error("malformed account-creation event: {0}")]
    EventDecode(CodecError),
    #[error("script execution failed: {0}")]
    ScriptExecution(NetworkError),
}

impl ClientError {
    /// True when the same call can be repeated unchanged.
    ///
    /// Submission failures are never retry-safe: a resubmission reuses a
    /// sequence number the network may already have consumed. Reconcile with
    /// [`ClientError::tx_id`] and a result query first.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::AccountLookup { .. } | Self::FinalityTimeout { .. }
        )
    }

    /// True when the transaction may have reached the network even though
    /// the call failed.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::Submission { source, .. } => matches!(source, NetworkError::Transport(_)),
            Self::FinalityTimeout { .. } => true,
            _ => false,
        }
    }

    /// Id of the transaction the failure concerns, when one was computed.
    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            Self::Submission { tx_id, .. }
            | Self::FinalityTimeout { tx_id, .. }
            | Self::EventNotFound { tx_id } => Some(*tx_id),
            _ => None,
        }
    }
}
