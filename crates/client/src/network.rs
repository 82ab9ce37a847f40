use async_trait::async_trait;

use onboard_types::{Account, Address, SignedTransaction, TransactionResult, TxId};

use crate::error::NetworkError;

/// Read and write access to a ledger node over an open connection.
#[async_trait]
pub trait Network: Send + Sync {
    async fn get_account(&self, address: &Address) -> Result<Account, NetworkError>;

    /// Hand a signed transaction to the node. Returns the id the node
    /// assigned, which matches the content-derived id for a conforming node.
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, NetworkError>;

    async fn get_result(&self, id: &TxId) -> Result<TransactionResult, NetworkError>;

    /// Run a read-only script and return its encoded value.
    async fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<Vec<u8>, NetworkError>;
}

/// Opens connections to a node. The connection is released when the returned
/// value is dropped.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Network;

    async fn connect(&self, endpoint: &str) -> Result<Self::Connection, NetworkError>;
}
