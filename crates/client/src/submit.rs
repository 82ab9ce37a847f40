use tracing::{info, warn};

use onboard_codec::tx_id;
use onboard_types::{SignedTransaction, TxId};

use crate::error::ClientError;
use crate::network::Network;

/// Send a signed transaction and return its id.
///
/// The id is computed locally before sending, so a failed submission still
/// reports which transaction to look for.
pub async fn submit<N>(network: &N, tx: &SignedTransaction) -> Result<TxId, ClientError>
where
    N: Network + ?Sized,
{
    let local_id = tx_id(tx)?;

    match network.submit(tx).await {
        Ok(id) => {
            if id != local_id {
                warn!(%local_id, node_id = %id, "node reported a different transaction id");
            }
            info!(tx_id = %id, "transaction submitted");
            Ok(id)
        }
        Err(source) => {
            warn!(tx_id = %local_id, error = %source, "transaction submission failed");
            Err(ClientError::Submission {
                tx_id: local_id,
                source,
            })
        }
    }
}
