use tracing::debug;

use crate::error::ClientError;
use crate::network::Network;

/// Run a read-only script against the latest ledger state. The script and the
/// returned value are passed through without interpretation.
pub async fn execute_script<N>(
    network: &N,
    script: &[u8],
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, ClientError>
where
    N: Network + ?Sized,
{
    debug!(
        script_len = script.len(),
        arguments = arguments.len(),
        "executing script"
    );
    network
        .execute_script(script, arguments)
        .await
        .map_err(ClientError::ScriptExecution)
}
