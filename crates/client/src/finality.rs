use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use onboard_types::{TransactionResult, TxId};

use crate::error::ClientError;
use crate::network::Network;

const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// How long to wait for a transaction to become final and how often to ask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalityPolicy {
    pub timeout: Duration,
    /// Delay after the first non-final answer. Doubles after every attempt.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for FinalityPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Poll until the transaction is sealed or expired, giving up after
/// `policy.timeout`.
pub async fn wait_for_finality<N>(
    network: &N,
    tx_id: &TxId,
    policy: &FinalityPolicy,
) -> Result<TransactionResult, ClientError>
where
    N: Network + ?Sized,
{
    wait_until(network, tx_id, Instant::now() + policy.timeout, policy).await
}

/// Poll until the transaction is sealed or expired, giving up at `deadline`.
///
/// Only the read-only result query is retried; a failed query is logged and
/// tried again after the next backoff. A query still in flight at the
/// deadline is abandoned. Dropping the returned future cancels the wait.
pub async fn wait_until<N>(
    network: &N,
    tx_id: &TxId,
    deadline: Instant,
    policy: &FinalityPolicy,
) -> Result<TransactionResult, ClientError>
where
    N: Network + ?Sized,
{
    let mut backoff = policy.initial_backoff.max(MIN_BACKOFF);
    let max_backoff = policy.max_backoff.max(MIN_BACKOFF);
    let mut last_status = None;
    let mut attempt: u32 = 0;

    while Instant::now() < deadline {
        attempt += 1;
        match timeout_at(deadline, network.get_result(tx_id)).await {
            Err(_) => break,
            Ok(Ok(result)) => {
                debug!(%tx_id, attempt, status = %result.status, "polled transaction result");
                if result.status.is_terminal() {
                    info!(%tx_id, status = %result.status, attempts = attempt, "transaction final");
                    return Ok(result);
                }
                last_status = Some(result.status);
            }
            Ok(Err(e)) => {
                warn!(%tx_id, attempt, error = %e, "result query failed, retrying");
            }
        }

        sleep_until((Instant::now() + backoff).min(deadline)).await;
        backoff = backoff.saturating_mul(2).min(max_backoff);
    }

    warn!(%tx_id, attempts = attempt, ?last_status, "gave up waiting for finality");
    Err(ClientError::FinalityTimeout {
        tx_id: *tx_id,
        last_status,
    })
}
