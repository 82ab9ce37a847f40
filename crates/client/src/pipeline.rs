use tokio::time::Instant;
use tracing::{info, instrument};

use onboard_crypto::{sign_envelope, InMemorySigner, PrivateKey};
use onboard_types::{AccountKey, Address, SignedTransaction, TxId};

use crate::builder::CreateAccountBuilder;
use crate::config::{PayerConfig, PipelineConfig};
use crate::error::ClientError;
use crate::events::find_created_address;
use crate::finality::{wait_until, FinalityPolicy};
use crate::network::{Connector, Network};
use crate::submit::submit;

/// The account that proposes, pays for and signs the transaction.
pub struct Payer {
    pub address: Address,
    pub key_index: u32,
    key: PrivateKey,
}

impl Payer {
    pub fn new(address: Address, key_index: u32, key: PrivateKey) -> Self {
        Self {
            address,
            key_index,
            key,
        }
    }

    pub fn from_config(config: &PayerConfig) -> Result<Self, ClientError> {
        let key = PrivateKey::from_hex(config.signature_algorithm, &config.private_key)?;
        Ok(Self::new(config.address, config.key_index, key))
    }
}

impl std::fmt::Debug for Payer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payer")
            .field("address", &self.address)
            .field("key_index", &self.key_index)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatedAccount {
    pub tx_id: TxId,
    pub address: Address,
}

/// Build, sign and submit an account-creation transaction.
///
/// The payer's key is looked up on chain right before signing so the
/// transaction carries the sequence number the network expects. Returns as
/// soon as the node accepts the transaction.
#[instrument(skip_all, fields(payer = %payer.address, keys = keys.len()))]
pub async fn submit_account_creation<N>(
    network: &N,
    payer: &Payer,
    keys: Vec<AccountKey>,
    code: Option<&str>,
    gas_limit: u64,
) -> Result<TxId, ClientError>
where
    N: Network + ?Sized,
{
    if keys.is_empty() {
        return Err(ClientError::EmptyKeySet);
    }

    let account = match network.get_account(&payer.address).await {
        Ok(account) => account,
        Err(e) => return Err(lookup_failed(payer.address, e)),
    };
    let Some(key) = account.key(payer.key_index).filter(|k| !k.revoked) else {
        let reason = format!("no usable key at index {}", payer.key_index);
        return Err(lookup_failed(payer.address, reason));
    };
    info!(
        key_index = key.index,
        sequence_number = key.sequence_number,
        hash_algo = %key.hash_algo,
        "resolved payer key"
    );

    let body = CreateAccountBuilder::new(payer.address)
        .keys(keys)
        .code(code)
        .proposal_key(key.index, key.sequence_number)
        .gas_limit(gas_limit)
        .build()?;

    let signer = InMemorySigner::for_registered_key(payer.key.clone(), key)?;
    let mut tx = SignedTransaction::new(body);
    sign_envelope(&mut tx, payer.address, key, &signer)?;

    submit(network, &tx).await
}

fn lookup_failed(address: Address, reason: impl ToString) -> ClientError {
    ClientError::AccountLookup {
        address,
        reason: reason.to_string(),
    }
}

/// Wait for a submitted account-creation transaction to seal and return the
/// new account's address. Safe to call again with the same id after a
/// timeout or an ambiguous submission.
#[instrument(skip_all, fields(tx_id = %tx_id))]
pub async fn await_created_address<N>(
    network: &N,
    tx_id: &TxId,
    deadline: Instant,
    policy: &FinalityPolicy,
) -> Result<Address, ClientError>
where
    N: Network + ?Sized,
{
    let result = wait_until(network, tx_id, deadline, policy).await?;
    match find_created_address(&result)? {
        Some(address) => {
            info!(%address, "account created");
            Ok(address)
        }
        None => Err(ClientError::EventNotFound { tx_id: *tx_id }),
    }
}

/// Run the whole pipeline over an already open connection.
pub async fn create_account<N>(
    network: &N,
    config: &PipelineConfig,
    keys: Vec<AccountKey>,
    code: Option<&str>,
) -> Result<CreatedAccount, ClientError>
where
    N: Network + ?Sized,
{
    let payer = Payer::from_config(&config.payer)?;
    let tx_id =
        submit_account_creation(network, &payer, keys, code, config.gas_limit).await?;

    let policy = config.finality.policy();
    let deadline = Instant::now() + policy.timeout;
    let address = await_created_address(network, &tx_id, deadline, &policy).await?;

    Ok(CreatedAccount { tx_id, address })
}

/// Connect to `config.endpoint`, run the pipeline, and release the
/// connection whatever the outcome.
pub async fn create_account_at<C>(
    connector: &C,
    config: &PipelineConfig,
    keys: Vec<AccountKey>,
    code: Option<&str>,
) -> Result<CreatedAccount, ClientError>
where
    C: Connector + ?Sized,
{
    let connection = connector
        .connect(&config.endpoint)
        .await
        .map_err(|source| ClientError::Connection {
            endpoint: config.endpoint.clone(),
            source,
        })?;
    info!(endpoint = %config.endpoint, "connected");

    let outcome = create_account(&connection, config, keys, code).await;
    drop(connection);
    outcome
}
