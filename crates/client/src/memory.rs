//! In-process ledger implementing [`Network`] and [`Connector`].
//!
//! Admission follows the rules a real node applies: the proposal key must
//! exist, be unrevoked and carry the current sequence number, the payer's
//! envelope signatures must reach the weight threshold, and a transaction id
//! is accepted only once. Accepted transactions advance through `PENDING`
//! and `EXECUTED` before becoming final, one step per result query.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use onboard_codec::{decode_account_code, decode_account_keys, encode_account_created, tx_id};
use onboard_crypto::{verify_envelope, verify_payload, CryptoError};
use onboard_types::{
    Account, AccountKey, AccountKeyRecord, Address, Event, SignedTransaction, TransactionResult,
    TransactionSignature, TransactionStatus, TxId, ACCOUNT_KEY_WEIGHT_THRESHOLD,
    EVENT_ACCOUNT_CREATED,
};

use crate::builder::CREATE_ACCOUNT_SCRIPT;
use crate::error::NetworkError;
use crate::network::{Connector, Network};

const FIRST_ADDRESS: u64 = 0x0000_0000_0000_1000;

struct Tracked {
    polls: u32,
    events: Vec<Event>,
    error_message: Option<String>,
}

struct Ledger {
    accounts: BTreeMap<Address, Account>,
    transactions: HashMap<TxId, Tracked>,
    scripts: HashMap<Vec<u8>, Vec<u8>>,
    next_address: u64,
    seal_after_polls: u32,
    expire: bool,
    failing_result_queries: u32,
    lose_submit_reply: bool,
}

#[derive(Default)]
pub struct InMemoryNetwork {
    ledger: Mutex<Ledger>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            transactions: HashMap::new(),
            scripts: HashMap::new(),
            next_address: FIRST_ADDRESS,
            seal_after_polls: 0,
            expire: false,
            failing_result_queries: 0,
            lose_submit_reply: false,
        }
    }
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open an account holding `keys` and return its address.
    pub fn open_account(&self, keys: &[AccountKey], code: Option<Vec<u8>>) -> Address {
        self.ledger().open_account(keys, code)
    }

    pub fn account(&self, address: &Address) -> Option<Account> {
        self.ledger().accounts.get(address).cloned()
    }

    pub fn revoke_key(&self, address: &Address, key_index: u32) {
        let mut ledger = self.ledger();
        if let Some(key) = ledger
            .accounts
            .get_mut(address)
            .and_then(|a| a.keys.iter_mut().find(|k| k.index == key_index))
        {
            key.revoked = true;
        }
    }

    /// Number of `PENDING`/`EXECUTED` answers before a transaction turns
    /// final. Zero seals on the first query.
    pub fn set_seal_after_polls(&self, polls: u32) {
        self.ledger().seal_after_polls = polls;
    }

    /// Make accepted transactions end up `EXPIRED` instead of `SEALED`.
    pub fn set_expire(&self, expire: bool) {
        self.ledger().expire = expire;
    }

    /// Fail the next `count` result queries with a transport error.
    pub fn fail_result_queries(&self, count: u32) {
        self.ledger().failing_result_queries = count;
    }

    /// Accept the next submission but report a transport error to the caller.
    pub fn lose_next_submit_reply(&self) {
        self.ledger().lose_submit_reply = true;
    }

    pub fn set_script_result(&self, script: &[u8], value: Vec<u8>) {
        self.ledger().scripts.insert(script.to_vec(), value);
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger().transactions.len()
    }
}

impl Ledger {
    fn open_account(&mut self, keys: &[AccountKey], code: Option<Vec<u8>>) -> Address {
        let address = Address(self.next_address.to_be_bytes());
        self.next_address += 1;

        let keys = keys
            .iter()
            .zip(0u32..)
            .map(|(k, index)| AccountKeyRecord {
                index,
                public_key: k.public_key.clone(),
                sign_algo: k.sign_algo,
                hash_algo: k.hash_algo,
                weight: k.weight,
                sequence_number: 0,
                revoked: false,
            })
            .collect();
        self.accounts.insert(
            address,
            Account {
                address,
                keys,
                code,
            },
        );
        address
    }

    fn admit(&mut self, tx: &SignedTransaction) -> Result<TxId, NetworkError> {
        let id = tx_id(tx).map_err(rejected)?;
        if self.transactions.contains_key(&id) {
            return Err(rejected(format!("duplicate transaction {id}")));
        }

        let body = &tx.body;
        if body.gas_limit == 0 {
            return Err(rejected("gas limit is zero"));
        }

        let proposal = body.proposal_key;
        let key = self
            .accounts
            .get(&proposal.address)
            .and_then(|a| a.key(proposal.key_index))
            .filter(|k| !k.revoked)
            .ok_or_else(|| {
                rejected(format!(
                    "no usable proposal key {} on {}",
                    proposal.key_index, proposal.address
                ))
            })?;
        if key.sequence_number != proposal.sequence_number {
            return Err(rejected(format!(
                "sequence number {} does not match expected {}",
                proposal.sequence_number, key.sequence_number
            )));
        }

        self.check_weight(tx, body.payer, &tx.envelope_signatures, verify_envelope)?;
        let mut signers: Vec<Address> = body.authorizers.clone();
        signers.push(proposal.address);
        for signer in signers.into_iter().collect::<HashSet<_>>() {
            if signer != body.payer {
                self.check_weight(tx, signer, &tx.payload_signatures, verify_payload)?;
            }
        }

        if let Some(key) = self
            .accounts
            .get_mut(&proposal.address)
            .and_then(|a| a.keys.iter_mut().find(|k| k.index == proposal.key_index))
        {
            key.sequence_number += 1;
        }

        let tracked = self.execute(body.script.as_slice(), &body.arguments);
        self.transactions.insert(id, tracked);
        Ok(id)
    }

    /// Sum the weight of `address`'s valid signatures in `sigs`.
    fn check_weight(
        &self,
        tx: &SignedTransaction,
        address: Address,
        sigs: &[TransactionSignature],
        verify: fn(
            &SignedTransaction,
            &TransactionSignature,
            &AccountKeyRecord,
        ) -> Result<bool, CryptoError>,
    ) -> Result<(), NetworkError> {
        let account = self
            .accounts
            .get(&address)
            .ok_or_else(|| rejected(format!("unknown signer {address}")))?;

        let mut weight: u32 = 0;
        for sig in sigs.iter().filter(|s| s.address == address) {
            let Some(key) = account.key(sig.key_index).filter(|k| !k.revoked) else {
                continue;
            };
            if verify(tx, sig, key).unwrap_or(false) {
                weight = weight.saturating_add(key.weight);
            }
        }

        if weight < ACCOUNT_KEY_WEIGHT_THRESHOLD {
            return Err(rejected(format!(
                "{address} signed with weight {weight}, need {ACCOUNT_KEY_WEIGHT_THRESHOLD}"
            )));
        }
        Ok(())
    }

    fn execute(&mut self, script: &[u8], arguments: &[Vec<u8>]) -> Tracked {
        let mut tracked = Tracked {
            polls: 0,
            events: Vec::new(),
            error_message: None,
        };
        if script != CREATE_ACCOUNT_SCRIPT.as_bytes() {
            return tracked;
        }

        match decode_create_args(arguments) {
            Ok((keys, code)) => {
                let address = self.open_account(&keys, code);
                debug!(%address, keys = keys.len(), "opened account");
                tracked.events.push(Event::new(
                    EVENT_ACCOUNT_CREATED,
                    encode_account_created(&address),
                ));
            }
            Err(e) => tracked.error_message = Some(format!("bad arguments: {e}")),
        }
        tracked
    }

    fn result(&mut self, id: &TxId) -> Result<TransactionResult, NetworkError> {
        let seal_after = self.seal_after_polls;
        let expire = self.expire;
        let tracked = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| NetworkError::NotFound(format!("transaction {id}")))?;

        let status = match tracked.polls {
            n if n >= seal_after && expire => TransactionStatus::Expired,
            n if n >= seal_after => TransactionStatus::Sealed,
            0 => TransactionStatus::Pending,
            _ => TransactionStatus::Executed,
        };
        tracked.polls = tracked.polls.saturating_add(1);

        let events = match status {
            TransactionStatus::Executed | TransactionStatus::Sealed => tracked.events.clone(),
            _ => Vec::new(),
        };
        Ok(TransactionResult {
            status,
            events,
            error_message: tracked.error_message.clone(),
        })
    }
}

fn rejected(reason: impl ToString) -> NetworkError {
    NetworkError::Rejected(reason.to_string())
}

/// Key list and optional code of an account-creation transaction.
type CreateArgs = (Vec<AccountKey>, Option<Vec<u8>>);

fn decode_create_args(arguments: &[Vec<u8>]) -> Result<CreateArgs, String> {
    let [keys, code] = arguments else {
        return Err(format!("expected 2 arguments, got {}", arguments.len()));
    };
    let keys = decode_account_keys(keys).map_err(|e| e.to_string())?;
    let code = decode_account_code(code).map_err(|e| e.to_string())?;
    Ok((keys, code))
}

#[async_trait]
impl Network for InMemoryNetwork {
    async fn get_account(&self, address: &Address) -> Result<Account, NetworkError> {
        self.account(address)
            .ok_or_else(|| NetworkError::NotFound(format!("account {address}")))
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, NetworkError> {
        let mut ledger = self.ledger();
        let id = ledger.admit(tx)?;
        if std::mem::take(&mut ledger.lose_submit_reply) {
            return Err(NetworkError::Transport("connection reset".into()));
        }
        Ok(id)
    }

    async fn get_result(&self, id: &TxId) -> Result<TransactionResult, NetworkError> {
        let mut ledger = self.ledger();
        if ledger.failing_result_queries > 0 {
            ledger.failing_result_queries -= 1;
            return Err(NetworkError::Transport("connection reset".into()));
        }
        ledger.result(id)
    }

    async fn execute_script(
        &self,
        script: &[u8],
        _arguments: &[Vec<u8>],
    ) -> Result<Vec<u8>, NetworkError> {
        self.ledger()
            .scripts
            .get(script)
            .cloned()
            .ok_or_else(|| rejected("script execution failed"))
    }
}

/// Hands out connections to a shared [`InMemoryNetwork`] and tracks how many
/// are currently open.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    network: Arc<InMemoryNetwork>,
    open: Arc<AtomicUsize>,
    unreachable: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryConnector {
    pub fn new(network: Arc<InMemoryNetwork>) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn network(&self) -> &Arc<InMemoryNetwork> {
        &self.network
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, endpoint: &str) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_string());
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Connection = InMemoryConnection;

    async fn connect(&self, endpoint: &str) -> Result<InMemoryConnection, NetworkError> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(endpoint);
        if unreachable {
            return Err(NetworkError::Transport(format!("{endpoint} unreachable")));
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            network: Arc::clone(&self.network),
            open: Arc::clone(&self.open),
        })
    }
}

pub struct InMemoryConnection {
    network: Arc<InMemoryNetwork>,
    open: Arc<AtomicUsize>,
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for InMemoryConnection {
    async fn get_account(&self, address: &Address) -> Result<Account, NetworkError> {
        self.network.get_account(address).await
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, NetworkError> {
        self.network.submit(tx).await
    }

    async fn get_result(&self, id: &TxId) -> Result<TransactionResult, NetworkError> {
        self.network.get_result(id).await
    }

    async fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<Vec<u8>, NetworkError> {
        self.network.execute_script(script, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use onboard_crypto::{build_account_key, sign_envelope, InMemorySigner, KeyPair};
    use onboard_types::{HashAlgorithm, SignatureAlgorithm};

    use crate::builder::CreateAccountBuilder;

    fn funded(net: &InMemoryNetwork) -> (Address, KeyPair) {
        let kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[7; 32]).unwrap();
        let key = build_account_key(
            &kp.public_key_hex(),
            SignatureAlgorithm::Ed25519,
            HashAlgorithm::Sha2_256,
            ACCOUNT_KEY_WEIGHT_THRESHOLD,
        )
        .unwrap();
        (net.open_account(&[key], None), kp)
    }

    fn signed(payer: Address, kp: &KeyPair, account: &Account, seq: u64) -> SignedTransaction {
        let new_key = build_account_key(
            &kp.public_key_hex(),
            SignatureAlgorithm::Ed25519,
            HashAlgorithm::Blake3_256,
            ACCOUNT_KEY_WEIGHT_THRESHOLD,
        )
        .unwrap();
        let body = CreateAccountBuilder::new(payer)
            .key(new_key)
            .proposal_key(0, seq)
            .gas_limit(100)
            .build()
            .unwrap();
        let signer =
            InMemorySigner::new(kp.private_key().clone(), HashAlgorithm::Sha2_256).unwrap();
        let mut tx = SignedTransaction::new(body);
        sign_envelope(&mut tx, payer, &account.keys[0], &signer).unwrap();
        tx
    }

    #[tokio::test]
    async fn admits_once_and_bumps_sequence_number() {
        let net = InMemoryNetwork::new();
        let (payer, kp) = funded(&net);
        let account = net.account(&payer).unwrap();
        let tx = signed(payer, &kp, &account, 0);

        let id = net.submit(&tx).await.unwrap();
        assert_eq!(id, tx_id(&tx).unwrap());
        assert_eq!(net.account(&payer).unwrap().keys[0].sequence_number, 1);

        // same bytes again: duplicate and stale sequence number
        assert!(matches!(
            net.submit(&tx).await,
            Err(NetworkError::Rejected(_))
        ));
        assert_eq!(net.transaction_count(), 1);
    }

    #[tokio::test]
    async fn rejects_wrong_sequence_number_and_bad_signature() {
        let net = InMemoryNetwork::new();
        let (payer, kp) = funded(&net);
        let account = net.account(&payer).unwrap();

        let stale = signed(payer, &kp, &account, 5);
        assert!(matches!(
            net.submit(&stale).await,
            Err(NetworkError::Rejected(msg)) if msg.contains("sequence number")
        ));

        let mut forged = signed(payer, &kp, &account, 0);
        forged.envelope_signatures[0].signature[0] ^= 0xff;
        assert!(matches!(
            net.submit(&forged).await,
            Err(NetworkError::Rejected(msg)) if msg.contains("weight")
        ));
        assert_eq!(net.account(&payer).unwrap().keys[0].sequence_number, 0);
    }

    #[tokio::test]
    async fn status_progresses_then_seals_with_event() {
        let net = InMemoryNetwork::new();
        net.set_seal_after_polls(2);
        let (payer, kp) = funded(&net);
        let tx = signed(payer, &kp, &net.account(&payer).unwrap(), 0);
        let id = net.submit(&tx).await.unwrap();

        let statuses = [
            net.get_result(&id).await.unwrap(),
            net.get_result(&id).await.unwrap(),
            net.get_result(&id).await.unwrap(),
        ];
        assert_eq!(statuses[0].status, TransactionStatus::Pending);
        assert!(statuses[0].events.is_empty());
        assert_eq!(statuses[1].status, TransactionStatus::Executed);
        assert_eq!(statuses[2].status, TransactionStatus::Sealed);

        let event = &statuses[2].events[0];
        assert_eq!(event.type_tag, EVENT_ACCOUNT_CREATED);
        let created = Address(event.payload.as_slice().try_into().unwrap());
        let account = net.account(&created).unwrap();
        assert_eq!(account.keys.len(), 1);
        assert_eq!(account.keys[0].hash_algo, HashAlgorithm::Blake3_256);
        assert_eq!(account.code, None);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let net = InMemoryNetwork::new();
        assert!(matches!(
            net.get_result(&TxId([0; 32])).await,
            Err(NetworkError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn connections_are_counted_until_dropped() {
        let connector = InMemoryConnector::new(Arc::new(InMemoryNetwork::new()));
        let conn = connector.connect("node:3569").await.unwrap();
        assert_eq!(connector.open_connections(), 1);
        drop(conn);
        assert_eq!(connector.open_connections(), 0);

        connector.set_unreachable("down:3569");
        assert!(matches!(
            connector.connect("down:3569").await,
            Err(NetworkError::Transport(_))
        ));
        assert_eq!(connector.open_connections(), 0);
    }
}
