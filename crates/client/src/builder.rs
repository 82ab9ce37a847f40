use onboard_codec::{encode_account_code, encode_account_keys};
use onboard_types::{AccountKey, Address, ProposalKey, TransactionBody};

use crate::error::ClientError;

/// Script run by an account-creation transaction. Its arguments are the
/// encoded key list and the optional bootstrap code.
pub const CREATE_ACCOUNT_SCRIPT: &str = "\
transaction(publicKeys: [Bytes], code: Bytes?) {
    prepare(signer: AuthAccount) {
        let account = AuthAccount(payer: signer)
        for key in publicKeys {
            account.addPublicKey(key)
        }
        if code != nil {
            account.setCode(code!)
        }
    }
}
";

/// Assembles the body of an account-creation transaction.
///
/// The proposer pays for and authorizes the transaction. The sequence number
/// must be read from the proposer's on-chain key just before signing.
#[derive(Debug, Clone)]
pub struct CreateAccountBuilder {
    proposer: Address,
    keys: Vec<AccountKey>,
    code: Option<Vec<u8>>,
    key_index: u32,
    sequence_number: u64,
    gas_limit: u64,
}

impl CreateAccountBuilder {
    pub fn new(proposer: Address) -> Self {
        Self {
            proposer,
            keys: Vec::new(),
            code: None,
            key_index: 0,
            sequence_number: 0,
            gas_limit: 0,
        }
    }

    pub fn key(mut self, key: AccountKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn keys(mut self, keys: impl IntoIterator<Item = AccountKey>) -> Self {
        self.keys.extend(keys);
        self
    }

    /// Blank or whitespace-only code means no code.
    pub fn code(mut self, code: Option<&str>) -> Self {
        self.code = code
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.as_bytes().to_vec());
        self
    }

    pub fn proposal_key(mut self, key_index: u32, sequence_number: u64) -> Self {
        self.key_index = key_index;
        self.sequence_number = sequence_number;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn build(self) -> Result<TransactionBody, ClientError> {
        if self.keys.is_empty() {
            return Err(ClientError::EmptyKeySet);
        }

        let arguments = vec![
            encode_account_keys(&self.keys)?,
            encode_account_code(self.code.as_deref())?,
        ];

        Ok(TransactionBody {
            script: CREATE_ACCOUNT_SCRIPT.as_bytes().to_vec(),
            arguments,
            proposal_key: ProposalKey {
                address: self.proposer,
                key_index: self.key_index,
                sequence_number: self.sequence_number,
            },
            payer: self.proposer,
            authorizers: vec![self.proposer],
            gas_limit: self.gas_limit,
        })
    }
}
