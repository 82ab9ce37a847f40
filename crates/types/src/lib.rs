use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Byte width of an account address.
pub const ADDRESS_LEN: usize = 8;

/// Total weight of signatures an account needs to authorize an action.
/// A single key may carry at most this much weight.
pub const ACCOUNT_KEY_WEIGHT_THRESHOLD: u32 = 1000;

/// Minimum seed length accepted by key derivation.
pub const MIN_SEED_LENGTH: usize = 32;

/// Type tag of the event the network emits when an account is created.
pub const EVENT_ACCOUNT_CREATED: &str = "AccountCreated";

pub type Hash32 = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Fixed-width account address. Rendered as lowercase hex without prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parse an address from hex. An optional `0x` prefix is accepted and
    /// input shorter than the full width is left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() {
            return Err(ParseError::InvalidHex(s.to_string()));
        }
        if digits.len() > ADDRESS_LEN * 2 {
            return Err(ParseError::InvalidLength {
                expected: ADDRESS_LEN,
                got: digits.len().div_ceil(2),
            });
        }

        let padded = format!("{digits:0>width$}", width = ADDRESS_LEN * 2);
        let mut out = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(&padded, &mut out)
            .map_err(|_| ParseError::InvalidHex(s.to_string()))?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_hex()
    }
}

/// Content-derived transaction identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(pub Hash32);

impl TxId {
    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let digits = strip_hex_prefix(s);
        if digits.len() != 64 {
            return Err(ParseError::InvalidLength {
                expected: 32,
                got: digits.len() / 2,
            });
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|_| ParseError::InvalidHex(s.to_string()))?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for TxId {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.to_hex()
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Signature scheme of an account key.
///
/// The discriminant is the on-wire tag. Changing it breaks every encoded key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum SignatureAlgorithm {
    Ed25519 = 1,
    EcdsaSecp256k1 = 2,
}

impl SignatureAlgorithm {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Ed25519),
            2 => Some(Self::EcdsaSecp256k1),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "ED25519",
            Self::EcdsaSecp256k1 => "ECDSA_SECP256K1",
        }
    }

    pub fn private_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::EcdsaSecp256k1 => 32,
        }
    }

    /// Ed25519 keys are raw 32-byte points; secp256k1 keys are SEC1 compressed.
    pub fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::EcdsaSecp256k1 => 33,
        }
    }

    pub fn supports(self, hash: HashAlgorithm) -> bool {
        match self {
            Self::Ed25519 => true,
            Self::EcdsaSecp256k1 => hash == HashAlgorithm::Sha2_256,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ED25519" => Ok(Self::Ed25519),
            "ECDSA_SECP256K1" => Ok(Self::EcdsaSecp256k1),
            _ => Err(ParseError::UnsupportedSignatureAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(a: SignatureAlgorithm) -> Self {
        a.name().to_string()
    }
}

/// Digest applied to a message before it is signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha2_256 = 1,
    Blake3_256 = 2,
}

impl HashAlgorithm {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Sha2_256),
            2 => Some(Self::Blake3_256),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha2_256 => "SHA2_256",
            Self::Blake3_256 => "BLAKE3_256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA2_256" => Ok(Self::Sha2_256),
            "BLAKE3_256" => Ok(Self::Blake3_256),
            _ => Err(ParseError::UnsupportedHashAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(a: HashAlgorithm) -> Self {
        a.name().to_string()
    }
}

/// A public key to register on a new account, with its algorithms and weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountKey {
    pub public_key: Vec<u8>,
    pub sign_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub weight: u32,
}

/// A key as registered on an existing account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountKeyRecord {
    pub index: u32,
    pub public_key: Vec<u8>,
    pub sign_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub weight: u32,
    pub sequence_number: u64,
    pub revoked: bool,
}

/// On-chain view of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub keys: Vec<AccountKeyRecord>,
    pub code: Option<Vec<u8>>,
}

impl Account {
    pub fn key(&self, index: u32) -> Option<&AccountKeyRecord> {
        self.keys.iter().find(|k| k.index == index)
    }
}

/// The account key that anchors a transaction against replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBody {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub gas_limit: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

/// A transaction body together with the signatures collected so far.
///
/// Payload signatures come from the proposer and authorizers, envelope
/// signatures from the payer. When proposer and payer are the same account
/// only the envelope signature is required.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }
}

impl From<TransactionBody> for SignedTransaction {
    fn from(body: TransactionBody) -> Self {
        Self::new(body)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Pending,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sealed | Self::Expired)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Executed => "EXECUTED",
            Self::Sealed => "SEALED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub type_tag: String,
    pub payload: Vec<u8>,
}

impl Event {
    pub fn new(type_tag: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            type_tag: type_tag.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub events: Vec<Event>,
    /// Execution error reported by the network, if any.
    pub error_message: Option<String>,
}
