use std::fmt;

use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::Verifier as _;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use onboard_codec::{encode_envelope, encode_payload, CodecError};
use onboard_types::{
    AccountKey, AccountKeyRecord, Address, Hash32, HashAlgorithm, SignatureAlgorithm,
    SignedTransaction, TransactionSignature, ACCOUNT_KEY_WEIGHT_THRESHOLD, MIN_SEED_LENGTH,
};

/// Prefix mixed into every transaction signature so that a signature over a
/// transaction can never be replayed as a signature over other data.
pub const TRANSACTION_DOMAIN_TAG: &[u8] = b"ONBOARD-V0.0-transaction";

const KEY_DERIVATION_CONTEXT: &str = "ledger-onboard 2024-01-01 account key derivation";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("secure randomness unavailable: {0}")]
    Randomness(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("seed must be at least 32 bytes, got {0}")]
    SeedTooShort(usize),
    #[error("key decode failed: {0}")]
    KeyDecode(String),
    #[error("invalid key weight {0}: must be in 1..=1000")]
    InvalidWeight(u32),
    #[error("{sign} keys cannot be used with {hash}")]
    IncompatibleAlgorithms {
        sign: SignatureAlgorithm,
        hash: HashAlgorithm,
    },
    #[error("signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Digest `msg` with the given hash algorithm.
pub fn hash(algo: HashAlgorithm, msg: &[u8]) -> Hash32 {
    match algo {
        HashAlgorithm::Sha2_256 => Sha256::digest(msg).into(),
        HashAlgorithm::Blake3_256 => *blake3::hash(msg).as_bytes(),
    }
}

#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Deterministically derive a private key from a seed of at least
    /// [`MIN_SEED_LENGTH`] bytes.
    pub fn from_seed(algo: SignatureAlgorithm, seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() < MIN_SEED_LENGTH {
            return Err(CryptoError::SeedTooShort(seed.len()));
        }

        let mut material = blake3::derive_key(KEY_DERIVATION_CONTEXT, seed);
        match algo {
            SignatureAlgorithm::Ed25519 => {
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&material)))
            }
            // Rehash until the material is a valid scalar. A miss has
            // probability ~2^-128 per round.
            SignatureAlgorithm::EcdsaSecp256k1 => loop {
                if let Ok(sk) = k256::ecdsa::SigningKey::from_slice(&material) {
                    return Ok(Self::Secp256k1(sk));
                }
                material = blake3::derive_key(KEY_DERIVATION_CONTEXT, &material);
            },
        }
    }

    pub fn from_bytes(algo: SignatureAlgorithm, bytes: &[u8]) -> Result<Self, CryptoError> {
        check_len("private key", algo.private_key_len(), bytes.len())?;
        match algo {
            SignatureAlgorithm::Ed25519 => {
                let raw = <[u8; 32]>::try_from(bytes)
                    .map_err(|_| CryptoError::KeyDecode("private key length".into()))?;
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&raw)))
            }
            SignatureAlgorithm::EcdsaSecp256k1 => k256::ecdsa::SigningKey::from_slice(bytes)
                .map(Self::Secp256k1)
                .map_err(|e| CryptoError::KeyDecode(format!("private key: {e}"))),
        }
    }

    pub fn from_hex(algo: SignatureAlgorithm, s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex("private key", s)?;
        Self::from_bytes(algo, &bytes)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
            Self::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Ed25519(sk) => PublicKey::Ed25519(sk.verifying_key()),
            Self::Secp256k1(sk) => PublicKey::Secp256k1(sk.verifying_key().clone()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(sk) => sk.to_bytes().to_vec(),
            Self::Secp256k1(sk) => sk.to_bytes().to_vec(),
        }
    }

    /// Sign raw bytes. Both schemes are deterministic: the same key and
    /// message always give the same signature.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::Ed25519(sk) => sk
                .try_sign(msg)
                .map(|sig| sig.to_bytes().to_vec())
                .map_err(|e| CryptoError::Signing(e.to_string())),
            Self::Secp256k1(sk) => {
                let sig: k256::ecdsa::Signature = sk
                    .try_sign(msg)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.algorithm())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    pub fn from_bytes(algo: SignatureAlgorithm, bytes: &[u8]) -> Result<Self, CryptoError> {
        check_len("public key", algo.public_key_len(), bytes.len())?;
        match algo {
            SignatureAlgorithm::Ed25519 => {
                let raw = <[u8; 32]>::try_from(bytes)
                    .map_err(|_| CryptoError::KeyDecode("public key length".into()))?;
                ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map(Self::Ed25519)
                    .map_err(|e| CryptoError::KeyDecode(format!("public key: {e}")))
            }
            SignatureAlgorithm::EcdsaSecp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map(Self::Secp256k1)
                    .map_err(|e| CryptoError::KeyDecode(format!("public key: {e}")))
            }
        }
    }

    pub fn from_hex(algo: SignatureAlgorithm, s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex("public key", s)?;
        Self::from_bytes(algo, &bytes)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
            Self::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(pk) => pk.to_bytes().to_vec(),
            Self::Secp256k1(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a signature over raw bytes.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::Ed25519(pk) => match ed25519_dalek::Signature::from_slice(sig) {
                Ok(sig) => pk.verify_strict(msg, &sig).is_ok(),
                Err(_) => false,
            },
            Self::Secp256k1(pk) => match k256::ecdsa::Signature::from_slice(sig) {
                Ok(sig) => pk.verify(msg, &sig).is_ok(),
                Err(_) => false,
            },
        }
    }
}

fn check_len(what: &str, expected: usize, got: usize) -> Result<(), CryptoError> {
    if expected != got {
        return Err(CryptoError::KeyDecode(format!(
            "{what} must be {expected} bytes, got {got}"
        )));
    }
    Ok(())
}

fn decode_hex(what: &str, s: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(s).map_err(|e| CryptoError::KeyDecode(format!("{what} hex: {e}")))
}

pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from an OS-provided random seed.
    pub fn generate(algo: SignatureAlgorithm) -> Result<Self, CryptoError> {
        let mut seed = [0u8; MIN_SEED_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::Randomness(e.to_string()))?;
        Self::from_seed(algo, &seed)
    }

    pub fn from_seed(algo: SignatureAlgorithm, seed: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::from_private_key(PrivateKey::from_seed(algo, seed)?))
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    pub fn from_private_key_hex(algo: SignatureAlgorithm, s: &str) -> Result<Self, CryptoError> {
        Ok(Self::from_private_key(PrivateKey::from_hex(algo, s)?))
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.private_key.algorithm()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Generate a key pair for the named signature algorithm and return it as
/// hex-encoded `(public_key, private_key)`.
pub fn generate_keys(sign_algo: &str) -> Result<(String, String), CryptoError> {
    let algo: SignatureAlgorithm = sign_algo
        .parse()
        .map_err(|_| CryptoError::UnsupportedAlgorithm(sign_algo.to_string()))?;
    let kp = KeyPair::generate(algo)?;
    Ok((kp.public_key_hex(), kp.private_key_hex()))
}

/// Build the descriptor of a key to register on a new account.
///
/// The public key is decoded and checked against the algorithm before any
/// other validation, so a malformed key never yields a descriptor.
pub fn build_account_key(
    public_key_hex: &str,
    sign_algo: SignatureAlgorithm,
    hash_algo: HashAlgorithm,
    weight: u32,
) -> Result<AccountKey, CryptoError> {
    let public_key = PublicKey::from_hex(sign_algo, public_key_hex)?;

    if !sign_algo.supports(hash_algo) {
        return Err(CryptoError::IncompatibleAlgorithms {
            sign: sign_algo,
            hash: hash_algo,
        });
    }
    if weight == 0 || weight > ACCOUNT_KEY_WEIGHT_THRESHOLD {
        return Err(CryptoError::InvalidWeight(weight));
    }

    Ok(AccountKey {
        public_key: public_key.to_bytes(),
        sign_algo,
        hash_algo,
        weight,
    })
}

fn signing_digest(hash_algo: HashAlgorithm, bytes: &[u8]) -> Hash32 {
    let mut msg = Vec::with_capacity(TRANSACTION_DOMAIN_TAG.len() + bytes.len());
    msg.extend_from_slice(TRANSACTION_DOMAIN_TAG);
    msg.extend_from_slice(bytes);
    hash(hash_algo, &msg)
}

/// A private key bound to the hash algorithm it was registered with.
pub struct InMemorySigner {
    key: PrivateKey,
    hash_algo: HashAlgorithm,
}

impl InMemorySigner {
    pub fn new(key: PrivateKey, hash_algo: HashAlgorithm) -> Result<Self, CryptoError> {
        let sign = key.algorithm();
        if !sign.supports(hash_algo) {
            return Err(CryptoError::IncompatibleAlgorithms {
                sign,
                hash: hash_algo,
            });
        }
        Ok(Self { key, hash_algo })
    }

    /// Bind `key` to the on-chain key it will sign for, taking the hash
    /// algorithm from the registered record.
    ///
    /// A private key that does not match the record (revoked, other
    /// algorithm, other public key) fails with [`CryptoError::Signing`].
    pub fn for_registered_key(
        key: PrivateKey,
        record: &AccountKeyRecord,
    ) -> Result<Self, CryptoError> {
        let signer = Self {
            key,
            hash_algo: record.hash_algo,
        };
        signer.check_registered(record)?;
        Self::new(signer.key, record.hash_algo)
    }

    pub fn sign_algo(&self) -> SignatureAlgorithm {
        self.key.algorithm()
    }

    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// Sign `message` prefixed with the transaction domain tag.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(&signing_digest(self.hash_algo, message))
    }

    /// The signer must match the on-chain key it claims to sign for,
    /// otherwise the network would reject the signature.
    fn check_registered(&self, key: &AccountKeyRecord) -> Result<(), CryptoError> {
        if key.revoked {
            return Err(CryptoError::Signing(format!("key {} is revoked", key.index)));
        }
        if key.hash_algo != self.hash_algo {
            return Err(CryptoError::Signing(format!(
                "signer hashes with {}, key {} is registered with {}",
                self.hash_algo, key.index, key.hash_algo
            )));
        }
        if key.sign_algo != self.sign_algo() {
            return Err(CryptoError::Signing(format!(
                "signer uses {}, key {} is registered with {}",
                self.sign_algo(),
                key.index,
                key.sign_algo
            )));
        }
        if key.public_key != self.public_key().to_bytes() {
            return Err(CryptoError::Signing(format!(
                "private key does not match registered key {}",
                key.index
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("sign_algo", &self.sign_algo())
            .field("hash_algo", &self.hash_algo)
            .finish_non_exhaustive()
    }
}

/// Add a proposer or authorizer signature over the payload.
///
/// Payload signatures are part of the envelope, so they cannot be added once
/// the payer has signed.
pub fn sign_payload(
    tx: &mut SignedTransaction,
    address: Address,
    key: &AccountKeyRecord,
    signer: &InMemorySigner,
) -> Result<(), CryptoError> {
    if !tx.envelope_signatures.is_empty() {
        return Err(CryptoError::Signing(
            "payload signature added after envelope signature".into(),
        ));
    }
    signer.check_registered(key)?;

    let payload = encode_payload(&tx.body)?;
    let signature = signer.sign(&payload)?;
    tx.payload_signatures.push(TransactionSignature {
        address,
        key_index: key.index,
        signature,
    });
    Ok(())
}

/// Add the payer's signature over the envelope: the full body including the
/// proposal key and authorizers, plus every payload signature.
pub fn sign_envelope(
    tx: &mut SignedTransaction,
    address: Address,
    key: &AccountKeyRecord,
    signer: &InMemorySigner,
) -> Result<(), CryptoError> {
    signer.check_registered(key)?;

    let envelope = encode_envelope(tx)?;
    let signature = signer.sign(&envelope)?;
    tx.envelope_signatures.push(TransactionSignature {
        address,
        key_index: key.index,
        signature,
    });
    Ok(())
}

fn verify_against(
    bytes: &[u8],
    sig: &TransactionSignature,
    key: &AccountKeyRecord,
) -> Result<bool, CryptoError> {
    let pk = PublicKey::from_bytes(key.sign_algo, &key.public_key)?;
    Ok(pk.verify(&signing_digest(key.hash_algo, bytes), &sig.signature))
}

pub fn verify_payload(
    tx: &SignedTransaction,
    sig: &TransactionSignature,
    key: &AccountKeyRecord,
) -> Result<bool, CryptoError> {
    verify_against(&encode_payload(&tx.body)?, sig, key)
}

pub fn verify_envelope(
    tx: &SignedTransaction,
    sig: &TransactionSignature,
    key: &AccountKeyRecord,
) -> Result<bool, CryptoError> {
    verify_against(&encode_envelope(tx)?, sig, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    use onboard_types::{ProposalKey, TransactionBody};

    const ALGOS: [SignatureAlgorithm; 2] =
        [SignatureAlgorithm::Ed25519, SignatureAlgorithm::EcdsaSecp256k1];

    fn record(kp: &KeyPair, hash_algo: HashAlgorithm) -> AccountKeyRecord {
        AccountKeyRecord {
            index: 0,
            public_key: kp.public_key().to_bytes(),
            sign_algo: kp.algorithm(),
            hash_algo,
            weight: ACCOUNT_KEY_WEIGHT_THRESHOLD,
            sequence_number: 0,
            revoked: false,
        }
    }

    fn sample_tx(payer: Address) -> SignedTransaction {
        SignedTransaction::new(TransactionBody {
            script: b"script".to_vec(),
            arguments: vec![b"arg".to_vec()],
            proposal_key: ProposalKey {
                address: payer,
                key_index: 0,
                sequence_number: 0,
            },
            payer,
            authorizers: vec![payer],
            gas_limit: 100,
        })
    }

    #[test]
    fn generated_keys_have_fixed_lengths_and_roundtrip_hex() {
        for algo in ALGOS {
            let (pk_hex, sk_hex) = generate_keys(algo.name()).unwrap();
            let pk = hex::decode(&pk_hex).unwrap();
            let sk = hex::decode(&sk_hex).unwrap();
            assert_eq!(pk.len(), algo.public_key_len());
            assert_eq!(sk.len(), algo.private_key_len());
            assert_eq!(hex::encode(&pk), pk_hex);

            // the private key alone reproduces the public key
            let restored = KeyPair::from_private_key_hex(algo, &sk_hex).unwrap();
            assert_eq!(restored.public_key_hex(), pk_hex);
        }
    }

    #[test]
    fn unknown_selector_is_unsupported() {
        assert_eq!(
            generate_keys("ECDSA_P384").unwrap_err(),
            CryptoError::UnsupportedAlgorithm("ECDSA_P384".into())
        );
    }

    #[test]
    fn seed_derivation_is_deterministic() {
        for algo in ALGOS {
            let a = KeyPair::from_seed(algo, &[7u8; 32]).unwrap();
            let b = KeyPair::from_seed(algo, &[7u8; 32]).unwrap();
            let c = KeyPair::from_seed(algo, &[8u8; 32]).unwrap();
            assert_eq!(a.private_key_hex(), b.private_key_hex());
            assert_ne!(a.private_key_hex(), c.private_key_hex());
        }
        assert!(matches!(
            KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[1u8; 16]),
            Err(CryptoError::SeedTooShort(16))
        ));
    }

    #[test]
    fn account_key_weight_bounds() {
        let kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[1u8; 32]).unwrap();
        let pk = kp.public_key_hex();
        let build = |w| build_account_key(&pk, kp.algorithm(), HashAlgorithm::Sha2_256, w);

        assert_eq!(build(0).unwrap_err(), CryptoError::InvalidWeight(0));
        assert_eq!(build(1001).unwrap_err(), CryptoError::InvalidWeight(1001));
        for w in [1, 500, 999, 1000] {
            let key = build(w).unwrap();
            assert_eq!(key.weight, w);
            assert_eq!(key.public_key, kp.public_key().to_bytes());
        }
    }

    #[test]
    fn malformed_public_key_hex_is_a_decode_error() {
        for bad in ["abc", "zz".repeat(32).as_str(), "00", ""] {
            let err = build_account_key(
                bad,
                SignatureAlgorithm::Ed25519,
                HashAlgorithm::Sha2_256,
                1000,
            )
            .unwrap_err();
            assert!(matches!(err, CryptoError::KeyDecode(_)), "{bad}: {err:?}");
        }

        // right length, not a curve point
        let err = build_account_key(
            &"ff".repeat(33),
            SignatureAlgorithm::EcdsaSecp256k1,
            HashAlgorithm::Sha2_256,
            1000,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::KeyDecode(_)));
    }

    #[test]
    fn secp256k1_key_rejects_blake3() {
        let kp = KeyPair::from_seed(SignatureAlgorithm::EcdsaSecp256k1, &[2u8; 32]).unwrap();
        let err = build_account_key(
            &kp.public_key_hex(),
            kp.algorithm(),
            HashAlgorithm::Blake3_256,
            1000,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::IncompatibleAlgorithms { .. }));
        assert!(InMemorySigner::new(kp.private_key().clone(), HashAlgorithm::Blake3_256).is_err());
    }

    #[test]
    fn envelope_signature_verifies_and_detects_tampering() {
        for (algo, hash_algo) in [
            (SignatureAlgorithm::Ed25519, HashAlgorithm::Sha2_256),
            (SignatureAlgorithm::Ed25519, HashAlgorithm::Blake3_256),
            (SignatureAlgorithm::EcdsaSecp256k1, HashAlgorithm::Sha2_256),
        ] {
            let kp = KeyPair::from_seed(algo, &[3u8; 32]).unwrap();
            let key = record(&kp, hash_algo);
            let signer = InMemorySigner::new(kp.private_key().clone(), hash_algo).unwrap();
            let payer = Address([0x11; 8]);

            let mut tx = sample_tx(payer);
            sign_envelope(&mut tx, payer, &key, &signer).unwrap();
            let sig = tx.envelope_signatures[0].clone();
            assert_eq!(sig.address, payer);
            assert!(verify_envelope(&tx, &sig, &key).unwrap());

            // the signature covers the proposal key
            tx.body.proposal_key.sequence_number += 1;
            assert!(!verify_envelope(&tx, &sig, &key).unwrap());
        }
    }

    #[test]
    fn signatures_are_deterministic() {
        for algo in ALGOS {
            let kp = KeyPair::from_seed(algo, &[4u8; 32]).unwrap();
            let signer = InMemorySigner::new(kp.private_key().clone(), HashAlgorithm::Sha2_256)
                .unwrap();
            assert_eq!(signer.sign(b"msg").unwrap(), signer.sign(b"msg").unwrap());
            assert_ne!(signer.sign(b"msg").unwrap(), signer.sign(b"msg!").unwrap());
        }
    }

    #[test]
    fn signer_must_match_registered_key() {
        let kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[5u8; 32]).unwrap();
        let other = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[6u8; 32]).unwrap();
        let payer = Address([0x22; 8]);
        let signer =
            InMemorySigner::new(kp.private_key().clone(), HashAlgorithm::Sha2_256).unwrap();

        let wrong_hash = record(&kp, HashAlgorithm::Blake3_256);
        let wrong_key = record(&other, HashAlgorithm::Sha2_256);
        let mut revoked = record(&kp, HashAlgorithm::Sha2_256);
        revoked.revoked = true;

        for key in [wrong_hash, wrong_key, revoked] {
            let mut tx = sample_tx(payer);
            let err = sign_envelope(&mut tx, payer, &key, &signer).unwrap_err();
            assert!(matches!(err, CryptoError::Signing(_)));
            assert!(tx.envelope_signatures.is_empty());
        }
    }

    #[test]
    fn registered_signer_takes_the_record_hash_algorithm() {
        let kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[5u8; 32]).unwrap();
        let key = record(&kp, HashAlgorithm::Blake3_256);

        let signer =
            InMemorySigner::for_registered_key(kp.private_key().clone(), &key).unwrap();
        assert_eq!(signer.hash_algo(), HashAlgorithm::Blake3_256);

        let mut tx = sample_tx(Address([0x22; 8]));
        sign_envelope(&mut tx, Address([0x22; 8]), &key, &signer).unwrap();
        assert!(verify_envelope(&tx, &tx.envelope_signatures[0], &key).unwrap());
    }

    #[test]
    fn registered_signer_rejects_a_key_of_another_algorithm() {
        // on-chain Ed25519/BLAKE3 key, local secp256k1 private key
        let registered = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[5u8; 32]).unwrap();
        let local = KeyPair::from_seed(SignatureAlgorithm::EcdsaSecp256k1, &[5u8; 32]).unwrap();
        let key = record(&registered, HashAlgorithm::Blake3_256);

        let err =
            InMemorySigner::for_registered_key(local.private_key().clone(), &key).unwrap_err();
        assert!(matches!(err, CryptoError::Signing(_)));

        let mut revoked = record(&registered, HashAlgorithm::Sha2_256);
        revoked.revoked = true;
        let err = InMemorySigner::for_registered_key(registered.private_key().clone(), &revoked)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Signing(_)));
    }

    #[test]
    fn payload_signatures_must_precede_envelope() {
        let proposer_kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[7u8; 32]).unwrap();
        let payer_kp = KeyPair::from_seed(SignatureAlgorithm::EcdsaSecp256k1, &[8u8; 32]).unwrap();
        let proposer = Address([0x01; 8]);
        let payer = Address([0x02; 8]);
        let proposer_key = record(&proposer_kp, HashAlgorithm::Blake3_256);
        let payer_key = record(&payer_kp, HashAlgorithm::Sha2_256);
        let proposer_signer =
            InMemorySigner::new(proposer_kp.private_key().clone(), HashAlgorithm::Blake3_256)
                .unwrap();
        let payer_signer =
            InMemorySigner::new(payer_kp.private_key().clone(), HashAlgorithm::Sha2_256).unwrap();

        let mut tx = sample_tx(proposer);
        tx.body.payer = payer;
        sign_payload(&mut tx, proposer, &proposer_key, &proposer_signer).unwrap();
        sign_envelope(&mut tx, payer, &payer_key, &payer_signer).unwrap();

        assert!(verify_payload(&tx, &tx.payload_signatures[0], &proposer_key).unwrap());
        assert!(verify_envelope(&tx, &tx.envelope_signatures[0], &payer_key).unwrap());

        let err = sign_payload(&mut tx, proposer, &proposer_key, &proposer_signer).unwrap_err();
        assert!(matches!(err, CryptoError::Signing(_)));
    }

    #[test]
    fn debug_output_redacts_private_material() {
        let kp = KeyPair::from_seed(SignatureAlgorithm::Ed25519, &[9u8; 32]).unwrap();
        let dbg = format!("{kp:?} {:?}", kp.private_key());
        assert!(!dbg.contains(&kp.private_key_hex()));
    }
}
