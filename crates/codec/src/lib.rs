use onboard_types::{
    AccountKey, Address, HashAlgorithm, ProposalKey, SignatureAlgorithm, SignedTransaction,
    TransactionBody, TransactionSignature, TxId, ADDRESS_LEN,
};

/// Leading byte of every encoded transaction payload.
pub const PAYLOAD_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("trailing bytes after decoded value")]
    TrailingBytes,
    #[error("invalid payload version")]
    InvalidVersion,
    #[error("length does not fit in u32")]
    LengthOverflow,
    #[error("unknown signature algorithm tag {0}")]
    InvalidSignatureAlgorithm(u8),
    #[error("unknown hash algorithm tag {0}")]
    InvalidHashAlgorithm(u8),
    #[error("invalid option tag {0}")]
    InvalidTag(u8),
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    if input.len() < n {
        return Err(CodecError::UnexpectedEof);
    }
    let (a, b) = input.split_at(n);
    *input = b;
    Ok(a)
}

fn read_u8(input: &mut &[u8]) -> Result<u8, CodecError> {
    Ok(take(input, 1)?[0])
}

fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], CodecError> {
    let b = take(input, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(b);
    Ok(out)
}

fn read_u32_le(input: &mut &[u8]) -> Result<u32, CodecError> {
    Ok(u32::from_le_bytes(read_array(input)?))
}

fn read_u64_le(input: &mut &[u8]) -> Result<u64, CodecError> {
    Ok(u64::from_le_bytes(read_array(input)?))
}

fn read_address(input: &mut &[u8]) -> Result<Address, CodecError> {
    Ok(Address(read_array::<ADDRESS_LEN>(input)?))
}

fn read_bytes(input: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = read_u32_le(input)? as usize;
    Ok(take(input, len)?.to_vec())
}

/// Reads a u32 element count. The count is not used to pre-allocate, since it
/// comes from untrusted input.
fn read_count(input: &mut &[u8]) -> Result<usize, CodecError> {
    Ok(read_u32_le(input)? as usize)
}

fn finish(input: &[u8]) -> Result<(), CodecError> {
    if !input.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(())
}

fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u64_le(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_address(out: &mut Vec<u8>, a: &Address) {
    out.extend_from_slice(a.as_bytes());
}

fn write_count(out: &mut Vec<u8>, n: usize) -> Result<(), CodecError> {
    let n: u32 = n.try_into().map_err(|_| CodecError::LengthOverflow)?;
    write_u32_le(out, n);
    Ok(())
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) -> Result<(), CodecError> {
    write_count(out, b.len())?;
    out.extend_from_slice(b);
    Ok(())
}

fn write_signatures(out: &mut Vec<u8>, sigs: &[TransactionSignature]) -> Result<(), CodecError> {
    write_count(out, sigs.len())?;
    for sig in sigs {
        write_address(out, &sig.address);
        write_u32_le(out, sig.key_index);
        write_bytes(out, &sig.signature)?;
    }
    Ok(())
}

fn read_signatures(input: &mut &[u8]) -> Result<Vec<TransactionSignature>, CodecError> {
    let n = read_count(input)?;
    let mut out = Vec::new();
    for _ in 0..n {
        let address = read_address(input)?;
        let key_index = read_u32_le(input)?;
        let signature = read_bytes(input)?;
        out.push(TransactionSignature {
            address,
            key_index,
            signature,
        });
    }
    Ok(out)
}

/// Canonical encoding of the transaction payload: everything the proposer and
/// authorizers sign. Field order is part of the wire format; changing it
/// changes every signature and transaction id.
pub fn encode_payload(body: &TransactionBody) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    write_u8(&mut out, PAYLOAD_VERSION);
    write_bytes(&mut out, &body.script)?;
    write_count(&mut out, body.arguments.len())?;
    for arg in &body.arguments {
        write_bytes(&mut out, arg)?;
    }
    write_address(&mut out, &body.proposal_key.address);
    write_u32_le(&mut out, body.proposal_key.key_index);
    write_u64_le(&mut out, body.proposal_key.sequence_number);
    write_address(&mut out, &body.payer);
    write_count(&mut out, body.authorizers.len())?;
    for a in &body.authorizers {
        write_address(&mut out, a);
    }
    write_u64_le(&mut out, body.gas_limit);
    Ok(out)
}

/// Canonical encoding of the envelope: payload followed by payload signatures.
/// This is what the payer signs.
pub fn encode_envelope(tx: &SignedTransaction) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_payload(&tx.body)?;
    write_signatures(&mut out, &tx.payload_signatures)?;
    Ok(out)
}

/// Canonical encoding of the fully signed transaction.
pub fn encode_signed(tx: &SignedTransaction) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_envelope(tx)?;
    write_signatures(&mut out, &tx.envelope_signatures)?;
    Ok(out)
}

fn read_payload(input: &mut &[u8]) -> Result<TransactionBody, CodecError> {
    let v = read_u8(input)?;
    if v != PAYLOAD_VERSION {
        return Err(CodecError::InvalidVersion);
    }
    let script = read_bytes(input)?;
    let n_args = read_count(input)?;
    let mut arguments = Vec::new();
    for _ in 0..n_args {
        arguments.push(read_bytes(input)?);
    }
    let proposal_key = ProposalKey {
        address: read_address(input)?,
        key_index: read_u32_le(input)?,
        sequence_number: read_u64_le(input)?,
    };
    let payer = read_address(input)?;
    let n_auth = read_count(input)?;
    let mut authorizers = Vec::new();
    for _ in 0..n_auth {
        authorizers.push(read_address(input)?);
    }
    let gas_limit = read_u64_le(input)?;

    Ok(TransactionBody {
        script,
        arguments,
        proposal_key,
        payer,
        authorizers,
        gas_limit,
    })
}

pub fn decode_payload(bytes: &[u8]) -> Result<TransactionBody, CodecError> {
    let mut input = bytes;
    let body = read_payload(&mut input)?;
    finish(input)?;
    Ok(body)
}

pub fn decode_signed(bytes: &[u8]) -> Result<SignedTransaction, CodecError> {
    let mut input = bytes;
    let body = read_payload(&mut input)?;
    let payload_signatures = read_signatures(&mut input)?;
    let envelope_signatures = read_signatures(&mut input)?;
    finish(input)?;

    Ok(SignedTransaction {
        body,
        payload_signatures,
        envelope_signatures,
    })
}

/// Transaction id: blake3 over the canonical signed encoding.
pub fn tx_id(tx: &SignedTransaction) -> Result<TxId, CodecError> {
    let signed = encode_signed(tx)?;
    Ok(TxId(*blake3::hash(&signed).as_bytes()))
}

/// Encodes the key list argument of an account-creation transaction.
pub fn encode_account_keys(keys: &[AccountKey]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    write_count(&mut out, keys.len())?;
    for key in keys {
        write_u8(&mut out, key.sign_algo as u8);
        write_u8(&mut out, key.hash_algo as u8);
        write_u32_le(&mut out, key.weight);
        write_bytes(&mut out, &key.public_key)?;
    }
    Ok(out)
}

pub fn decode_account_keys(bytes: &[u8]) -> Result<Vec<AccountKey>, CodecError> {
    let mut input = bytes;
    let n = read_count(&mut input)?;
    let mut keys = Vec::new();
    for _ in 0..n {
        let s = read_u8(&mut input)?;
        let sign_algo =
            SignatureAlgorithm::from_u8(s).ok_or(CodecError::InvalidSignatureAlgorithm(s))?;
        let h = read_u8(&mut input)?;
        let hash_algo = HashAlgorithm::from_u8(h).ok_or(CodecError::InvalidHashAlgorithm(h))?;
        let weight = read_u32_le(&mut input)?;
        let public_key = read_bytes(&mut input)?;
        keys.push(AccountKey {
            public_key,
            sign_algo,
            hash_algo,
            weight,
        });
    }
    finish(input)?;
    Ok(keys)
}

/// Encodes the optional bootstrap code argument: tag 0 for none, tag 1
/// followed by length-prefixed bytes.
pub fn encode_account_code(code: Option<&[u8]>) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    match code {
        None => write_u8(&mut out, 0),
        Some(c) => {
            write_u8(&mut out, 1);
            write_bytes(&mut out, c)?;
        }
    }
    Ok(out)
}

pub fn decode_account_code(bytes: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
    let mut input = bytes;
    let code = match read_u8(&mut input)? {
        0 => None,
        1 => Some(read_bytes(&mut input)?),
        t => return Err(CodecError::InvalidTag(t)),
    };
    finish(input)?;
    Ok(code)
}

/// Payload of the account-creation event: the raw address bytes.
pub fn encode_account_created(address: &Address) -> Vec<u8> {
    address.as_bytes().to_vec()
}

pub fn decode_account_created(payload: &[u8]) -> Result<Address, CodecError> {
    let mut input = payload;
    let address = read_address(&mut input)?;
    finish(input)?;
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> TransactionBody {
        TransactionBody {
            script: b"script".to_vec(),
            arguments: vec![vec![1, 2], vec![]],
            proposal_key: ProposalKey {
                address: Address([0x11; 8]),
                key_index: 0,
                sequence_number: 3,
            },
            payer: Address([0x11; 8]),
            authorizers: vec![Address([0x11; 8])],
            gas_limit: 100,
        }
    }

    fn sig(byte: u8) -> TransactionSignature {
        TransactionSignature {
            address: Address([byte; 8]),
            key_index: 1,
            signature: vec![byte; 64],
        }
    }

    #[test]
    fn signed_decode_restores_signatures() {
        let tx = SignedTransaction {
            body: body(),
            payload_signatures: vec![sig(0x22)],
            envelope_signatures: vec![sig(0x33)],
        };
        let bytes = encode_signed(&tx).unwrap();
        assert_eq!(decode_signed(&bytes).unwrap(), tx);
    }

    #[test]
    fn envelope_extends_payload_and_signed_extends_envelope() {
        let tx = SignedTransaction {
            body: body(),
            payload_signatures: vec![sig(0x22)],
            envelope_signatures: vec![sig(0x33)],
        };
        let payload = encode_payload(&tx.body).unwrap();
        let envelope = encode_envelope(&tx).unwrap();
        let signed = encode_signed(&tx).unwrap();
        assert!(envelope.starts_with(&payload));
        assert!(signed.starts_with(&envelope));
        assert!(signed.len() > envelope.len());
    }

    #[test]
    fn tx_id_changes_with_signatures() {
        let unsigned = SignedTransaction::new(body());
        let mut signed = unsigned.clone();
        signed.envelope_signatures.push(sig(0x44));
        assert_ne!(tx_id(&unsigned).unwrap(), tx_id(&signed).unwrap());
        assert_eq!(tx_id(&signed).unwrap(), tx_id(&signed.clone()).unwrap());
    }

    #[test]
    fn truncated_and_padded_inputs_are_rejected() {
        let bytes = encode_signed(&SignedTransaction::new(body())).unwrap();
        assert_eq!(
            decode_signed(&bytes[..bytes.len() - 1]),
            Err(CodecError::UnexpectedEof)
        );

        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(decode_signed(&padded), Err(CodecError::TrailingBytes));

        let mut wrong_version = bytes;
        wrong_version[0] = 9;
        assert_eq!(decode_signed(&wrong_version), Err(CodecError::InvalidVersion));
    }

    #[test]
    fn account_keys_reject_unknown_algorithm_tags() {
        let keys = vec![AccountKey {
            public_key: vec![7; 32],
            sign_algo: SignatureAlgorithm::Ed25519,
            hash_algo: HashAlgorithm::Sha2_256,
            weight: 1000,
        }];
        let mut bytes = encode_account_keys(&keys).unwrap();
        assert_eq!(decode_account_keys(&bytes).unwrap(), keys);

        // first key's signature algorithm tag sits right after the count
        bytes[4] = 0xff;
        assert_eq!(
            decode_account_keys(&bytes),
            Err(CodecError::InvalidSignatureAlgorithm(0xff))
        );
    }

    #[test]
    fn account_code_distinguishes_none_from_empty() {
        let none = encode_account_code(None).unwrap();
        let empty = encode_account_code(Some(b"")).unwrap();
        assert_ne!(none, empty);
        assert_eq!(decode_account_code(&none).unwrap(), None);
        assert_eq!(decode_account_code(&empty).unwrap(), Some(Vec::new()));
        assert_eq!(decode_account_code(&[2]), Err(CodecError::InvalidTag(2)));
    }

    #[test]
    fn account_created_payload_must_be_exactly_one_address() {
        let a = Address([0xab, 0xcd, 0, 0, 0, 0, 0, 1]);
        assert_eq!(decode_account_created(&encode_account_created(&a)).unwrap(), a);
        assert_eq!(
            decode_account_created(&[1, 2, 3]),
            Err(CodecError::UnexpectedEof)
        );
        assert_eq!(
            decode_account_created(&[0; 9]),
            Err(CodecError::TrailingBytes)
        );
    }
}
