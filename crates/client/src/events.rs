use onboard_codec::decode_account_created;
use onboard_types::{Address, TransactionResult, TransactionStatus, EVENT_ACCOUNT_CREATED};

use crate::error::ClientError;

/// Address from the first account-creation event of a sealed result.
///
/// `Ok(None)` means the transaction sealed without creating an account. It is
/// never collapsed into a zero address.
pub fn find_created_address(result: &TransactionResult) -> Result<Option<Address>, ClientError> {
    if result.status != TransactionStatus::Sealed {
        return Err(ClientError::NotSealed(result.status));
    }

    result
        .events
        .iter()
        .find(|e| e.type_tag == EVENT_ACCOUNT_CREATED)
        .map(|e| decode_account_created(&e.payload).map_err(ClientError::EventDecode))
        .transpose()
}
