//! Account creation against a ledger node.
//!
//! The pipeline reads the payer's current sequence number, builds the
//! account-creation transaction, signs its envelope, submits it, waits for it
//! to seal and pulls the new address out of the emitted event. Each stage is
//! also usable on its own; [`submit_account_creation`] and
//! [`await_created_address`] split the flow at the point where a transaction
//! id exists, so a caller can persist the id and resume waiting later.

pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod finality;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod network;
pub mod pipeline;
pub mod script;
pub mod submit;

pub use builder::{CreateAccountBuilder, CREATE_ACCOUNT_SCRIPT};
pub use config::{ConfigError, FinalityConfig, PayerConfig, PipelineConfig};
pub use error::{ClientError, NetworkError};
pub use events::find_created_address;
pub use finality::{wait_for_finality, wait_until, FinalityPolicy};
pub use network::{Connector, Network};
pub use pipeline::{
    await_created_address, create_account, create_account_at, submit_account_creation,
    CreatedAccount, Payer,
};
pub use script::execute_script;
pub use submit::submit;
