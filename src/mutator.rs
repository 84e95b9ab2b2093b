//! Applies a resolved configuration to a response template.

use crate::error::MutationError;
use crate::rules::ResponseConfig;
use crate::xml::Document;
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every generated transaction id.
pub const TRANSACTION_ID_PREFIX: &str = "3flS";
/// Suffix of every generated transaction id.
pub const TRANSACTION_ID_SUFFIX: &str = "h";

pub const TRANSACTION_ID_PATH: &[&str] = &["transactionId"];
pub const ACCOUNT_STATUS_PATH: &[&str] = &["accountingUnits", "status", "codeValue"];
pub const SWITCHING_STATUS_PATH: &[&str] = &["switchingStatus", "codeValue"];
pub const MODULUS_CHECK_PATH: &[&str] = &["modulusCheckStatus", "codeValue"];

/// Generate a transaction id: prefix, 32 hex digits of a random v4 UUID, suffix.
pub fn generate_transaction_id() -> String {
    format!(
        "{}{}{}",
        TRANSACTION_ID_PREFIX,
        Uuid::new_v4().simple(),
        TRANSACTION_ID_SUFFIX
    )
}

/// Writes response fields into template documents.
#[derive(Debug, Clone, Default)]
pub struct ResponseMutator {
    require_all_fields: bool,
}

impl ResponseMutator {
    /// Create a mutator. With `require_all_fields` a missing target element is
    /// an error; otherwise the write is skipped.
    pub fn new(require_all_fields: bool) -> Self {
        Self { require_all_fields }
    }

    /// Write a fresh transaction id and the three status fields into `document`.
    ///
    /// Returns the transaction id that was generated.
    pub fn apply(&self, document: &mut Document, config: &ResponseConfig) -> Result<String, MutationError> {
        let transaction_id = generate_transaction_id();

        self.write(document, TRANSACTION_ID_PATH, &transaction_id)?;
        self.write(document, ACCOUNT_STATUS_PATH, config.status.as_str())?;
        self.write(document, SWITCHING_STATUS_PATH, config.switching.as_str())?;
        self.write(document, MODULUS_CHECK_PATH, config.modulus.as_str())?;

        debug!(
            transaction_id = %transaction_id,
            status = config.status.as_str(),
            switching = config.switching.as_str(),
            modulus = config.modulus.as_str(),
            "Response template populated"
        );

        Ok(transaction_id)
    }

    fn write(&self, document: &mut Document, path: &[&str], value: &str) -> Result<(), MutationError> {
        match document.find_path_mut(path) {
            Some(element) => {
                element.set_text(value);
                Ok(())
            }
            None if self.require_all_fields => Err(MutationError::MissingNode(path.join("/"))),
            None => {
                warn!(path = %path.join("/"), "Response template element not found, skipping");
                Ok(())
            }
        }
    }
}
