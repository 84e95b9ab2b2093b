//! Account arrangement validation responder for Zentinel
//!
//! Matches an arrangement identifier against a fixed table of known accounts
//! and, on a match, synthesizes a SOAP response from a bundled XML template.
//!
//! # Features
//!
//! - Identifier matching in international (22 character) and domestic
//!   (trailing 14 character) forms
//! - Response synthesis with a fresh transaction id per call
//! - Hardened template parsing (no DOCTYPE, no entity expansion)
//! - Exactly two failure kinds: schema validation and account validation
//! - SOAP Fault response generation
//!
//! # Example
//!
//! ```ignore
//! use zentinel_account_validator::{ArrangementValidator, ValidatorConfig};
//! use zentinel_account_validator::request::ValidateArrangementRequest;
//!
//! let validator = ArrangementValidator::new(&ValidatorConfig::default())?;
//! let request = ValidateArrangementRequest::new(
//!     Some("60161331926801"),
//!     "UKBasicBankAccountNumber",
//! );
//! let mut response = Vec::new();
//! validator.validate(&request, &mut response)?;
//! ```

pub mod config;
pub mod error;
pub mod matcher;
pub mod mutator;
pub mod request;
pub mod resolver;
pub mod rules;
pub mod template;
pub mod validator;
pub mod xml;

pub use config::ValidatorConfig;
pub use error::{FailureCode, ValidationFailure};
pub use validator::ArrangementValidator;
