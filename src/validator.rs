//! Arrangement validation: resolution, response synthesis and failure mapping.

use crate::config::ValidatorConfig;
use crate::error::{TemplateError, ValidationFailure};
use crate::mutator::ResponseMutator;
use crate::request::ValidateArrangementRequest;
use crate::resolver::resolve;
use crate::rules::{ResponseConfig, RuleTable, RULE_TABLE};
use crate::template::{TemplateLoader, TemplateSource};
use std::io::Write;
use tracing::{debug, info, warn};

/// Message carried by the failure for an unknown account.
pub const ACCOUNT_NOT_FOUND: &str = "account not found";

/// Confirms a request passed structural validation before it is resolved.
///
/// Schema validation normally happens in the transport before the validator
/// runs; implementations either re-check or just record that it happened.
pub trait SchemaCheck: Send + Sync {
    fn check(&self, request: &ValidateArrangementRequest) -> Result<(), ValidationFailure>;
}

/// Schema check for requests already validated by the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamSchemaCheck;

impl SchemaCheck for UpstreamSchemaCheck {
    fn check(&self, request: &ValidateArrangementRequest) -> Result<(), ValidationFailure> {
        debug!(
            code_value = %request.arrangement_identifier.context.code_value,
            "Request schema validated upstream"
        );
        Ok(())
    }
}

/// Progress of a single validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Start,
    SchemaOk,
    Resolved,
    Mutated,
    Serialized,
}

impl ValidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SchemaOk => "schema_ok",
            Self::Resolved => "resolved",
            Self::Mutated => "mutated",
            Self::Serialized => "serialized",
        }
    }
}

/// Result of a successful validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Transaction id written into the response
    pub transaction_id: String,
    /// Status fields written into the response
    pub response: ResponseConfig,
    /// Bytes written to the sink
    pub bytes_written: usize,
}

/// Validates arrangement requests and writes synthesized responses.
///
/// Holds no per-call state; one instance can serve concurrent calls.
pub struct ArrangementValidator {
    rule_table: RuleTable,
    loader: TemplateLoader,
    mutator: ResponseMutator,
    schema_check: Box<dyn SchemaCheck>,
}

impl ArrangementValidator {
    /// Create a validator from configuration.
    ///
    /// Fails if the XXE settings would weaken template parsing.
    pub fn new(config: &ValidatorConfig) -> Result<Self, TemplateError> {
        let loader = TemplateLoader::new(
            TemplateSource::from_config(&config.template),
            &config.xxe_prevention,
        )?;

        info!(
            template = ?loader.source(),
            require_all_fields = config.mutation.require_all_fields,
            profiles = RULE_TABLE.len(),
            "Arrangement validator initialized"
        );

        Ok(Self {
            rule_table: RULE_TABLE,
            loader,
            mutator: ResponseMutator::new(config.mutation.require_all_fields),
            schema_check: Box::new(UpstreamSchemaCheck),
        })
    }

    /// Replace the schema check step.
    pub fn with_schema_check(mut self, check: impl SchemaCheck + 'static) -> Self {
        self.schema_check = Box::new(check);
        self
    }

    /// Replace the rule table.
    pub fn with_rule_table(mut self, rule_table: RuleTable) -> Self {
        self.rule_table = rule_table;
        self
    }

    /// Validate `request` and write the response document to `sink`.
    ///
    /// Every failure is one of the two [`ValidationFailure`] kinds.
    pub fn validate<W: Write + ?Sized>(
        &self,
        request: &ValidateArrangementRequest,
        sink: &mut W,
    ) -> Result<ValidationOutcome, ValidationFailure> {
        debug!(stage = ValidationStage::Start.as_str(), "Validating arrangement request");

        self.schema_check.check(request)?;
        debug!(stage = ValidationStage::SchemaOk.as_str(), "Schema check passed");

        let params = request.params();
        let response = resolve(&params, &self.rule_table).ok_or_else(|| {
            warn!(
                code_type = ?params.code_type(),
                identifier_length = params.identifier_length(),
                "Arrangement validation failed: {}",
                ACCOUNT_NOT_FOUND
            );
            ValidationFailure::account(ACCOUNT_NOT_FOUND)
        })?;
        debug!(stage = ValidationStage::Resolved.as_str(), "Account resolved");

        let mut document = self.loader.load().map_err(|e| {
            warn!(error = %e, "Response template unavailable");
            ValidationFailure::schema_with_source(format!("Unable to load response template: {}", e), e)
        })?;

        let transaction_id = self.mutator.apply(&mut document, &response).map_err(|e| {
            ValidationFailure::account_with_source(format!("Failed to populate response: {}", e), e)
        })?;
        debug!(
            stage = ValidationStage::Mutated.as_str(),
            transaction_id = %transaction_id,
            "Response populated"
        );

        let bytes = document.to_bytes().map_err(|e| {
            ValidationFailure::account_with_source(format!("Failed to serialize response: {}", e), e)
        })?;
        sink.write_all(&bytes)
            .and_then(|_| sink.flush())
            .map_err(|e| {
                ValidationFailure::account_with_source(format!("Failed to write response: {}", e), e)
            })?;

        debug!(
            stage = ValidationStage::Serialized.as_str(),
            transaction_id = %transaction_id,
            bytes = bytes.len(),
            "Response written"
        );

        Ok(ValidationOutcome {
            transaction_id,
            response,
            bytes_written: bytes.len(),
        })
    }
}
