//! Error types for the account validator.

use crate::config::SoapVersion;
use thiserror::Error;

/// Boxed cause carried by a [`ValidationFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// XML parsing and serialization errors.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML parsing error: {0}")]
    Parse(String),

    #[error("DOCTYPE declarations are not allowed")]
    DoctypeDetected,

    #[error("External entity references are not allowed")]
    ExternalEntityDetected,

    #[error("Entity reference not allowed: {0}")]
    EntityReference(String),

    #[error("Processing instructions are not allowed")]
    ProcessingInstructionDetected,

    #[error("Unbound namespace prefix: {0}")]
    UnboundPrefix(String),

    #[error("Insecure XML parser configuration: {0} must be enabled")]
    InsecureParser(&'static str),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("XML serialization error: {0}")]
    Serialize(String),
}

/// Response template loading errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Response template missing: {0}")]
    Missing(String),

    #[error("Failed to read response template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid response template: {0}")]
    Xml(#[from] XmlError),
}

/// Errors applying resolved fields to a template.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("Response template has no element at {0}")]
    MissingNode(String),
}

/// Failure kinds visible to callers of the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// Request failed structural checks, or the response template is unusable
    SchemaValidation,
    /// No known account matched, or the response could not be produced
    AccountValidation,
}

impl FailureCode {
    /// Get the string code for this failure.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaValidation => "SCHEMA_VALIDATION",
            Self::AccountValidation => "ACCOUNT_VALIDATION",
        }
    }
}

/// The two failures a validation call can end in.
#[derive(Error, Debug)]
pub enum ValidationFailure {
    #[error("Schema validation failed: {message}")]
    SchemaValidation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Account validation failed: {message}")]
    AccountValidation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ValidationFailure {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            message: message.into(),
            source: None,
        }
    }

    pub fn schema_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SchemaValidation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn account(message: impl Into<String>) -> Self {
        Self::AccountValidation {
            message: message.into(),
            source: None,
        }
    }

    pub fn account_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::AccountValidation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn code(&self) -> FailureCode {
        match self {
            Self::SchemaValidation { .. } => FailureCode::SchemaValidation,
            Self::AccountValidation { .. } => FailureCode::AccountValidation,
        }
    }

    /// Human-readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::SchemaValidation { message, .. } | Self::AccountValidation { message, .. } => {
                message
            }
        }
    }
}

/// SOAP Fault version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapFaultVersion {
    Soap11,
    Soap12,
}

impl From<SoapVersion> for SoapFaultVersion {
    fn from(version: SoapVersion) -> Self {
        match version {
            SoapVersion::Soap11 => Self::Soap11,
            SoapVersion::Soap12 => Self::Soap12,
        }
    }
}

/// Generate a SOAP Fault response for a validation failure.
///
/// Schema failures are reported as the client's fault, account failures as the
/// server's.
pub fn soap_fault_response(failure: &ValidationFailure, soap_version: Option<SoapFaultVersion>) -> String {
    let version = soap_version.unwrap_or(SoapFaultVersion::Soap11);

    match version {
        SoapFaultVersion::Soap11 => soap_11_fault(failure),
        SoapFaultVersion::Soap12 => soap_12_fault(failure),
    }
}

fn soap_11_fault(failure: &ValidationFailure) -> String {
    let fault_code = match failure.code() {
        FailureCode::SchemaValidation => "soap:Client",
        FailureCode::AccountValidation => "soap:Server",
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>{}</faultcode>
      <faultstring>{}</faultstring>
      <detail>
{}
      </detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        fault_code,
        xml_escape(failure.message()),
        fault_detail(failure)
    )
}

fn soap_12_fault(failure: &ValidationFailure) -> String {
    let fault_code = match failure.code() {
        FailureCode::SchemaValidation => "soap:Sender",
        FailureCode::AccountValidation => "soap:Receiver",
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <soap:Fault>
      <soap:Code>
        <soap:Value>{}</soap:Value>
      </soap:Code>
      <soap:Reason>
        <soap:Text xml:lang="en">{}</soap:Text>
      </soap:Reason>
      <soap:Detail>
{}
      </soap:Detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        fault_code,
        xml_escape(failure.message()),
        fault_detail(failure)
    )
}

fn fault_detail(failure: &ValidationFailure) -> String {
    format!(
        "        <zentinel:failure xmlns:zentinel=\"urn:zentinel:account:validation\" code=\"{}\">{}</zentinel:failure>",
        failure.code().as_str(),
        xml_escape(failure.message())
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
