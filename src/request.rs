//! Inbound request model and SOAP request parsing.
//!
//! Parsing performs the structural checks the deployed service gets from XSD
//! validation and reports the first violation as a schema failure.

use crate::config::{SoapVersion, XxePreventionConfig};
use crate::error::{ValidationFailure, XmlError};
use crate::matcher::{CodeType, RequestParams};
use crate::xml::{Element, SecureParser};

/// SOAP namespace URIs.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Maximum identifier length accepted by the request schema.
pub const MAX_IDENTIFIER_LENGTH: usize = 34;

/// A validate-arrangement request as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateArrangementRequest {
    pub arrangement_identifier: ArrangementIdentifier,
}

/// Identifier of the arrangement being validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangementIdentifier {
    pub identifier: Option<String>,
    pub context: IdentifierContext,
}

/// Classification of the supplied identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierContext {
    pub code_value: String,
}

impl ValidateArrangementRequest {
    pub fn new(identifier: Option<&str>, code_value: &str) -> Self {
        Self {
            arrangement_identifier: ArrangementIdentifier {
                identifier: identifier.map(str::to_string),
                context: IdentifierContext {
                    code_value: code_value.to_string(),
                },
            },
        }
    }

    /// Matching inputs for this request.
    pub fn params(&self) -> RequestParams {
        let id = &self.arrangement_identifier;
        RequestParams::new(id.identifier.as_deref(), &id.context.code_value)
    }
}

/// A parsed SOAP request envelope.
#[derive(Debug, Clone)]
pub struct SoapRequest {
    /// Detected SOAP version
    pub version: SoapVersion,
    /// Local name of the operation element in the Body
    pub operation: String,
    /// Structured request
    pub request: ValidateArrangementRequest,
}

/// Parses SOAP request envelopes into structured requests.
#[derive(Debug, Clone)]
pub struct RequestParser {
    parser: SecureParser,
}

impl RequestParser {
    pub fn new(xxe: &XxePreventionConfig) -> Result<Self, XmlError> {
        Ok(Self {
            parser: SecureParser::new(xxe)?,
        })
    }

    /// Parse raw bytes as a validate-arrangement SOAP request.
    pub fn parse(&self, data: &[u8]) -> Result<SoapRequest, ValidationFailure> {
        let document = self
            .parser
            .parse(data)
            .map_err(|e| ValidationFailure::schema_with_source(format!("Invalid XML: {}", e), e))?;

        let envelope = document.root();
        let version = match (envelope.local_name(), envelope.namespace()) {
            ("Envelope", Some(SOAP_11_NS)) => SoapVersion::Soap11,
            ("Envelope", Some(SOAP_12_NS)) => SoapVersion::Soap12,
            _ => {
                return Err(ValidationFailure::schema(
                    "No valid SOAP Envelope found with recognized namespace",
                ))
            }
        };

        let body = envelope
            .child_elements()
            .find(|el| el.local_name() == "Body" && el.namespace() == envelope.namespace())
            .ok_or_else(|| ValidationFailure::schema("SOAP Body is required but not present"))?;

        let operation = body
            .child_elements()
            .next()
            .ok_or_else(|| ValidationFailure::schema("SOAP Body must contain an operation element"))?;

        let request = read_request(operation)?;

        Ok(SoapRequest {
            version,
            operation: operation.local_name().to_string(),
            request,
        })
    }
}

fn read_request(operation: &Element) -> Result<ValidateArrangementRequest, ValidationFailure> {
    let arrangement = operation
        .find_path(&["arrangementIdentifier"])
        .ok_or_else(|| missing_element("arrangementIdentifier"))?;

    let code_value = arrangement
        .child("context")
        .and_then(|context| context.child("codeValue"))
        .ok_or_else(|| missing_element("context/codeValue"))?
        .text();

    if CodeType::from_code_value(&code_value).is_none() {
        return Err(ValidationFailure::schema(format!(
            "Value '{}' of element 'codeValue' is not one of [{}, {}]",
            code_value,
            CodeType::International.as_str(),
            CodeType::Domestic.as_str()
        )));
    }

    let identifier = arrangement.child("identifier").map(Element::text);
    if let Some(ref id) = identifier {
        let length = id.chars().count();
        if length > MAX_IDENTIFIER_LENGTH {
            return Err(ValidationFailure::schema(format!(
                "Value of element 'identifier' has length {}, maximum is {}",
                length, MAX_IDENTIFIER_LENGTH
            )));
        }
    }

    Ok(ValidateArrangementRequest {
        arrangement_identifier: ArrangementIdentifier {
            identifier,
            context: IdentifierContext { code_value },
        },
    })
}

fn missing_element(path: &str) -> ValidationFailure {
    ValidationFailure::schema(format!("Element '{}' is required but not present", path))
}
