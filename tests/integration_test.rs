//! Integration tests for the zentinel-account-validator crate.
//!
//! These tests exercise the public API surface end-to-end, combining request
//! parsing, resolution, response synthesis and fault generation.

use proptest::prelude::*;
use std::collections::HashSet;
use std::io::{self, Write};
use zentinel_account_validator::config::{SoapVersion, XxePreventionConfig};
use zentinel_account_validator::error::{soap_fault_response, SoapFaultVersion};
use zentinel_account_validator::matcher::{last_n_chars, RequestParams};
use zentinel_account_validator::request::{RequestParser, ValidateArrangementRequest};
use zentinel_account_validator::resolver::resolve;
use zentinel_account_validator::rules::RULE_TABLE;
use zentinel_account_validator::xml::{Document, SecureParser};
use zentinel_account_validator::{ArrangementValidator, FailureCode, ValidatorConfig};

const INTERNATIONAL: &str = "InternationalBankAccountNumber";
const DOMESTIC: &str = "UKBasicBankAccountNumber";

// ============================================================================
// Helpers
// ============================================================================

fn validator() -> ArrangementValidator {
    ArrangementValidator::new(&ValidatorConfig::default()).unwrap()
}

fn parse_response(bytes: &[u8]) -> Document {
    SecureParser::new(&XxePreventionConfig::default())
        .unwrap()
        .parse(bytes)
        .unwrap()
}

struct Fields {
    transaction_id: String,
    status: String,
    switching: String,
    modulus: String,
}

fn text(doc: &Document, path: &[&str]) -> String {
    doc.find_path(path).unwrap().text()
}

fn fields(bytes: &[u8]) -> Fields {
    let doc = parse_response(bytes);
    Fields {
        transaction_id: text(&doc, &["transactionId"]),
        status: text(&doc, &["accountingUnits", "status", "codeValue"]),
        switching: text(&doc, &["switchingStatus", "codeValue"]),
        modulus: text(&doc, &["modulusCheckStatus", "codeValue"]),
    }
}

fn respond(identifier: &str, code_value: &str) -> Fields {
    let request = ValidateArrangementRequest::new(Some(identifier), code_value);
    let mut out: Vec<u8> = Vec::new();
    validator().validate(&request, &mut out).unwrap();
    fields(&out)
}

fn is_transaction_id(value: &str) -> bool {
    value.len() == 37
        && value.starts_with("3flS")
        && value.ends_with('h')
        && value[4..36].chars().all(|c| c.is_ascii_hexdigit())
}

fn soap_request(identifier: &str, code_value: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Header/>
  <soapenv:Body>
    <v:validateArrangementForPayment xmlns:v="urn:zentinel:arrangement:validation:v1">
      <request>
        <arrangementIdentifier>
          <identifier>{}</identifier>
          <context>
            <codeValue>{}</codeValue>
          </context>
        </arrangementIdentifier>
      </request>
    </v:validateArrangementForPayment>
  </soapenv:Body>
</soapenv:Envelope>"#,
        identifier, code_value
    )
}

// ============================================================================
// Matching and resolution
// ============================================================================

#[test]
fn test_e2e_international_form_for_every_profile() {
    for profile in RULE_TABLE.profiles() {
        let response = respond(profile.reference_identifier, INTERNATIONAL);
        assert_eq!(response.status, profile.status.as_str());
        assert_eq!(response.switching, profile.switching.as_str());
        assert_eq!(response.modulus, profile.modulus.as_str());
    }
}

#[test]
fn test_e2e_domestic_form_matches_same_profile() {
    for profile in RULE_TABLE.profiles() {
        let domestic = last_n_chars(profile.reference_identifier, 14);
        let international = respond(profile.reference_identifier, INTERNATIONAL);
        let response = respond(domestic, DOMESTIC);
        assert_eq!(response.status, international.status);
        assert_eq!(response.switching, international.switching);
        assert_eq!(response.modulus, international.modulus);
    }
}

#[test]
fn test_e2e_domestic_restricted_switched_passed() {
    let response = respond("60161331926801", DOMESTIC);
    assert_eq!(response.status, "Domestic - Restricted");
    assert_eq!(response.switching, "Switched");
    assert_eq!(response.modulus, "Passed");
}

#[test]
fn test_e2e_unrestricted_not_switching_failed() {
    let response = respond("GB33BUKB20201555555567", INTERNATIONAL);
    assert_eq!(response.status, "Domestic - Unrestricted");
    assert_eq!(response.switching, "Not Switching");
    assert_eq!(response.modulus, "Failed");
}

#[test]
fn test_e2e_unknown_account_fails() {
    let request = ValidateArrangementRequest::new(Some("GB00XXXX00000000000000"), INTERNATIONAL);
    let failure = validator().validate(&request, &mut io::sink()).unwrap_err();
    assert_eq!(failure.code(), FailureCode::AccountValidation);
    assert!(failure.to_string().contains("account not found"));
}

#[test]
fn test_e2e_mismatched_code_type_fails() {
    let request = ValidateArrangementRequest::new(Some("60161331926801"), INTERNATIONAL);
    let failure = validator().validate(&request, &mut io::sink()).unwrap_err();
    assert_eq!(failure.code(), FailureCode::AccountValidation);

    let request = ValidateArrangementRequest::new(None, DOMESTIC);
    let failure = validator().validate(&request, &mut io::sink()).unwrap_err();
    assert_eq!(failure.message(), "account not found");
}

#[test]
fn test_e2e_resolution_is_stable() {
    let params = RequestParams::new(Some("GB94BARC10201530093422"), INTERNATIONAL);
    assert_eq!(resolve(&params, &RULE_TABLE), resolve(&params, &RULE_TABLE));

    let first = respond("GB94BARC10201530093422", INTERNATIONAL);
    let second = respond("GB94BARC10201530093422", INTERNATIONAL);
    assert_eq!(first.status, second.status);
    assert_eq!(first.switching, second.switching);
    assert_eq!(first.modulus, second.modulus);
    assert_ne!(first.transaction_id, second.transaction_id);
}

// ============================================================================
// Transaction ids and isolation
// ============================================================================

#[test]
fn test_e2e_transaction_id_format_and_uniqueness() {
    let validator = validator();
    let request = ValidateArrangementRequest::new(Some("12345698765437"), DOMESTIC);

    let mut seen = HashSet::new();
    for _ in 0..50 {
        let mut out: Vec<u8> = Vec::new();
        let outcome = validator.validate(&request, &mut out).unwrap();
        let written = fields(&out).transaction_id;
        assert_eq!(written, outcome.transaction_id);
        assert!(is_transaction_id(&written), "unexpected transaction id {}", written);
        assert!(seen.insert(written));
    }
}

#[test]
fn test_e2e_concurrent_calls_are_isolated() {
    let validator = validator();
    let cases = [
        ("GB29NWBK60161331926801", INTERNATIONAL, "Domestic - Restricted", "Switched", "Passed"),
        ("20201555555567", DOMESTIC, "Domestic - Unrestricted", "Not Switching", "Failed"),
    ];

    std::thread::scope(|scope| {
        for (identifier, code_value, status, switching, modulus) in cases {
            let validator = &validator;
            scope.spawn(move || {
                let request = ValidateArrangementRequest::new(Some(identifier), code_value);
                for _ in 0..25 {
                    let mut out: Vec<u8> = Vec::new();
                    validator.validate(&request, &mut out).unwrap();
                    let response = fields(&out);
                    assert_eq!(response.status, status);
                    assert_eq!(response.switching, switching);
                    assert_eq!(response.modulus, modulus);
                }
            });
        }
    });
}

// ============================================================================
// Template configuration
// ============================================================================

#[test]
fn test_e2e_template_file_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"<?xml version="1.0"?>
<r:reply xmlns:r="urn:test">
  <r:transactionId/>
  <r:accountingUnits><r:status><r:codeValue/></r:status></r:accountingUnits>
  <r:switchingStatus><r:codeValue/></r:switchingStatus>
  <r:modulusCheckStatus><r:codeValue/></r:modulusCheckStatus>
</r:reply>"#
    )
    .unwrap();

    let mut config = ValidatorConfig::default();
    config.template.path = Some(file.path().to_path_buf());

    let request = ValidateArrangementRequest::new(Some("GB82WEST12345698765437"), INTERNATIONAL);
    let mut out: Vec<u8> = Vec::new();
    ArrangementValidator::new(&config)
        .unwrap()
        .validate(&request, &mut out)
        .unwrap();

    let response = fields(&out);
    assert_eq!(parse_response(&out).root().name(), "r:reply");
    assert_eq!(response.status, "Domestic - Restricted");
    assert_eq!(response.switching, "Not Switching");
    assert!(is_transaction_id(&response.transaction_id));
}

#[test]
fn test_e2e_incomplete_template() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "<reply><transactionId/></reply>").unwrap();

    let mut config = ValidatorConfig::default();
    config.template.path = Some(file.path().to_path_buf());
    let request = ValidateArrangementRequest::new(Some("GB82WEST12345698765437"), INTERNATIONAL);

    // Missing targets are skipped by default.
    let mut out: Vec<u8> = Vec::new();
    ArrangementValidator::new(&config)
        .unwrap()
        .validate(&request, &mut out)
        .unwrap();
    let written = text(&parse_response(&out), &["transactionId"]);
    assert!(is_transaction_id(&written));

    config.mutation.require_all_fields = true;
    let failure = ArrangementValidator::new(&config)
        .unwrap()
        .validate(&request, &mut io::sink())
        .unwrap_err();
    assert_eq!(failure.code(), FailureCode::AccountValidation);
    assert!(failure.message().contains("accountingUnits/status/codeValue"));
}

#[test]
fn test_e2e_insecure_configuration_refused() {
    let mut config = ValidatorConfig::default();
    config.xxe_prevention.block_doctype = false;
    assert!(ArrangementValidator::new(&config).is_err());
}

// ============================================================================
// Request parsing through to faults
// ============================================================================

#[test]
fn test_e2e_soap_request_to_response() {
    let parser = RequestParser::new(&XxePreventionConfig::default()).unwrap();
    let parsed = parser
        .parse(soap_request("82WEST12345698765437", DOMESTIC).as_bytes())
        .unwrap();
    assert_eq!(parsed.version, SoapVersion::Soap11);

    // 20 characters: neither form, so no account matches
    let failure = validator()
        .validate(&parsed.request, &mut io::sink())
        .unwrap_err();
    assert_eq!(failure.code(), FailureCode::AccountValidation);

    let parsed = parser
        .parse(soap_request("12345698765437", DOMESTIC).as_bytes())
        .unwrap();
    let mut out: Vec<u8> = Vec::new();
    validator().validate(&parsed.request, &mut out).unwrap();
    assert_eq!(fields(&out).switching, "Not Switching");
}

#[test]
fn test_e2e_schema_failure_fault() {
    let parser = RequestParser::new(&XxePreventionConfig::default()).unwrap();
    let failure = parser
        .parse(soap_request("GB29NWBK60161331926801", "IBAN").as_bytes())
        .unwrap_err();
    assert_eq!(failure.code(), FailureCode::SchemaValidation);

    let fault = soap_fault_response(&failure, Some(SoapFaultVersion::Soap11));
    assert!(fault.contains("<faultcode>soap:Client</faultcode>"));
    assert!(fault.contains("SCHEMA_VALIDATION"));
    assert!(fault.contains("Value &apos;IBAN&apos;"));
}

#[test]
fn test_e2e_account_failure_fault() {
    let request = ValidateArrangementRequest::new(Some("GB00XXXX00000000000000"), INTERNATIONAL);
    let failure = validator().validate(&request, &mut io::sink()).unwrap_err();

    let fault = soap_fault_response(&failure, Some(SoapFaultVersion::Soap12));
    assert!(fault.contains("http://www.w3.org/2003/05/soap-envelope"));
    assert!(fault.contains("soap:Receiver"));
    assert!(fault.contains("ACCOUNT_VALIDATION"));
    assert!(fault.contains("account not found"));

    // The fault itself is well-formed XML
    let doc = parse_response(fault.as_bytes());
    assert_eq!(doc.root().local_name(), "Envelope");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_unknown_identifiers_never_resolve(identifier in "[A-Z0-9]{1,30}", domestic in any::<bool>()) {
        let known = RULE_TABLE.profiles().iter().any(|p| {
            p.reference_identifier == identifier || last_n_chars(p.reference_identifier, 14) == identifier
        });
        prop_assume!(!known);

        let code_value = if domestic { DOMESTIC } else { INTERNATIONAL };
        let params = RequestParams::new(Some(identifier.as_str()), code_value);
        prop_assert!(resolve(&params, &RULE_TABLE).is_none());
    }

    #[test]
    fn prop_lowercased_identifiers_never_resolve(index in 0usize..4) {
        let profile = RULE_TABLE.profiles()[index];
        let lowered = profile.reference_identifier.to_lowercase();
        let params = RequestParams::new(Some(lowered.as_str()), INTERNATIONAL);
        prop_assert!(resolve(&params, &RULE_TABLE).is_none());
    }
}
