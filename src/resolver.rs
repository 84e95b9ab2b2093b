//! Response resolution over the rule table.

use crate::matcher::{matches, RequestParams};
use crate::rules::{ResponseConfig, RuleTable};
use tracing::debug;

/// Find the response configuration for the first profile matching `params`.
///
/// Profiles are disjoint by identifier, so the first match is the only match.
/// `None` means the account is unknown, which is an expected outcome.
pub fn resolve(params: &RequestParams, rule_table: &RuleTable) -> Option<ResponseConfig> {
    let found = rule_table
        .profiles()
        .iter()
        .find(|profile| matches(profile, params));

    match found {
        Some(profile) => {
            debug!(
                reference = profile.reference_identifier,
                status = profile.status.as_str(),
                switching = profile.switching.as_str(),
                modulus = profile.modulus.as_str(),
                "Account profile matched"
            );
            Some(profile.response_config())
        }
        None => {
            debug!(
                code_type = ?params.code_type(),
                identifier_length = params.identifier_length(),
                "No account profile matched"
            );
            None
        }
    }
}
