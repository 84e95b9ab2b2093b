//! Identifier matching against account profiles.

use crate::rules::AccountProfile;

/// Length of the canonical international identifier.
pub const INTERNATIONAL_LENGTH: usize = 22;
/// Length of the domestic identifier (trailing part of the canonical form).
pub const DOMESTIC_LENGTH: usize = 14;

/// Declared classification of a supplied identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeType {
    /// Full 22-character international form
    International,
    /// Last 14 characters of the international form
    Domestic,
}

impl CodeType {
    /// Code value as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::International => "InternationalBankAccountNumber",
            Self::Domestic => "UKBasicBankAccountNumber",
        }
    }

    /// Parse a wire code value. Matching is exact and case-sensitive.
    pub fn from_code_value(value: &str) -> Option<Self> {
        match value {
            "InternationalBankAccountNumber" => Some(Self::International),
            "UKBasicBankAccountNumber" => Some(Self::Domestic),
            _ => None,
        }
    }
}

/// Matching inputs derived once from an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    identifier: Option<String>,
    code_type: Option<CodeType>,
    identifier_length: usize,
}

impl RequestParams {
    /// Build params from the raw identifier and code value.
    ///
    /// An empty identifier is treated as absent. An unrecognised code value
    /// yields params that never match.
    pub fn new(identifier: Option<&str>, code_value: &str) -> Self {
        let identifier = identifier.filter(|id| !id.is_empty()).map(str::to_string);
        let identifier_length = identifier.as_deref().map_or(0, |id| id.chars().count());

        Self {
            identifier,
            code_type: CodeType::from_code_value(code_value),
            identifier_length,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn code_type(&self) -> Option<CodeType> {
        self.code_type
    }

    /// Identifier length in characters, zero when absent.
    pub fn identifier_length(&self) -> usize {
        self.identifier_length
    }
}

/// Decide whether `params` identifies `profile`.
pub fn matches(profile: &AccountProfile, params: &RequestParams) -> bool {
    let reference = profile.reference_identifier;
    let identifier = match params.identifier() {
        Some(id) if !reference.is_empty() => id,
        _ => return false,
    };

    match (params.code_type(), params.identifier_length()) {
        (Some(CodeType::International), INTERNATIONAL_LENGTH) => identifier == reference,
        (Some(CodeType::Domestic), DOMESTIC_LENGTH) => {
            identifier == last_n_chars(reference, DOMESTIC_LENGTH)
        }
        _ => false,
    }
}

/// Trailing `n` characters of `value`, or all of it when shorter.
pub fn last_n_chars(value: &str, n: usize) -> &str {
    let count = value.chars().count();
    if count <= n {
        return value;
    }
    match value.char_indices().nth(count - n) {
        Some((offset, _)) => &value[offset..],
        None => value,
    }
}
