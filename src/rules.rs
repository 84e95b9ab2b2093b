//! Known account profiles and their status outcomes.
//!
//! The table is a compile-time constant. It is never reloaded or mutated, so it
//! can be read from any number of threads without synchronization.

/// Account status reported for a matched arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    DomesticRestricted,
    DomesticUnrestricted,
}

impl AccountStatus {
    /// Canonical display string written into the response.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomesticRestricted => "Domestic - Restricted",
            Self::DomesticUnrestricted => "Domestic - Unrestricted",
        }
    }
}

/// Current account switching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchingStatus {
    Switched,
    NotSwitching,
}

impl SwitchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switched => "Switched",
            Self::NotSwitching => "Not Switching",
        }
    }
}

/// Outcome of the sort code / account number modulus check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulusCheckStatus {
    Pass,
    Failed,
}

impl ModulusCheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "Passed",
            Self::Failed => "Failed",
        }
    }
}

/// A known account and the statuses reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountProfile {
    /// Canonical 22-character international identifier
    pub reference_identifier: &'static str,
    pub status: AccountStatus,
    pub switching: SwitchingStatus,
    pub modulus: ModulusCheckStatus,
}

impl AccountProfile {
    /// The response fields carried by this profile.
    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig {
            status: self.status,
            switching: self.switching,
            modulus: self.modulus,
        }
    }
}

/// Status fields to write into a response, copied from a matched profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConfig {
    pub status: AccountStatus,
    pub switching: SwitchingStatus,
    pub modulus: ModulusCheckStatus,
}

/// Ordered set of account profiles.
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    profiles: &'static [AccountProfile],
}

impl RuleTable {
    /// Build a table over a static profile list.
    pub const fn new(profiles: &'static [AccountProfile]) -> Self {
        Self { profiles }
    }

    /// Profiles in declaration order.
    pub fn profiles(&self) -> &'static [AccountProfile] {
        self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        RULE_TABLE
    }
}

const PROFILES: [AccountProfile; 4] = [
    AccountProfile {
        reference_identifier: "GB29NWBK60161331926801",
        status: AccountStatus::DomesticRestricted,
        switching: SwitchingStatus::Switched,
        modulus: ModulusCheckStatus::Pass,
    },
    AccountProfile {
        reference_identifier: "GB82WEST12345698765437",
        status: AccountStatus::DomesticRestricted,
        switching: SwitchingStatus::NotSwitching,
        modulus: ModulusCheckStatus::Pass,
    },
    AccountProfile {
        reference_identifier: "GB94BARC10201530093422",
        status: AccountStatus::DomesticUnrestricted,
        switching: SwitchingStatus::Switched,
        modulus: ModulusCheckStatus::Pass,
    },
    AccountProfile {
        reference_identifier: "GB33BUKB20201555555567",
        status: AccountStatus::DomesticUnrestricted,
        switching: SwitchingStatus::NotSwitching,
        modulus: ModulusCheckStatus::Failed,
    },
];

/// The fixed rule table used by the validator.
pub const RULE_TABLE: RuleTable = RuleTable::new(&PROFILES);
