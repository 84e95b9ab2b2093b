//! Configuration types for the account validator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logical path of the bundled response template.
pub const DEFAULT_TEMPLATE_RESOURCE: &str = "templates/validate-arrangement-response.xml";

/// Main configuration for the account validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Config version
    pub version: String,

    /// General settings
    pub settings: SettingsConfig,

    /// Response template source
    pub template: TemplateConfig,

    /// Response mutation behaviour
    pub mutation: MutationConfig,

    /// XXE prevention for template and request parsing
    pub xxe_prevention: XxePreventionConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: SettingsConfig::default(),
            template: TemplateConfig::default(),
            mutation: MutationConfig::default(),
            xxe_prevention: XxePreventionConfig::default(),
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// SOAP version used for fault envelopes
    pub fault_version: SoapVersion,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            fault_version: SoapVersion::Soap11,
        }
    }
}

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[serde(rename = "1.1")]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

/// Where the response template comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Logical path of a bundled template resource
    pub resource: String,

    /// Filesystem template that replaces the bundled resource
    pub path: Option<PathBuf>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            resource: DEFAULT_TEMPLATE_RESOURCE.to_string(),
            path: None,
        }
    }
}

/// Response mutation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Fail when a target element is missing from the template instead of
    /// skipping the write
    pub require_all_fields: bool,
}

/// XXE (XML External Entity) prevention configuration.
///
/// Every protection except processing-instruction blocking is mandatory;
/// disabling one makes template loading fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XxePreventionConfig {
    /// Enable XXE prevention (must be true)
    pub enabled: bool,

    /// Block DOCTYPE declarations (must be true)
    pub block_doctype: bool,

    /// Block external entity references (must be true)
    pub block_external_entities: bool,

    /// Refuse to expand entity references (must be true)
    pub block_entity_expansion: bool,

    /// Block processing instructions
    pub block_processing_instructions: bool,
}

impl Default for XxePreventionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_doctype: true,
            block_external_entities: true,
            block_entity_expansion: true,
            block_processing_instructions: true,
        }
    }
}
