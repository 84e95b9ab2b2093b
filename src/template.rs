//! Response template loading.
//!
//! Templates are parsed fresh on every load so each call owns its document.

use crate::config::{TemplateConfig, XxePreventionConfig, DEFAULT_TEMPLATE_RESOURCE};
use crate::error::TemplateError;
use crate::xml::{Document, SecureParser};
use std::path::PathBuf;
use tracing::debug;

/// Templates compiled into the binary, keyed by logical path.
const BUNDLED_TEMPLATES: &[(&str, &str)] = &[(
    DEFAULT_TEMPLATE_RESOURCE,
    include_str!("../resources/templates/validate-arrangement-response.xml"),
)];

/// Look up a bundled template by logical path.
pub fn bundled_resource(logical_path: &str) -> Option<&'static str> {
    BUNDLED_TEMPLATES
        .iter()
        .find(|(path, _)| *path == logical_path)
        .map(|(_, content)| *content)
}

/// Where a template is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Bundled resource by logical path
    Bundled(String),
    /// File read on every load
    File(PathBuf),
}

impl TemplateSource {
    pub fn from_config(config: &TemplateConfig) -> Self {
        match &config.path {
            Some(path) => Self::File(path.clone()),
            None => Self::Bundled(config.resource.clone()),
        }
    }
}

/// Loads and parses the response template.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    source: TemplateSource,
    parser: SecureParser,
}

impl TemplateLoader {
    /// Create a loader. Fails if the XXE settings would weaken the parser.
    pub fn new(source: TemplateSource, xxe: &XxePreventionConfig) -> Result<Self, TemplateError> {
        let parser = SecureParser::new(xxe)?;
        Ok(Self { source, parser })
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Load a fresh copy of the template.
    pub fn load(&self) -> Result<Document, TemplateError> {
        match &self.source {
            TemplateSource::Bundled(logical_path) => {
                let content = bundled_resource(logical_path)
                    .ok_or_else(|| TemplateError::Missing(logical_path.clone()))?;
                debug!(resource = %logical_path, "Loading bundled response template");
                Ok(self.parser.parse_str(content)?)
            }
            TemplateSource::File(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        TemplateError::Missing(path.display().to_string())
                    } else {
                        TemplateError::Read {
                            path: path.display().to_string(),
                            source: e,
                        }
                    }
                })?;
                debug!(path = %path.display(), "Loading response template file");
                Ok(self.parser.parse(&data)?)
            }
        }
    }
}
