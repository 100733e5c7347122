use crate::error::{NgacError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_ADMIN_MSP: &str = "AdminMSP";
pub const DEFAULT_CATALOG_NAMESPACE: &str = "catalog_coll";
pub const DEFAULT_ROLE_ATTRIBUTE: &str = "blossom.role";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NgacConfig {
    /// The organization whose members administer the catalog
    pub admin_msp: String,

    /// Namespace holding the shared catalog policy
    pub catalog_namespace: String,

    /// Credential attribute naming the caller's role
    pub role_attribute: String,
}

impl Default for NgacConfig {
    fn default() -> Self {
        Self {
            admin_msp: DEFAULT_ADMIN_MSP.to_string(),
            catalog_namespace: DEFAULT_CATALOG_NAMESPACE.to_string(),
            role_attribute: DEFAULT_ROLE_ATTRIBUTE.to_string(),
        }
    }
}

impl NgacConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NgacConfig =
            toml::from_str(content).map_err(|e| NgacError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| NgacError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin_msp.trim().is_empty() {
            return Err(NgacError::Config("admin_msp cannot be empty".to_string()));
        }
        if self.catalog_namespace.trim().is_empty() {
            return Err(NgacError::Config(
                "catalog_namespace cannot be empty".to_string(),
            ));
        }
        if self.catalog_namespace.contains(['/', '\\']) {
            return Err(NgacError::Config(
                "catalog_namespace cannot contain path separators".to_string(),
            ));
        }
        if self.role_attribute.trim().is_empty() {
            return Err(NgacError::Config(
                "role_attribute cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
