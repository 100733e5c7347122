//! Caller identity.
//!
//! The values exposed by [`ClientIdentity`] come from a credential that has
//! already been verified by the platform. This module only derives names and
//! roles from them.

use crate::error::{require_non_empty, NgacError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Verified identity of the caller of the current request.
pub trait ClientIdentity {
    /// The caller's organization (membership service provider id).
    fn msp_id(&self) -> Result<String>;

    /// Common name of the caller's certificate subject.
    fn common_name(&self) -> Result<String>;

    /// A verified attribute value, `None` if the credential does not carry it.
    fn attribute(&self, name: &str) -> Result<Option<String>>;
}

/// Canonical user name: `name:organization`.
pub fn format_username(name: &str, msp_id: &str) -> String {
    format!("{}:{}", name, msp_id)
}

/// Resolve the canonical user name of the caller.
pub fn get_user(identity: &dyn ClientIdentity) -> Result<String> {
    let name = identity.common_name()?;
    let msp_id = identity.msp_id()?;
    require_non_empty("common name", &name)?;
    require_non_empty("organization", &msp_id)?;
    Ok(format_username(&name, &msp_id))
}

/// Roles an account member may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    SystemOwner,
    SystemAdministrator,
    AcquisitionSpecialist,
}

impl Role {
    pub const ALL: [Role; 3] = [
        Role::SystemOwner,
        Role::SystemAdministrator,
        Role::AcquisitionSpecialist,
    ];

    /// The role's name, which is also the id of its user attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemOwner => "SystemOwner",
            Role::SystemAdministrator => "SystemAdministrator",
            Role::AcquisitionSpecialist => "AcquisitionSpecialist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = NgacError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| NgacError::InvalidRole(s.to_string()))
    }
}

/// A fixed identity, for callers whose credential has been verified elsewhere
/// and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    common_name: String,
    msp_id: String,
    attributes: HashMap<String, String>,
}

impl StaticIdentity {
    pub fn new(common_name: impl Into<String>, msp_id: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            msp_id: msp_id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl ClientIdentity for StaticIdentity {
    fn msp_id(&self) -> Result<String> {
        Ok(self.msp_id.clone())
    }

    fn common_name(&self) -> Result<String> {
        Ok(self.common_name.clone())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }
}
