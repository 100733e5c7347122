//! Prohibitions: explicit denials that override association grants.

use crate::error::{require_non_empty, NgacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One container a prohibition is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerCondition {
    pub id: String,
    /// When set, the condition holds for targets *outside* the container.
    #[serde(default)]
    pub complement: bool,
}

impl ContainerCondition {
    pub fn inside(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            complement: false,
        }
    }

    pub fn outside(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            complement: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prohibition {
    pub name: String,
    /// A user or user attribute id.
    pub subject: String,
    pub operations: BTreeSet<String>,
    /// All conditions must hold when set, any one otherwise.
    #[serde(default)]
    pub intersection: bool,
    pub containers: BTreeSet<ContainerCondition>,
}

impl Prohibition {
    pub fn new<I, S>(name: impl Into<String>, subject: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            subject: subject.into(),
            operations: operations.into_iter().map(Into::into).collect(),
            intersection: false,
            containers: BTreeSet::new(),
        }
    }

    pub fn with_intersection(mut self, intersection: bool) -> Self {
        self.intersection = intersection;
        self
    }

    pub fn with_container(mut self, condition: ContainerCondition) -> Self {
        self.containers.insert(condition);
        self
    }

    /// Whether this prohibition covers a target whose ascending closure
    /// (the target plus every ancestor) is `target_scope`.
    pub fn applies_to(&self, target_scope: &BTreeSet<String>) -> bool {
        let mut results = self
            .containers
            .iter()
            .map(|c| target_scope.contains(&c.id) != c.complement);
        if self.intersection {
            !self.containers.is_empty() && results.all(|held| held)
        } else {
            results.any(|held| held)
        }
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("prohibition name", &self.name)?;
        require_non_empty("prohibition subject", &self.subject)?;
        if self.operations.is_empty() {
            return Err(NgacError::InvalidArgument(format!(
                "prohibition {} has no operations",
                self.name
            )));
        }
        if self.containers.is_empty() {
            return Err(NgacError::InvalidArgument(format!(
                "prohibition {} has no containers",
                self.name
            )));
        }
        Ok(())
    }
}

/// The prohibitions of one policy store, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, Prohibition>",
    try_from = "BTreeMap<String, Prohibition>"
)]
pub struct Prohibitions {
    prohibitions: BTreeMap<String, Prohibition>,
}

impl From<Prohibitions> for BTreeMap<String, Prohibition> {
    fn from(prohibitions: Prohibitions) -> Self {
        prohibitions.prohibitions
    }
}

/// Loading applies the same checks as [`Prohibitions::add`], and each entry
/// must be keyed by its own name.
impl TryFrom<BTreeMap<String, Prohibition>> for Prohibitions {
    type Error = NgacError;

    fn try_from(map: BTreeMap<String, Prohibition>) -> Result<Self> {
        for (key, prohibition) in &map {
            if *key != prohibition.name {
                return Err(NgacError::InvalidArgument(format!(
                    "prohibition {} is stored under key {}",
                    prohibition.name, key
                )));
            }
            prohibition.validate()?;
        }
        Ok(Self { prohibitions: map })
    }
}

impl Prohibitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prohibition. Subject and container ids are not checked against
    /// the graph here; unknown ids simply never match at decision time.
    pub fn add(&mut self, prohibition: Prohibition) -> Result<()> {
        prohibition.validate()?;
        if self.prohibitions.contains_key(&prohibition.name) {
            return Err(NgacError::DuplicateProhibition(prohibition.name));
        }
        self.prohibitions
            .insert(prohibition.name.clone(), prohibition);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Prohibition> {
        self.prohibitions.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Prohibition> {
        self.prohibitions.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Prohibition> {
        self.prohibitions.values()
    }

    pub fn for_subject<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Prohibition> {
        self.prohibitions
            .values()
            .filter(move |p| p.subject == subject)
    }

    pub fn len(&self) -> usize {
        self.prohibitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prohibitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_union_applies_when_any_container_matches() {
        let p = Prohibition::new("p", "ua1", ["read"])
            .with_container(ContainerCondition::inside("oa1"))
            .with_container(ContainerCondition::inside("oa2"));

        assert!(p.applies_to(&scope(&["o1", "oa2", "pc"])));
        assert!(!p.applies_to(&scope(&["o1", "oa3", "pc"])));
    }

    #[test]
    fn test_intersection_with_complement() {
        let p = Prohibition::new("isolation", "AgencyA", ["check_out"])
            .with_intersection(true)
            .with_container(ContainerCondition::inside("all_accounts"))
            .with_container(ContainerCondition::outside("AgencyA_account"));

        assert!(p.applies_to(&scope(&["AgencyB_account", "all_accounts", "accounts"])));
        assert!(!p.applies_to(&scope(&["AgencyA_account", "all_accounts", "accounts"])));
        assert!(!p.applies_to(&scope(&["all_assets", "assets"])));
    }

    #[test]
    fn test_add_rejects_duplicates_and_empty() {
        let mut prohibitions = Prohibitions::new();
        let p = Prohibition::new("p", "u1", ["read"]).with_container(ContainerCondition::inside("o1"));
        prohibitions.add(p.clone()).unwrap();

        assert!(matches!(
            prohibitions.add(p),
            Err(NgacError::DuplicateProhibition(name)) if name == "p"
        ));
        assert!(prohibitions
            .add(Prohibition::new("q", "u1", Vec::<String>::new()).with_container(ContainerCondition::inside("o1")))
            .is_err());
        assert!(prohibitions.add(Prohibition::new("r", "u1", ["read"])).is_err());
        assert_eq!(prohibitions.len(), 1);
    }

    #[test]
    fn test_load_checks_keys_and_contents() {
        let mut prohibitions = Prohibitions::new();
        prohibitions
            .add(Prohibition::new("a", "u1", ["read"]).with_container(ContainerCondition::inside("o1")))
            .unwrap();
        let json = serde_json::to_string(&prohibitions).unwrap();
        let loaded: Prohibitions = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, prohibitions);

        let renamed = json.replacen("\"a\":", "\"b\":", 1);
        assert!(serde_json::from_str::<Prohibitions>(&renamed).is_err());

        let no_containers = r#"{"c":{"name":"c","subject":"u1","operations":["read"],"containers":[]}}"#;
        assert!(serde_json::from_str::<Prohibitions>(no_containers).is_err());
    }

    #[test]
    fn test_for_subject_and_remove() {
        let mut prohibitions = Prohibitions::new();
        prohibitions
            .add(Prohibition::new("a", "u1", ["read"]).with_container(ContainerCondition::inside("o1")))
            .unwrap();
        prohibitions
            .add(Prohibition::new("b", "u2", ["read"]).with_container(ContainerCondition::inside("o1")))
            .unwrap();

        assert_eq!(prohibitions.for_subject("u1").count(), 1);
        assert!(prohibitions.remove("a").is_some());
        assert_eq!(prohibitions.for_subject("u1").count(), 0);
        assert!(prohibitions.get("b").is_some());
    }
}
