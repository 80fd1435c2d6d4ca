//! OAuth2 scopes of the form `<resource_identifier>/<action>`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::RegistryError;

/// A permission on a resource server, e.g. `demo/read.file`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope {
    resource_identifier: String,
    action: String,
}

impl Scope {
    pub fn new(
        resource_identifier: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let resource_identifier = resource_identifier.into();
        let action = action.into();
        if !is_valid_part(&resource_identifier) || !is_valid_part(&action) || action.contains('/')
        {
            return Err(RegistryError::InvalidScope(format!(
                "{}/{}",
                resource_identifier, action
            )));
        }
        Ok(Self {
            resource_identifier,
            action,
        })
    }

    pub fn resource_identifier(&self) -> &str {
        &self.resource_identifier
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl FromStr for Scope {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Identifiers may themselves be URLs, so the action is after the last '/'.
        let (resource_identifier, action) = s
            .rsplit_once('/')
            .ok_or_else(|| RegistryError::InvalidScope(s.to_string()))?;
        Scope::new(resource_identifier, action)
    }
}

impl TryFrom<String> for Scope {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_identifier, self.action)
    }
}

/// An ordered set of scopes, rendered as the space-delimited OAuth2 form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-delimited scope list. Empty input yields an empty set.
    pub fn parse_delimited(value: &str) -> Result<Self, RegistryError> {
        value
            .split_whitespace()
            .map(Scope::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(ScopeSet)
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    pub fn is_subset(&self, other: &ScopeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        ScopeSet(self.0.intersection(&other.0).cloned().collect())
    }

    /// Scopes in `self` that are not in `other`.
    pub fn difference(&self, other: &ScopeSet) -> ScopeSet {
        ScopeSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn insert(&mut self, scope: Scope) -> bool {
        self.0.insert(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        ScopeSet(iter.into_iter().collect())
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", scope)?;
            first = false;
        }
        Ok(())
    }
}

impl TryFrom<String> for ScopeSet {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ScopeSet::parse_delimited(&value)
    }
}

impl From<ScopeSet> for String {
    fn from(scopes: ScopeSet) -> Self {
        scopes.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        let scope: Scope = "demo/read.file".parse().unwrap();
        assert_eq!(scope.resource_identifier(), "demo");
        assert_eq!(scope.action(), "read.file");
        assert_eq!(scope.to_string(), "demo/read.file");
    }

    #[test]
    fn test_parse_scope_with_url_identifier() {
        let scope: Scope = "https://api.example.com/files/read".parse().unwrap();
        assert_eq!(scope.resource_identifier(), "https://api.example.com/files");
        assert_eq!(scope.action(), "read");
    }

    #[test]
    fn test_parse_scope_rejects_malformed() {
        for bad in ["", "read.file", "/read.file", "demo/", "de mo/read", "demo/re\tad"] {
            assert!(bad.parse::<Scope>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_scope_set_delimited_form() {
        let set = ScopeSet::parse_delimited("demo/write.file  demo/read.file").unwrap();
        assert_eq!(set.len(), 2);
        // BTreeSet ordering makes the rendering stable
        assert_eq!(set.to_string(), "demo/read.file demo/write.file");
        assert!(ScopeSet::parse_delimited("").unwrap().is_empty());
    }

    #[test]
    fn test_scope_set_operations() {
        let entitled = ScopeSet::parse_delimited("demo/read.file demo/write.file").unwrap();
        let requested = ScopeSet::parse_delimited("demo/read.file other/admin").unwrap();

        let granted = requested.intersection(&entitled);
        assert_eq!(granted.to_string(), "demo/read.file");
        assert!(granted.is_subset(&entitled));
        assert_eq!(requested.difference(&entitled).to_string(), "other/admin");
    }

    #[test]
    fn test_scope_serde_as_string() {
        let scope: Scope = serde_json::from_str("\"demo/read.file\"").unwrap();
        assert_eq!(serde_json::to_string(&scope).unwrap(), "\"demo/read.file\"");
        assert!(serde_json::from_str::<Scope>("\"nonsense\"").is_err());
    }
}
