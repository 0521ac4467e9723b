//! Names for the named Avro types: record, fixed and enum.

use crate::error::{Error, Result};
use std::fmt::{self, Display};
use std::str::FromStr;

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::Malformed(format!(
            "name {name:?} must match [A-Za-z_][A-Za-z0-9_]*"
        )))
    }
}

// Follows the grammar: <empty> | <name>(<dot><name>)*
pub(crate) fn validate_namespace(namespace: &str) -> Result<()> {
    for part in namespace.split('.') {
        validate_name(part).map_err(|_| {
            Error::Malformed(format!(
                "namespace {namespace:?} must be a dot-separated sequence of names"
            ))
        })?;
    }
    Ok(())
}

/// The `fullname` of a named Avro type: a simple name plus an optional
/// dot-separated namespace.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
}

impl Name {
    /// Creates a validated name. A dotted `name` is treated as a fullname
    /// and split into namespace and simple name.
    pub fn new(name: &str) -> Result<Name> {
        if let Some(idx) = name.rfind('.') {
            validate_namespace(&name[..idx])?;
            validate_name(&name[idx + 1..])?;
            Ok(Name {
                name: name[idx + 1..].to_string(),
                namespace: Some(name[..idx].to_string()),
            })
        } else {
            validate_name(name)?;
            Ok(Name {
                name: name.to_string(),
                namespace: None,
            })
        }
    }

    /// Creates a name with an explicit namespace. An empty namespace is the
    /// null namespace; a dotted `name` keeps its own namespace.
    pub fn with_namespace(name: &str, namespace: &str) -> Result<Name> {
        let mut out = Name::new(name)?;
        if out.namespace.is_none() && !namespace.is_empty() {
            validate_namespace(namespace)?;
            out.namespace = Some(namespace.to_string());
        }
        Ok(out)
    }

    /// The simple name.
    pub fn simple(&self) -> &str {
        &self.name
    }

    /// The namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The dotted fullname.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(n) if !n.is_empty() => format!("{}.{}", n, self.name),
            _ => self.name.clone(),
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(n) if !n.is_empty() => write!(f, "{}.{}", n, self.name),
            _ => f.write_str(&self.name),
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Name> {
        Name::new(s)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace.as_deref().unwrap_or("") == other.namespace.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name() {
        let n = Name::new("Row").unwrap();
        assert_eq!(n.simple(), "Row");
        assert_eq!(n.namespace(), None);
        assert_eq!(n.fullname(), "Row");
    }

    #[test]
    fn dotted_name_splits() {
        let n = Name::new("com.example.Row").unwrap();
        assert_eq!(n.simple(), "Row");
        assert_eq!(n.namespace(), Some("com.example"));
        assert_eq!(n.fullname(), "com.example.Row");
    }

    #[test]
    fn dotted_name_wins_over_namespace() {
        let n = Name::with_namespace("my.Row", "com.example").unwrap();
        assert_eq!(n.fullname(), "my.Row");
    }

    #[test]
    fn empty_namespace_is_null() {
        let n = Name::with_namespace("Row", "").unwrap();
        assert_eq!(n.fullname(), "Row");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(Name::new("2Row").is_err());
        assert!(Name::new("").is_err());
        assert!(Name::new("a..b").is_err());
        assert!(Name::with_namespace("Row", "2bad").is_err());
    }
}
