//! Permission lattice
//!
//! Access to attributes and relationships is expressed as a [`Tier`] in the
//! total order `all < self < group < internal < sudo`. A caller's grants are
//! dotted permission strings held in a [`PermissionSet`]; for a resource
//! namespace and an [`AccessMode`] they resolve to the highest tier the
//! caller holds:
//!
//! | tier       | grant                      |
//! |------------|----------------------------|
//! | `all`      | always                     |
//! | `self`     | `<ns>.<mode>.me` + self    |
//! | `group`    | `<ns>.<mode>`              |
//! | `internal` | `<ns>.internal`            |
//! | `sudo`     | `<ns>.sudo`                |
//!
//! A trailing `*` segment in a grant is a wildcard (`rescues.*`, `*`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// An access tier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Anyone, including unauthenticated callers
    #[default]
    All,
    /// The resource's own subject holding the `.me` grant
    #[serde(rename = "self")]
    Owner,
    /// Holders of the plain `<ns>.<mode>` grant
    Group,
    /// Holders of `<ns>.internal`
    Internal,
    /// Holders of `<ns>.sudo`
    Sudo,
}

impl Tier {
    /// Whether a caller at `effective` satisfies this tier
    pub fn satisfied_by(self, effective: Tier) -> bool {
        effective >= self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::All => "all",
            Tier::Owner => "self",
            Tier::Group => "group",
            Tier::Internal => "internal",
            Tier::Sudo => "sudo",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a permission check is for reading or writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
        }
    }
}

/// The grant string a tier requires within a namespace
///
/// `all` needs no grant and returns `None`.
pub fn grant_name(tier: Tier, namespace: &str, mode: AccessMode) -> Option<String> {
    match tier {
        Tier::All => None,
        Tier::Owner => Some(format!("{}.{}.me", namespace, mode.as_str())),
        Tier::Group => Some(format!("{}.{}", namespace, mode.as_str())),
        Tier::Internal => Some(format!("{}.internal", namespace)),
        Tier::Sudo => Some(format!("{}.sudo", namespace)),
    }
}

/// The resolved grants of a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    grants: BTreeSet<String>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a grant string against the expected format
    pub fn is_valid_grant(grant: &str) -> bool {
        static GRANT_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = GRANT_REGEX.get_or_init(|| {
            Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9_-]*(\.[A-Za-z][A-Za-z0-9_-]*)*(\.\*)?)$")
                .expect("grant pattern is valid")
        });
        regex.is_match(grant)
    }

    pub fn insert(&mut self, grant: impl Into<String>) {
        self.grants.insert(grant.into());
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.grants.iter().map(String::as_str)
    }

    /// Whether every grant of `self` is also held by `other`
    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.grants.is_subset(&other.grants)
    }

    /// Whether the set holds `permission`, directly or through a wildcard
    pub fn contains(&self, permission: &str) -> bool {
        self.grants.iter().any(|grant| {
            if grant == permission || grant == "*" {
                return true;
            }
            match grant.strip_suffix('*') {
                Some(prefix) if prefix.ends_with('.') => permission.starts_with(prefix),
                _ => false,
            }
        })
    }

    /// Highest tier held for a namespace, not counting the `self` tier
    ///
    /// Returns [`Tier::Owner`] when only the `.me` grant is held; the caller
    /// still has to pass the resource's self rule for it to count.
    fn literal_tier(&self, namespace: &str, mode: AccessMode) -> (Tier, bool) {
        let holds = |tier| grant_name(tier, namespace, mode).is_some_and(|g| self.contains(&g));
        let me = holds(Tier::Owner);
        for tier in [Tier::Sudo, Tier::Internal, Tier::Group] {
            if holds(tier) {
                return (tier, me);
            }
        }
        (Tier::All, me)
    }

    /// Resolve the effective tier for a namespace
    ///
    /// `is_self` is the result of the resource's self rule for the caller.
    pub fn effective_tier(&self, namespace: &str, mode: AccessMode, is_self: bool) -> Tier {
        let (tier, me) = self.literal_tier(namespace, mode);
        if tier == Tier::All && me && is_self {
            Tier::Owner
        } else {
            tier
        }
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Whether a permission set satisfies `required` without any self check
pub fn grant(required: Tier, permissions: &PermissionSet, namespace: &str, mode: AccessMode) -> bool {
    required.satisfied_by(permissions.effective_tier(namespace, mode, false))
}

/// An authenticated caller
///
/// `owned` holds the ids of resources that belong to the caller (their rats),
/// which self rules compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    #[serde(default)]
    pub owned: BTreeSet<String>,
}

impl Caller {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            owned: BTreeSet::new(),
        }
    }

    pub fn with_owned<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owned.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned.contains(id)
    }

    pub fn is_user(&self, id: &str) -> bool {
        Uuid::parse_str(id).is_ok_and(|parsed| parsed == self.user_id)
    }
}
