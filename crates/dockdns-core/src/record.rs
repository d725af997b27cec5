//! Record model shared by the engine and every provider
//!
//! A published hostname is always a pair of records: an ADDRESS record that
//! resolves it and an OWNERSHIP record that proves this controller created it.
//! Records without the ownership marker belong to someone else and are never
//! deleted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Content of every OWNERSHIP record written by this controller
pub const OWNERSHIP_TAG: &str = "owner=docker_dns";

/// Kind of a managed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Resolves the hostname to an IP address (`A`)
    Address,
    /// Ownership marker (`TXT`)
    Ownership,
}

impl RecordKind {
    /// DNS record type as it appears on the wire
    pub fn dns_type(&self) -> &'static str {
        match self {
            RecordKind::Address => "A",
            RecordKind::Ownership => "TXT",
        }
    }

    /// Map a DNS record type back to a kind; other types are not ours to manage
    pub fn from_dns_type(dns_type: &str) -> Option<Self> {
        match dns_type {
            "A" => Some(RecordKind::Address),
            "TXT" => Some(RecordKind::Ownership),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dns_type())
    }
}

/// A record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedRecord {
    /// ADDRESS or OWNERSHIP
    pub kind: RecordKind,
    /// Provider-assigned identifier
    pub id: String,
    /// Hostname the record belongs to
    pub hostname: String,
    /// IP address for ADDRESS records, the ownership tag for OWNERSHIP records
    pub content: String,
}

/// Normalize a hostname: trim, lower-case, drop a trailing root dot
pub fn normalize_hostname(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// The set of hostnames that should be published
///
/// Sorted and deduplicated by construction, so two lists with the same
/// members always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredHostnames {
    names: BTreeSet<String>,
}

impl DesiredHostnames {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a hostname; returns false if it was already present or empty
    pub fn insert(&mut self, hostname: &str) -> bool {
        let hostname = normalize_hostname(hostname);
        if hostname.is_empty() {
            return false;
        }
        self.names.insert(hostname)
    }

    /// Check membership
    pub fn contains(&self, hostname: &str) -> bool {
        self.names.contains(hostname)
    }

    /// Number of hostnames
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no hostname is desired
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for DesiredHostnames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = DesiredHostnames::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// A hostname this controller owns: both halves of the pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedHostname {
    /// The hostname
    pub hostname: String,
    /// Its ADDRESS record
    pub address: ManagedRecord,
    /// Its OWNERSHIP record
    pub ownership: ManagedRecord,
}

/// Current provider state, partitioned by record kind and keyed by hostname
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentRecords {
    /// ADDRESS records
    pub address: BTreeMap<String, ManagedRecord>,
    /// OWNERSHIP records
    pub ownership: BTreeMap<String, ManagedRecord>,
}

impl CurrentRecords {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// File a record under its kind, keyed by its normalized hostname
    ///
    /// TXT records whose content is not the ownership tag are someone else's
    /// and are not filed.
    pub fn insert(&mut self, mut record: ManagedRecord) {
        record.hostname = normalize_hostname(&record.hostname);
        match record.kind {
            RecordKind::Address => {
                self.address.insert(record.hostname.clone(), record);
            }
            RecordKind::Ownership => {
                if is_ownership_tag(&record.content) {
                    self.ownership.insert(record.hostname.clone(), record);
                }
            }
        }
    }

    /// Both records for a hostname, if this controller owns it
    pub fn owned(&self, hostname: &str) -> Option<OwnedHostname> {
        let address = self.address.get(hostname)?;
        let ownership = self.ownership.get(hostname)?;
        Some(OwnedHostname {
            hostname: hostname.to_string(),
            address: address.clone(),
            ownership: ownership.clone(),
        })
    }

    /// True when an OWNERSHIP marker exists for the hostname
    pub fn has_ownership(&self, hostname: &str) -> bool {
        self.ownership.contains_key(hostname)
    }
}

/// Providers may return TXT content wrapped in quotes
fn is_ownership_tag(content: &str) -> bool {
    content.trim().trim_matches('"') == OWNERSHIP_TAG
}
