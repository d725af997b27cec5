//! Desired/actual diff
//!
//! [`plan`] is pure: it looks at the desired hostnames and the provider's
//! current records and decides which pairs to create and which to delete.
//! The engine executes the result.

use crate::record::{CurrentRecords, DesiredHostnames, ManagedRecord, OwnedHostname};
use std::net::IpAddr;

/// A hostname to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addition {
    /// The hostname
    pub hostname: String,
    /// A stale OWNERSHIP marker is already present; only the ADDRESS record is needed
    pub ownership_exists: bool,
}

/// The changes one cycle has to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Desired hostnames with no ADDRESS record
    pub additions: Vec<Addition>,
    /// Owned, still-desired hostnames whose ADDRESS content is stale
    pub replacements: Vec<OwnedHostname>,
    /// Owned hostnames that are no longer desired
    pub removals: Vec<OwnedHostname>,
    /// OWNERSHIP markers with no ADDRESS record whose hostname is not desired
    pub orphan_markers: Vec<ManagedRecord>,
    /// Undesired hostnames left alone because they carry no ownership marker
    pub foreign: Vec<String>,
}

impl ReconcilePlan {
    /// True when the cycle has nothing to change
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
            && self.replacements.is_empty()
            && self.removals.is_empty()
            && self.orphan_markers.is_empty()
    }

    /// True when executing the plan needs the public IP
    pub fn needs_ip(&self) -> bool {
        !self.additions.is_empty() || !self.replacements.is_empty()
    }
}

/// Compute the diff between desired and current state
///
/// - every desired hostname without an ADDRESS record is added
/// - every ADDRESS hostname that is not desired is removed, but only if it
///   has an OWNERSHIP marker; without one it is foreign and never touched
/// - a lone OWNERSHIP marker whose hostname is not desired is removed, so a
///   hand-made ADDRESS record created later is not mistaken for an owned one
/// - with `drift_ip` set, owned desired hostnames whose ADDRESS content
///   differs from it are replaced
pub fn plan(
    desired: &DesiredHostnames,
    current: &CurrentRecords,
    drift_ip: Option<IpAddr>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for hostname in desired.iter() {
        match current.address.get(hostname) {
            None => plan.additions.push(Addition {
                hostname: hostname.to_string(),
                ownership_exists: current.has_ownership(hostname),
            }),
            Some(record) => {
                let Some(ip) = drift_ip else { continue };
                if record.content.trim().parse::<IpAddr>().ok() == Some(ip) {
                    continue;
                }
                if let Some(owned) = current.owned(hostname) {
                    plan.replacements.push(owned);
                }
            }
        }
    }

    for hostname in current.address.keys() {
        if desired.contains(hostname) {
            continue;
        }
        match current.owned(hostname) {
            Some(owned) => plan.removals.push(owned),
            None => plan.foreign.push(hostname.clone()),
        }
    }

    for (hostname, marker) in &current.ownership {
        if !desired.contains(hostname) && !current.address.contains_key(hostname) {
            plan.orphan_markers.push(marker.clone());
        }
    }

    plan
}
