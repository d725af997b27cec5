// # DNS Provider Trait
//
// Defines the record-level capability every DNS backend exposes to the
// reconciliation engine.
//
// ## Implementations
//
// - Cloudflare: `dockdns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dockdns_core::DnsProvider;
//
// let current = provider.fetch_records().await?;
// for (hostname, record) in &current.address {
//     println!("{} -> {}", hostname, record.content);
// }
// ```

use crate::record::{CurrentRecords, ManagedRecord, OwnedHostname};
use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for DNS provider implementations
///
/// Providers translate the engine's pair operations into API calls. They do
/// not decide what to create or delete; that is the engine's job.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Memoize the zone identifier for the lifetime of the instance
/// - ✅ Issue one compensating delete when a pair creation fails halfway
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Retry or back off (a failed call fails the cycle; the next cycle re-diffs)
/// - ❌ Touch records that are not part of a pair it was asked to manage
/// - ❌ Decide whether a hostname should exist (owned by `ReconcileEngine`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the current ADDRESS and OWNERSHIP records for the configured domain
    ///
    /// Records of other types are ignored. A failure here aborts the cycle
    /// before any change is attempted.
    async fn fetch_records(&self) -> Result<CurrentRecords, crate::Error>;

    /// Publish a hostname: ADDRESS record pointing at `ip`, then OWNERSHIP record
    ///
    /// When `ownership_exists` is true a stale marker is already present and
    /// only the ADDRESS record is created. If the OWNERSHIP call fails the
    /// ADDRESS record just created must be rolled back before returning the
    /// original error, so no unowned record is left behind.
    async fn create_hostname(
        &self,
        hostname: &str,
        ip: IpAddr,
        ownership_exists: bool,
    ) -> Result<(), crate::Error>;

    /// Unpublish an owned hostname: ADDRESS record, then OWNERSHIP record
    async fn delete_hostname(&self, owned: &OwnedHostname) -> Result<(), crate::Error>;

    /// Delete an OWNERSHIP marker that has lost its ADDRESS record
    async fn delete_marker(&self, marker: &ManagedRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
///
/// Creating a provider configures it with credentials and the base domain.
/// It must not perform network I/O.
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
