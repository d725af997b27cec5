// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider`.
//
// ## Behaviour
//
// - ✅ Zone looked up by domain name on first use, then memoized per instance
// - ✅ One paginated listing per cycle, partitioned into A and TXT records
// - ✅ Pair creation: A record, then ownership TXT record
// - ✅ Compensating delete of the A record when the TXT creation fails
// - ✅ Pair deletion: A record, then TXT record
// - ✅ Lone TXT marker deletion
// - ✅ Only IPv4 addresses are published (A records)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error mapping for HTTP status codes (401/403, 404, 429, 5xx)
// - ❌ NO retry logic (a failed call fails the cycle; the next cycle re-diffs)
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or Debug output
// - Credentials are sent as `X-Auth-Email` / `X-Auth-Key` on every request
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=...&per_page=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dockdns_core::config::{Credentials, ProviderConfig};
use dockdns_core::record::{CurrentRecords, ManagedRecord, OWNERSHIP_TAG, OwnedHostname, RecordKind};
use dockdns_core::traits::{DnsProvider, DnsProviderFactory};
use dockdns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page
const RECORDS_PER_PAGE: u32 = 100;

/// TTL value meaning "automatic"
const AUTO_TTL: u32 = 1;

/// Body of a record creation request
#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// A record as returned by the listing and creation endpoints
#[derive(Debug, Deserialize)]
struct ApiRecord {
    #[serde(rename = "type")]
    record_type: String,
    id: String,
    name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    result: Vec<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct SingleEnvelope<T> {
    result: T,
}

/// Cloudflare DNS provider
///
/// # Zone cache
///
/// The zone identifier is resolved from the configured domain on the first
/// call that needs it and kept for the lifetime of the instance. A failed
/// lookup is not cached, so the next cycle tries again.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct CloudflareProvider {
    /// API e-mail and key
    /// ⚠️ NEVER log the key
    credentials: Credentials,

    /// Base domain; also the zone name
    domain: String,

    /// API root (overridable for tests)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Memoized zone identifier
    zone_id: OnceCell<String>,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .field("zone_id", &self.zone_id.get())
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// No network I/O happens here; the zone is resolved on first use.
    ///
    /// # Parameters
    ///
    /// - `credentials`: API e-mail and global API key
    /// - `domain`: Base domain (the zone name)
    /// - `api_base`: API root; `None` uses [`CLOUDFLARE_API_BASE`]
    pub fn new(
        credentials: Credentials,
        domain: impl Into<String>,
        api_base: Option<String>,
    ) -> Result<Self> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(Error::config("Cloudflare credentials cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            domain: domain.into(),
            api_base: api_base
                .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
            zone_id: OnceCell::new(),
        })
    }

    /// Attach authentication headers to a request
    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", &self.credentials.username)
            .header("X-Auth-Key", &self.credentials.password)
            .header("Content-Type", "application/json")
    }

    /// Send a request and map non-2xx statuses to errors
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: HTTP request failed: {}", context, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "{}: invalid credentials or insufficient permissions. Status: {}",
                context, status
            )),
            404 => Error::not_found(format!("{}: {}", context, error_text)),
            429 => Error::rate_limited(format!(
                "{}: rate limit exceeded. Status: {}",
                context, status
            )),
            500..=599 => Error::provider(
                "cloudflare",
                format!("{}: server error (transient): {} - {}", context, status, error_text),
            ),
            _ => Error::provider(
                "cloudflare",
                format!("{}: {} - {}", context, status, error_text),
            ),
        })
    }

    /// Parse a JSON response body
    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response, context: &str) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            Error::provider("cloudflare", format!("{}: failed to parse response: {}", context, e))
        })
    }

    /// Get the zone ID for the configured domain
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com&per_page=50
    /// ```
    async fn zone_id(&self) -> Result<&str> {
        let zone_id = self
            .zone_id
            .get_or_try_init(|| async {
                tracing::debug!("Looking up zone ID for domain: {}", self.domain);

                let request = self
                    .client
                    .get(format!("{}/zones", self.api_base))
                    .query(&[("name", self.domain.as_str()), ("per_page", "50")]);
                let response = self.send(request, "zone lookup").await?;
                let zones: ListEnvelope<ApiZone> = Self::parse(response, "zone lookup").await?;

                let zone = zones
                    .result
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::not_found(format!("Zone not found: {}", self.domain)))?;

                tracing::debug!("Found zone ID: {}", zone.id);
                Ok::<String, Error>(zone.id)
            })
            .await?;

        Ok(zone_id.as_str())
    }

    /// Create a single record and return its ID
    async fn create_record(
        &self,
        zone_id: &str,
        kind: RecordKind,
        hostname: &str,
        content: &str,
    ) -> Result<String> {
        let body = NewRecord {
            record_type: kind.dns_type(),
            name: hostname,
            content,
            ttl: AUTO_TTL,
            // Only the address record can be proxied
            proxied: kind == RecordKind::Address,
        };

        let context = format!("create {} record for {}", kind, hostname);
        let request = self
            .client
            .post(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .json(&body);
        let response = self.send(request, &context).await?;
        let created: SingleEnvelope<ApiRecord> = Self::parse(response, &context).await?;

        tracing::debug!("Created {} record {} for {}", kind, created.result.id, hostname);
        Ok(created.result.id)
    }

    /// Delete a single record by ID
    async fn delete_record(&self, zone_id: &str, record: &ManagedRecord) -> Result<()> {
        let context = format!("delete {} record for {}", record.kind, record.hostname);
        let request = self.client.delete(format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone_id, record.id
        ));
        self.send(request, &context).await?;

        tracing::debug!("Deleted {} record {} for {}", record.kind, record.id, record.hostname);
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every A and TXT record in the zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// ```
    async fn fetch_records(&self) -> Result<CurrentRecords> {
        let zone_id = self.zone_id().await?;
        let mut current = CurrentRecords::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
                .query(&[("page", page), ("per_page", RECORDS_PER_PAGE)]);
            let response = self.send(request, "list records").await?;
            let listing: ListEnvelope<ApiRecord> = Self::parse(response, "list records").await?;

            for record in listing.result {
                let Some(kind) = RecordKind::from_dns_type(&record.record_type) else {
                    continue;
                };
                current.insert(ManagedRecord {
                    kind,
                    id: record.id,
                    hostname: record.name,
                    content: record.content,
                });
            }

            let total_pages = listing.result_info.map(|info| info.total_pages).unwrap_or(1);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Zone {} holds {} A and {} ownership record(s)",
            self.domain,
            current.address.len(),
            current.ownership.len()
        );
        Ok(current)
    }

    async fn create_hostname(&self, hostname: &str, ip: IpAddr, ownership_exists: bool) -> Result<()> {
        if !ip.is_ipv4() {
            return Err(Error::invalid_input(format!(
                "Cannot publish {} as an A record for {}: not an IPv4 address",
                ip, hostname
            )));
        }

        let zone_id = self.zone_id().await?;
        let content = ip.to_string();

        let address_id = self
            .create_record(zone_id, RecordKind::Address, hostname, &content)
            .await?;

        if ownership_exists {
            return Ok(());
        }

        if let Err(e) = self
            .create_record(zone_id, RecordKind::Ownership, hostname, OWNERSHIP_TAG)
            .await
        {
            tracing::warn!(
                "Ownership record for {} failed, rolling back its A record: {}",
                hostname,
                e
            );
            let address = ManagedRecord {
                kind: RecordKind::Address,
                id: address_id,
                hostname: hostname.to_string(),
                content,
            };
            if let Err(rollback) = self.delete_record(zone_id, &address).await {
                tracing::error!(
                    "Rollback of A record {} for {} failed, it is now unmanaged: {}",
                    address.id,
                    hostname,
                    rollback
                );
            }
            return Err(e);
        }

        Ok(())
    }

    async fn delete_hostname(&self, owned: &OwnedHostname) -> Result<()> {
        let zone_id = self.zone_id().await?;
        self.delete_record(zone_id, &owned.address).await?;
        self.delete_record(zone_id, &owned.ownership).await
    }

    async fn delete_marker(&self, marker: &ManagedRecord) -> Result<()> {
        let zone_id = self.zone_id().await?;
        self.delete_record(zone_id, marker).await
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                credentials,
                domain,
                api_base,
            } => Ok(Box::new(CloudflareProvider::new(
                credentials.clone(),
                domain.clone(),
                api_base.clone(),
            )?)),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dockdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dockdns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &dockdns_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
