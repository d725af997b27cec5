// # IP Source Trait
//
// Defines how the engine learns the public-facing address that new ADDRESS
// records point at.
//
// ## Implementations
//
// - Plain-text HTTP service: `dockdns-ip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP discovery
///
/// The engine calls [`IpSource::current`] at most once per reconciliation
/// cycle and reuses the answer for every record created in that cycle.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: If unable to determine the current IP
    async fn current(&self) -> Result<IpAddr, crate::Error>;
}

/// Helper trait for constructing IP sources from configuration
pub trait IpSourceFactory: Send + Sync {
    /// Create an IpSource instance from configuration
    fn create(
        &self,
        config: &crate::config::IpSourceConfig,
    ) -> Result<Box<dyn IpSource>, crate::Error>;
}
