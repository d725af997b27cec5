// # Desired-State Source Trait
//
// Produces the hostname set that should be published. The engine only
// requires the answer to be deterministic for a given upstream inventory.
//
// ## Implementations
//
// - Docker container labels: `dockdns-source-docker` crate
// - Fixed list: [`StaticSource`]

use crate::record::DesiredHostnames;
use async_trait::async_trait;

/// Trait for desired-state sources
#[async_trait]
pub trait DesiredStateSource: Send + Sync {
    /// Query the upstream inventory and return the hostnames to publish
    async fn desired_hostnames(&self) -> Result<DesiredHostnames, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// A source that always returns the same hostnames
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    hostnames: DesiredHostnames,
}

impl StaticSource {
    /// Create a source from a fixed list
    pub fn new<S: AsRef<str>>(hostnames: impl IntoIterator<Item = S>) -> Self {
        Self {
            hostnames: hostnames.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DesiredStateSource for StaticSource {
    async fn desired_hostnames(&self) -> Result<DesiredHostnames, crate::Error> {
        Ok(self.hostnames.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}
