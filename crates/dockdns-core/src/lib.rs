// # dockdns-core
//
// Core library for the container-label DNS reconciliation controller.
//
// ## Architecture Overview
//
// Every cycle observes desired state (hostnames wanted by running containers)
// and actual state (records held by the DNS provider), then applies the
// smallest set of creates and deletes that converges them:
// - **DesiredStateSource**: Trait for producing the hostnames to publish
// - **DnsProvider**: Trait for fetching and changing records via provider APIs
// - **IpSource**: Trait for discovering the public IP new records point at
// - **ReconcileEngine**: The diff and the controller loop
// - **ProviderRegistry**: Plugin-based registry for providers and IP sources
//
// ## Design Principles
//
// 1. **Ownership**: A record is deleted only if its ownership marker exists
// 2. **Idempotency**: An unchanged desired set produces no API writes
// 3. **Stateless cycles**: Current state is re-fetched every cycle
// 4. **Fail-fast**: The first error ends the cycle; the next cycle re-diffs
// 5. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credentials, DesiredStateConfig, EngineConfig, IpSourceConfig, ProviderConfig, Settings};
pub use engine::{EngineEvent, LoopMode, ReconcileEngine, ReconcileReport};
pub use error::{Error, Result};
pub use record::{CurrentRecords, DesiredHostnames, ManagedRecord, OWNERSHIP_TAG, OwnedHostname, RecordKind};
pub use registry::ProviderRegistry;
pub use traits::{DesiredStateSource, DnsProvider, IpSource, StaticSource};
