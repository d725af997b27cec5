//! Core traits for the dockdns controller
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Fetch and change records via a provider API
//! - [`IpSource`]: Discover the public IP that ADDRESS records point at
//! - [`DesiredStateSource`]: Produce the hostnames that should exist

pub mod dns_provider;
pub mod ip_source;
pub mod desired_state;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use ip_source::{IpSource, IpSourceFactory};
pub use desired_state::{DesiredStateSource, StaticSource};
