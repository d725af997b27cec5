//! Test doubles and common utilities for reconciliation contract tests
//!
//! The in-memory provider keeps real record state, so consecutive cycles see
//! the effects of earlier ones, and records every call it receives.

#![allow(dead_code)]

use dockdns_core::error::{Error, Result};
use dockdns_core::record::{CurrentRecords, ManagedRecord, OWNERSHIP_TAG, OwnedHostname, RecordKind};
use dockdns_core::traits::{DesiredStateSource, DnsProvider, IpSource};
use dockdns_core::{DesiredHostnames, EngineConfig, ReconcileEngine};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A provider call, in the order it was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Create { hostname: String, ip: IpAddr },
    Delete { hostname: String },
    DeleteMarker { hostname: String },
}

#[derive(Default)]
struct ProviderState {
    records: Vec<ManagedRecord>,
    calls: Vec<Call>,
    next_id: usize,
    fail_fetch: bool,
    fail_create: Option<String>,
    fail_delete: Option<String>,
}

/// An in-memory DnsProvider that tracks calls
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record pair created by this controller
    pub fn with_owned(self, hostname: &str, ip: &str) -> Self {
        self.push(RecordKind::Address, hostname, ip);
        self.push(RecordKind::Ownership, hostname, OWNERSHIP_TAG);
        self
    }

    /// Seed an ADDRESS record someone else created
    pub fn with_foreign(self, hostname: &str, ip: &str) -> Self {
        self.push(RecordKind::Address, hostname, ip);
        self
    }

    /// Seed a lone OWNERSHIP record
    pub fn with_ownership_only(self, hostname: &str) -> Self {
        self.push(RecordKind::Ownership, hostname, OWNERSHIP_TAG);
        self
    }

    fn push(&self, kind: RecordKind, hostname: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("rec-{}", state.next_id);
        state.records.push(ManagedRecord {
            kind,
            id,
            hostname: hostname.to_string(),
            content: content.to_string(),
        });
    }

    pub fn fail_fetch(&self) {
        self.state.lock().unwrap().fail_fetch = true;
    }

    pub fn fail_create_of(&self, hostname: &str) {
        self.state.lock().unwrap().fail_create = Some(hostname.to_string());
    }

    pub fn fail_delete_of(&self, hostname: &str) {
        self.state.lock().unwrap().fail_delete = Some(hostname.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_fetch = false;
        state.fail_create = None;
        state.fail_delete = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Calls that change provider state
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Fetch))
            .collect()
    }

    pub fn records(&self) -> Vec<ManagedRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn records_for(&self, hostname: &str) -> Vec<ManagedRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.hostname == hostname)
            .collect()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MemoryProvider {
    async fn fetch_records(&self) -> Result<CurrentRecords> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Fetch);
        if state.fail_fetch {
            return Err(Error::provider("memory", "listing failed"));
        }

        let mut current = CurrentRecords::new();
        for record in &state.records {
            current.insert(record.clone());
        }
        Ok(current)
    }

    async fn create_hostname(&self, hostname: &str, ip: IpAddr, ownership_exists: bool) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Create {
                hostname: hostname.to_string(),
                ip,
            });
            if state.fail_create.as_deref() == Some(hostname) {
                return Err(Error::provider("memory", format!("create {} failed", hostname)));
            }
        }

        self.push(RecordKind::Address, hostname, &ip.to_string());
        if !ownership_exists {
            self.push(RecordKind::Ownership, hostname, OWNERSHIP_TAG);
        }
        Ok(())
    }

    async fn delete_hostname(&self, owned: &OwnedHostname) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            hostname: owned.hostname.clone(),
        });
        if state.fail_delete.as_deref() == Some(owned.hostname.as_str()) {
            return Err(Error::provider("memory", format!("delete {} failed", owned.hostname)));
        }

        state
            .records
            .retain(|r| r.id != owned.address.id && r.id != owned.ownership.id);
        Ok(())
    }

    async fn delete_marker(&self, marker: &ManagedRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteMarker {
            hostname: marker.hostname.clone(),
        });
        state.records.retain(|r| r.id != marker.id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// An IpSource returning a fixed address and counting lookups
#[derive(Clone)]
pub struct FixedIpSource {
    ip: Arc<Mutex<Result<IpAddr>>>,
    lookups: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Arc::new(Mutex::new(Ok(ip))),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            ip: Arc::new(Mutex::new(Err(Error::ip_source("service unavailable")))),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, ip: IpAddr) {
        *self.ip.lock().unwrap() = Ok(ip);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match &*self.ip.lock().unwrap() {
            Ok(ip) => Ok(*ip),
            Err(e) => Err(Error::ip_source(e.to_string())),
        }
    }
}

/// A desired-state source the test can change between cycles
#[derive(Clone, Default)]
pub struct SwitchableSource {
    hostnames: Arc<Mutex<Option<Vec<String>>>>,
    queries: Arc<AtomicUsize>,
}

impl SwitchableSource {
    pub fn new(hostnames: &[&str]) -> Self {
        let source = Self::default();
        source.set(hostnames);
        source
    }

    pub fn set(&self, hostnames: &[&str]) {
        *self.hostnames.lock().unwrap() =
            Some(hostnames.iter().map(|h| h.to_string()).collect());
    }

    /// Make the next queries fail
    pub fn break_upstream(&self) {
        *self.hostnames.lock().unwrap() = None;
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DesiredStateSource for SwitchableSource {
    async fn desired_hostnames(&self) -> Result<DesiredHostnames> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &*self.hostnames.lock().unwrap() {
            Some(names) => Ok(names.iter().collect()),
            None => Err(Error::desired_state("container runtime unreachable")),
        }
    }

    fn source_name(&self) -> &'static str {
        "switchable"
    }
}

pub const PUBLIC_IP: [u8; 4] = [203, 0, 113, 7];

pub fn public_ip() -> IpAddr {
    IpAddr::from(PUBLIC_IP)
}

pub fn desired(names: &[&str]) -> DesiredHostnames {
    names.iter().collect()
}

/// Build an engine over shared test doubles
pub fn engine_with(
    provider: &MemoryProvider,
    ip_source: &FixedIpSource,
    repair_ip_drift: bool,
) -> ReconcileEngine {
    let config = EngineConfig {
        repair_ip_drift,
        event_channel_capacity: 100,
    };
    let (engine, _events) = ReconcileEngine::new(
        Box::new(provider.clone()),
        Box::new(ip_source.clone()),
        &config,
    )
    .expect("engine construction succeeds");
    engine
}
