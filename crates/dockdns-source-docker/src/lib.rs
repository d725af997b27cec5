// # Docker Label Source
//
// Derives the desired hostname set from the labels of running containers.
//
// A container contributes `<subdomain>.<domain>` when:
// - its `traefik.enable` label is present and not `false`
// - it carries a `docker_dns.subdomain` label
// - the resulting name is a valid domain name
//
// ## Transport
//
// The Docker Engine API is reached through `bollard`, over the mounted unix
// socket (`unix:///var/run/docker.sock`, the default) or over TCP
// (`DOCKER_HOST=tcp://host:2375`).

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;
use bollard::{API_DEFAULT_VERSION, Docker};
use dockdns_core::config::{DesiredStateConfig, validate_domain_name};
use dockdns_core::traits::DesiredStateSource;
use dockdns_core::{DesiredHostnames, Error, Result};

/// Label carrying the subdomain to publish
pub const SUBDOMAIN_LABEL: &str = "docker_dns.subdomain";

/// Label a container must enable to be considered at all
pub const ENABLE_LABEL: &str = "traefik.enable";

/// Seconds before an Engine API request is abandoned
const DOCKER_TIMEOUT_SECS: u64 = 30;

/// Compute the desired hostnames from container labels
///
/// Labels that do not form a valid hostname are skipped with a warning, so
/// one bad container cannot block every other change.
pub fn desired_from_labels<'a>(
    containers: impl IntoIterator<Item = &'a ContainerSummary>,
    domain: &str,
) -> DesiredHostnames {
    let mut desired = DesiredHostnames::new();

    for container in containers {
        let Some(labels) = &container.labels else {
            continue;
        };
        let id = container.id.as_deref().unwrap_or("<unknown>");

        match labels.get(ENABLE_LABEL) {
            Some(value) if value != "false" => {}
            _ => continue,
        }

        let Some(subdomain) = labels.get(SUBDOMAIN_LABEL) else {
            continue;
        };
        let subdomain = subdomain.trim().trim_end_matches('.');
        if subdomain.is_empty() {
            tracing::warn!("Container {} has an empty {} label", id, SUBDOMAIN_LABEL);
            continue;
        }

        let hostname = format!("{}.{}", subdomain, domain).to_ascii_lowercase();
        if let Err(e) = validate_domain_name(&hostname) {
            tracing::warn!(
                "Container {} asks for {}, which is not a valid hostname: {}",
                id,
                hostname,
                e
            );
            continue;
        }

        desired.insert(&hostname);
    }

    desired
}

/// Open an Engine API client for a `DOCKER_HOST` value
fn connect(endpoint: &str) -> Result<Docker> {
    let docker = if endpoint.starts_with("unix://") {
        Docker::connect_with_socket(endpoint, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
    } else if endpoint.starts_with("tcp://") || endpoint.starts_with("http://") {
        Docker::connect_with_http(endpoint, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
    } else {
        return Err(Error::config(format!(
            "Unsupported Docker endpoint {}. Use unix://, tcp:// or http://",
            endpoint
        )));
    };

    docker.map_err(|e| Error::config(format!("Cannot connect to Docker at {}: {}", endpoint, e)))
}

/// Desired-state source backed by the Docker Engine API
#[derive(Debug, Clone)]
pub struct DockerLabelSource {
    docker: Docker,
    endpoint: String,
    domain: String,
}

impl DockerLabelSource {
    /// Create a source for the given engine endpoint and base domain
    pub fn new(endpoint: &str, domain: impl Into<String>) -> Result<Self> {
        Ok(Self {
            docker: connect(endpoint)?,
            endpoint: endpoint.to_string(),
            domain: domain.into(),
        })
    }

    /// Create a source from configuration
    pub fn from_config(config: &DesiredStateConfig) -> Result<Self> {
        match config {
            DesiredStateConfig::Docker { endpoint, domain } => Self::new(endpoint, domain.clone()),
        }
    }

    /// List running containers
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        self.docker
            .list_containers(None::<ListContainersOptions<String>>)
            .await
            .map_err(|e| {
                Error::desired_state(format!(
                    "Listing containers at {} failed: {}",
                    self.endpoint, e
                ))
            })
    }
}

#[async_trait]
impl DesiredStateSource for DockerLabelSource {
    async fn desired_hostnames(&self) -> Result<DesiredHostnames> {
        let containers = self.list_containers().await?;
        let desired = desired_from_labels(&containers, &self.domain);
        tracing::debug!(
            "{} running container(s) yield {} hostname(s)",
            containers.len(),
            desired.len()
        );
        Ok(desired)
    }

    fn source_name(&self) -> &'static str {
        "docker"
    }
}
