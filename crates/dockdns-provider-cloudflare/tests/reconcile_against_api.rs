//! End-to-end reconciliation against a mocked Cloudflare API
//!
//! Constraints verified:
//! - Owned records for hostnames no longer wanted are deleted as a pair
//! - Records without the ownership marker are never deleted
//! - Missing hostnames are created with the public IP

use dockdns_core::traits::IpSource;
use dockdns_core::{EngineConfig, ReconcileEngine, Result, StaticSource};
use dockdns_provider_cloudflare::CloudflareProvider;
use serde_json::json;
use std::net::IpAddr;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedIp;

#[async_trait::async_trait]
impl IpSource for FixedIp {
    async fn current(&self) -> Result<IpAddr> {
        Ok("203.0.113.7".parse().unwrap())
    }
}

#[tokio::test]
async fn cycle_creates_missing_and_deletes_owned_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{ "id": "z1" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zones/z1/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "type": "A", "id": "a-old", "name": "old.example.com", "content": "203.0.113.7" },
                { "type": "TXT", "id": "t-old", "name": "old.example.com", "content": "\"owner=docker_dns\"" },
                { "type": "A", "id": "a-manual", "name": "manual.example.com", "content": "10.0.0.1" }
            ],
            "result_info": { "page": 1, "total_pages": 1 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/zones/z1/dns_records"))
        .and(body_partial_json(json!({ "name": "new.example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "type": "A", "id": "created", "name": "new.example.com", "content": "203.0.113.7" }
        })))
        .expect(2)
        .mount(&server)
        .await;
    for id in ["a-old", "t-old"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/zones/z1/dns_records/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "id": id } })))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/zones/z1/dns_records/a-manual"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = CloudflareProvider::new(
        dockdns_core::Credentials::new("admin@example.com", "key"),
        "example.com",
        Some(server.uri()),
    )
    .unwrap();
    let (engine, _events) =
        ReconcileEngine::new(Box::new(provider), Box::new(FixedIp), &EngineConfig::default()).unwrap();

    let report = engine
        .run_cycle(&StaticSource::new(["new.example.com"]))
        .await
        .unwrap();

    assert_eq!(report.created, vec!["new.example.com"]);
    assert_eq!(report.deleted, vec!["old.example.com"]);
    assert_eq!(report.skipped_foreign, vec!["manual.example.com"]);
}
