use std::time::Duration;

use guildsweep::proxy::{ProbeFormat, ProbeService, ProxyChecker};
use guildsweep::stats::RunStats;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// The mock server doubles as the outbound proxy: plain-HTTP targets reach
// an HTTP proxy as ordinary GET requests, so pointing both the proxy
// descriptor and the probe URLs at the same server exercises the real
// proxied code path.
fn probe(server: &MockServer, route: &str, format: ProbeFormat) -> ProbeService {
    ProbeService {
        url: format!("{}{route}", server.uri()),
        format,
    }
}

/// `host:port` descriptor pointing at the mock server.
fn proxy_descriptor(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

#[tokio::test]
async fn first_success_short_circuits_remaining_probes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.9\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.9"))
        .expect(0)
        .mount(&server)
        .await;

    let checker = ProxyChecker::new(
        vec![
            probe(&server, "/a", ProbeFormat::Text),
            probe(&server, "/b", ProbeFormat::Text),
            probe(&server, "/c", ProbeFormat::Text),
        ],
        Duration::from_secs(2),
    );
    let stats = RunStats::default();

    assert!(checker.check(&proxy_descriptor(&server), "1", &stats).await);
    let snap = stats.snapshot();
    assert_eq!(snap.proxy_checked, 1);
    assert_eq!(snap.proxy_working, 1);
    assert_eq!(snap.proxy_failed, 0);
}

#[tokio::test]
async fn json_probe_reads_ip_from_named_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"origin": "203.0.113.9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = ProxyChecker::new(
        vec![probe(&server, "/ip", ProbeFormat::Json("origin"))],
        Duration::from_secs(2),
    );
    let stats = RunStats::default();

    assert!(checker.check(&proxy_descriptor(&server), "2", &stats).await);
    assert_eq!(stats.snapshot().proxy_working, 1);
}

#[tokio::test]
async fn all_non_200_probes_mark_proxy_unusable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let checker = ProxyChecker::new(
        vec![
            probe(&server, "/a", ProbeFormat::Text),
            probe(&server, "/b", ProbeFormat::Text),
        ],
        Duration::from_secs(2),
    );
    let stats = RunStats::default();

    assert!(!checker.check(&proxy_descriptor(&server), "3", &stats).await);
    let snap = stats.snapshot();
    assert_eq!(snap.proxy_failed, 1);
    assert_eq!(snap.proxy_working, 0);
}
