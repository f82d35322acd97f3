use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Collected, Empty};
use hyper::{
    body::{Buf, Bytes},
    header::CONTENT_TYPE,
    Request, StatusCode, Uri,
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use ipnet::IpNet;
use metrics_generator::{InstrumentSet, SynthesisBuilder};
use metrics_generator_exporter::{
    build_instrument_set, new_http_listener, ExporterConfig, ExporterError, BUILD_INFO_NAME,
    SCRAPE_IN_FLIGHT_NAME, SCRAPE_REQUESTS_NAME, TEXT_CONTENT_TYPE,
};

fn local() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

fn start(set: Arc<InstrumentSet>, allowed: Option<Vec<IpNet>>) -> SocketAddr {
    let (address, exporter) = new_http_listener(set, local(), allowed)
        .unwrap_or_else(|e| panic!("failed to create http listener: {:?}", e));
    tokio::spawn(exporter);
    address
}

async fn read_from(address: SocketAddr, path: &str) -> (StatusCode, String, String) {
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new());

    let uri = format!("http://{address}{path}")
        .parse::<Uri>()
        .unwrap_or_else(|e| panic!("Error parsing URI: {:?}", e));
    let req = Request::builder()
        .uri(uri)
        .body(Empty::<Bytes>::new())
        .unwrap_or_else(|e| panic!("Failed building request: {:?}", e));

    let response = client
        .request(req)
        .await
        .unwrap_or_else(|e| panic!("Failed requesting data from {address}{path}: {:?}", e));

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut body = response
        .into_body()
        .collect()
        .await
        .map(Collected::aggregate)
        .unwrap_or_else(|e| panic!("Error reading response: {:?}", e));
    let body = body.copy_to_bytes(body.remaining()).to_vec();

    (status, String::from_utf8(body).expect("body is utf-8"), content_type)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serves_synthetic_metrics() {
    let set = Arc::new(InstrumentSet::new());
    let instruments = SynthesisBuilder::new(20, 2).build(&set).expect("builds");
    instruments.counters()[0].inc();

    let address = start(set, None);
    let (status, body, content_type) = read_from(address, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, TEXT_CONTENT_TYPE);
    assert!(body.contains("# TYPE monitor_exporter_response_0_total counter\n"));
    assert!(body.contains("monitor_exporter_response_0_total{repo=\"custom-exporter\"} 1\n"));
    assert!(body.contains("monitor_exporter_memory_0_usage_bytes{repo=\"custom-exporter\"} 0\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scrape_follows_ticks() {
    let config = ExporterConfig::new().with_metric_num(20).with_label_num(1);
    let (set, driver) = build_instrument_set(&config).expect("builds");
    let mut driver = driver.expect("generation is enabled");
    driver.tick_once();
    driver.tick_once();

    let address = start(set, None);
    let (status, body, _) = read_from(address, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(BUILD_INFO_NAME));
    assert!(body.contains("monitor_exporter_response_0_total{repo=\"custom-exporter\"} 2\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scrapes_count_themselves() {
    let set = Arc::new(InstrumentSet::new());
    let address = start(set.clone(), None);

    let (_, first, _) = read_from(address, "/metrics").await;
    assert!(first.contains(&format!("{}{{code=\"200\"}} 0\n", SCRAPE_REQUESTS_NAME)));
    assert!(first.contains(&format!("{}{{code=\"503\"}} 0\n", SCRAPE_REQUESTS_NAME)));
    assert!(first.contains(&format!("{} 1\n", SCRAPE_IN_FLIGHT_NAME)));

    read_from(address, "/health").await;
    let (_, second, _) = read_from(address, "/metrics").await;
    assert!(second.contains(&format!("{}{{code=\"200\"}} 1\n", SCRAPE_REQUESTS_NAME)));

    let requests = set.counter_vec(SCRAPE_REQUESTS_NAME).expect("registered by the listener");
    assert_eq!(requests.get_label_values(&["200"]).map(|c| c.get()), Some(2));
}

#[test]
fn test_scrape_metrics_registered_once() {
    let set = Arc::new(InstrumentSet::new());
    let _first = new_http_listener(set.clone(), local(), None).expect("binds");

    match new_http_listener(set, local(), None) {
        Err(ExporterError::ScrapeMetrics(_)) => {}
        Err(e) => panic!("unexpected error: {:?}", e),
        Ok(_) => panic!("listener metrics should already be registered"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_and_unknown_paths() {
    let address = start(Arc::new(InstrumentSet::new()), None);

    let (status, body, _) = read_from(address, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (status, body, _) = read_from(address, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_allowlist() {
    let denied: IpNet = "10.0.0.0/8".parse().expect("valid subnet");
    let address = start(Arc::new(InstrumentSet::new()), Some(vec![denied]));
    let (status, _, _) = read_from(address, "/metrics").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let allowed: IpNet = "127.0.0.0/8".parse().expect("valid subnet");
    let address = start(Arc::new(InstrumentSet::new()), Some(vec![denied, allowed]));
    let (status, _, _) = read_from(address, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_bind_failure() {
    let (address, _exporter) =
        new_http_listener(Arc::new(InstrumentSet::new()), local(), None).expect("binds");

    let err = match new_http_listener(Arc::new(InstrumentSet::new()), address, None) {
        Ok(_) => panic!("second bind to {address} should fail"),
        Err(e) => e,
    };
    assert!(err.to_string().contains(&address.to_string()));
}
