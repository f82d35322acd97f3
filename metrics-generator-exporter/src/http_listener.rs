use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Full;
use hyper::{
    body::{self, Bytes, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1::Builder as HyperHttpBuilder,
    service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use ipnet::IpNet;
use metrics_generator::instruments::{CounterVec, Gauge};
use metrics_generator::{InstrumentSet, Opts};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::error::ExporterError;

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Name of the counter of scrapes served, by HTTP status code.
pub const SCRAPE_REQUESTS_NAME: &str = "promhttp_metric_handler_requests_total";

/// Name of the gauge of scrapes currently being served.
pub const SCRAPE_IN_FLIGHT_NAME: &str = "promhttp_metric_handler_requests_in_flight";

/// Convenience type for Future implementing an exporter.
pub type ExporterFuture = Pin<Box<dyn Future<Output = Result<(), ExporterError>> + Send + 'static>>;

struct HttpListeningExporter {
    inner: Arc<Inner>,
}

struct Inner {
    set: Arc<InstrumentSet>,
    scrapes: ScrapeMetrics,
    allowed_addresses: Option<Vec<IpNet>>,
}

/// The scrape handler's own instruments, served alongside everything else in the set.
struct ScrapeMetrics {
    requests: Arc<CounterVec>,
    in_flight: Gauge,
}

impl ScrapeMetrics {
    fn register(set: &InstrumentSet) -> Result<ScrapeMetrics, metrics_generator::Error> {
        let opts = Opts::new(SCRAPE_REQUESTS_NAME, "Total number of scrapes by HTTP status code.");
        let requests = set.register_vec(CounterVec::new(opts, &["code"])?)?;
        for code in ["200", "500", "503"] {
            requests.with_label_values(&[code])?;
        }

        let opts = Opts::new(SCRAPE_IN_FLIGHT_NAME, "Current number of scrapes being served.");
        let in_flight = set.register_gauge(opts)?;

        Ok(ScrapeMetrics { requests, in_flight })
    }

    fn record(&self, status: StatusCode) {
        match self.requests.with_label_values(&[status.as_str()]) {
            Ok(counter) => counter.inc(),
            Err(e) => warn!(error = %e, "failed to count scrape"),
        }
    }
}

impl HttpListeningExporter {
    async fn serve(&self, listener: std::net::TcpListener) -> Result<(), ExporterError> {
        let listener = TcpListener::from_std(listener).map_err(ExporterError::Runtime)?;

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Error accepting connection. Ignoring request. Error: {:?}", e);
                    continue;
                }
            };

            let remote_addr = match stream.peer_addr() {
                Ok(remote_address) => remote_address.ip(),
                Err(e) => {
                    warn!("Error obtaining remote address. Ignoring request. Error: {:?}", e);
                    continue;
                }
            };

            self.process_stream(stream, remote_addr);
        }
    }

    fn process_stream(&self, stream: TcpStream, remote_address: IpAddr) {
        let inner = self.inner.clone();
        let service = service_fn(move |req: Request<body::Incoming>| {
            let inner = inner.clone();
            async move { Self::handle_http_request(&inner, remote_address, &req) }
        });

        tokio::task::spawn(async move {
            if let Err(err) =
                HyperHttpBuilder::new().serve_connection(TokioIo::new(stream), service).await
            {
                warn!("Error serving connection.  Error: {:?}", err);
            };
        });
    }

    fn handle_http_request(
        inner: &Inner,
        remote_address: IpAddr,
        req: &Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let is_allowed = match &inner.allowed_addresses {
            Some(addresses) => addresses.iter().any(|address| address.contains(&remote_address)),
            None => true,
        };

        let path = req.uri().path();
        let response = if !is_allowed {
            Self::new_response(StatusCode::FORBIDDEN, Bytes::new())
        } else {
            match path {
                "/metrics" => Self::scrape(inner),
                "/health" => Self::new_response(StatusCode::OK, Bytes::from_static(b"OK")),
                _ => Self::new_response(StatusCode::NOT_FOUND, Bytes::new()),
            }
        };
        if path == "/metrics" {
            inner.scrapes.record(response.status());
        }

        debug!(
            remote = %remote_address,
            path,
            status = response.status().as_u16(),
            "served request"
        );
        Ok(response)
    }

    fn scrape(inner: &Inner) -> Response<Full<Bytes>> {
        inner.scrapes.in_flight.increment(1.0);
        let body = inner.set.render();
        inner.scrapes.in_flight.decrement(1.0);

        let mut response = Self::new_response(StatusCode::OK, Bytes::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
        response
    }

    fn new_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
    }
}

/// Binds an HTTP listener that serves `set` in the text exposition format.
///
/// `GET /metrics` renders the instrument set, `GET /health` answers `OK`, and anything else is
/// `404 Not Found`.  If an allow-list is given, requests from any other address are answered with
/// `403 Forbidden`.
///
/// The listener registers its own instruments in `set`: a counter of `/metrics` requests by
/// status code ([`SCRAPE_REQUESTS_NAME`]) and a gauge of scrapes in progress
/// ([`SCRAPE_IN_FLIGHT_NAME`]).  A scrape sees itself as in flight, and is counted once its
/// response is ready.
///
/// Returns the address actually bound, which differs from `listen_address` when port 0 was asked
/// for, along with the future that serves requests until it is dropped.
///
/// # Errors
/// Will return Err if it cannot bind to the listen address, or if the listener's own instruments
/// are already registered in `set`.
pub fn new_http_listener(
    set: Arc<InstrumentSet>,
    listen_address: SocketAddr,
    allowed_addresses: Option<Vec<IpNet>>,
) -> Result<(SocketAddr, ExporterFuture), ExporterError> {
    let bind_error =
        |source| ExporterError::FailedToCreateHttpListener { address: listen_address, source };
    let listener = std::net::TcpListener::bind(listen_address)
        .and_then(|listener| {
            listener.set_nonblocking(true)?;
            Ok(listener)
        })
        .map_err(bind_error)?;
    let local_address = listener.local_addr().map_err(bind_error)?;

    let scrapes = ScrapeMetrics::register(&set).map_err(ExporterError::ScrapeMetrics)?;
    let inner = Inner { set, scrapes, allowed_addresses };
    let exporter = HttpListeningExporter { inner: Arc::new(inner) };

    Ok((local_address, Box::pin(async move { exporter.serve(listener).await })))
}

#[cfg(test)]
mod tests {
    use hyper::body::Bytes;
    use hyper::StatusCode;

    use super::HttpListeningExporter;

    #[test]
    fn new_response_keeps_status() {
        let response = HttpListeningExporter::new_response(StatusCode::FORBIDDEN, Bytes::new());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().is_empty());
    }
}
