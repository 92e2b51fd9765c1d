use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::RETRY_AFTER;
use hyper::{Body, Client, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

pub(crate) fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Client::builder().build::<_, Body>(connector)
}

/// Sends `request`, bounded by `limit`, and returns the body of a 2xx reply.
///
/// 429 becomes [`AdapterError::RateLimited`]; any other non-success status
/// becomes [`AdapterError::Status`].
pub(crate) async fn execute(
    client: &HyperClient,
    request: Request<Body>,
    limit: Duration,
    provider: &'static str,
) -> AdapterResult<Bytes> {
    let uri = request.uri().clone();
    let response = timeout(limit, client.request(request))
        .await
        .map_err(|_| {
            AdapterError::transport(format!("{provider} request timed out after {limit:?}"))
        })?
        .map_err(|err| AdapterError::transport(format!("{provider} request failed: {err}")))?;

    let status = response.status();
    let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
    let bytes = timeout(limit, to_bytes(response.into_body()))
        .await
        .map_err(|_| AdapterError::transport(format!("{provider} response body timed out")))?
        .map_err(|err| {
            AdapterError::transport(format!("failed to read {provider} response: {err}"))
        })?;

    debug!(
        provider,
        %uri,
        status = status.as_u16(),
        bytes = bytes.len(),
        "provider call finished"
    );

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited { retry_after });
    }
    if !status.is_success() {
        return Err(AdapterError::Status {
            provider,
            status: status.as_u16(),
            reason: String::from_utf8_lossy(&bytes).trim().to_owned(),
        });
    }
    Ok(bytes)
}

fn parse_retry_after(value: Option<&hyper::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Accepts `https://host/path` or a bare host and returns `scheme://host/path/`.
pub(crate) fn normalize_base_url(input: &str, provider: &str) -> AdapterResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AdapterError::configuration(format!(
            "{provider} base URL must not be empty"
        )));
    }
    let mut base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<hyper::Uri>().map_err(|err| {
        AdapterError::configuration(format!("invalid {provider} base URL: {err}"))
    })?;
    Ok(base)
}
