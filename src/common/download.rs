use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::{blocking::Client, redirect::Policy};

/// Build the blocking HTTP client used for dataset fetches.
pub fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("heatrisk/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(10));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("[common::download] Failed to build HTTP client")
}

/// GET `url` fully into memory. Non-2xx statuses are errors.
pub fn download_bytes(client: &Client, url: &str) -> Result<Bytes> {
    let resp = client.get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))?;

    resp.bytes().with_context(|| format!("read body of {url}"))
}
