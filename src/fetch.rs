//! Input loading: a local path or an HTTP(S) URL, with transparent gzip
//! decompression for `.gz` exports.

use anyhow::Result;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Loads input data from a local file path or fetches it over HTTP, then
/// gunzips it when the source name ends in `.gz`.
#[tracing::instrument(fields(source = %source))]
pub async fn load_input(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source)?
    };

    debug!(bytes = bytes.len(), "Input bytes loaded");
    maybe_gunzip(source, bytes)
}

fn maybe_gunzip(source: &str, bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !source.ends_with(".gz") {
        return Ok(bytes);
    }
    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
