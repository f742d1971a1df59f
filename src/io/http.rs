use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::ReadAt;
use anyhow::{Result, anyhow, bail};

/// HTTP Range reader for remote FZFS archives.
///
/// Metadata segments and chunks are fetched one range at a time, so only the
/// parts of the archive that extraction touches are transferred.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        if !header("accept-ranges").is_some_and(|v| v.contains("bytes")) {
            bail!("Remote server does not support Range requests");
        }

        let size = header("content-length")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        tracing::debug!(url = %url, size, "Opened remote archive");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Fetch the inclusive byte range `start..=end`, retrying on timeouts and
    /// connection failures with a linear backoff
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let range = format!("bytes={}-{}", start, end);
        let mut attempt = 0;

        loop {
            let err = match self.client.get(&self.url).header("Range", &range).send().await {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    let body = resp.bytes().await?;
                    if body.is_empty() {
                        bail!("Server returned an empty body for {}", range);
                    }
                    return Ok(body.to_vec());
                }
                Ok(resp) => bail!("HTTP request failed with status: {}", resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => e,
                Err(e) => return Err(e.into()),
            };

            attempt += 1;
            if attempt >= self.max_retry {
                bail!("Max retries exceeded for {}", range);
            }
            tracing::warn!("Connection error, retry {}/{}: {}", attempt, self.max_retry, err);
            tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
        }
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (end - offset + 1) as usize;
        let mut received = 0;

        // Servers may answer with less than the requested range
        while received < expected {
            let body = self.fetch_range(offset + received as u64, end).await?;
            let n = body.len().min(expected - received);
            buf[received..received + n].copy_from_slice(&body[..n]);
            received += n;

            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
