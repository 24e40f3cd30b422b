//! HTTP source for the research-tree event stream.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::decoder::{Decoded, StreamDecoder};
use crate::{Config, CoreError};

/// Path of the streaming endpoint, relative to the configured API URL.
pub const STREAM_PATH: &str = "/api/research-tree/stream";

/// Body of the search POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub natural_language_query: String,
    pub max_results_per_query: u32,
    pub max_queries: u32,
}

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server closed the connection; `records` counts every record seen.
    Completed { records: usize },
    /// The caller cancelled; no callbacks were made after the cancellation.
    Cancelled,
}

/// Issues searches and decodes their streamed responses.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    http: reqwest::Client,
    base_url: String,
    idle_timeout: Duration,
}

impl ResearchClient {
    pub fn new(config: &Config) -> Result<Self, CoreError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            idle_timeout: config.idle_timeout(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, STREAM_PATH)
    }

    /// Run one search, handing every decoded record to `on_item` in order.
    ///
    /// Returns once the server closes the stream, the caller cancels, or the
    /// stream fails or stalls. Records delivered before a failure stay
    /// delivered.
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
        on_item: impl FnMut(Decoded),
    ) -> Result<StreamOutcome, CoreError> {
        log::info!(
            "searching {:?} (max {} queries, {} results each)",
            request.natural_language_query,
            request.max_queries,
            request.max_results_per_query
        );

        let send = self.http.post(self.endpoint()).json(request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("search cancelled before the response arrived");
                return Ok(StreamOutcome::Cancelled);
            }
            response = tokio::time::timeout(self.idle_timeout, send) => match response {
                Ok(response) => response?,
                Err(_) => {
                    log::warn!(
                        "no response headers after {}s, giving up",
                        self.idle_timeout.as_secs()
                    );
                    return Err(CoreError::Stalled(self.idle_timeout));
                }
            },
        };

        read_response(response, self.idle_timeout, cancel, on_item).await
    }
}

/// Check the status of a streamed response and decode its body.
pub async fn read_response(
    response: reqwest::Response,
    idle_timeout: Duration,
    cancel: &CancellationToken,
    on_item: impl FnMut(Decoded),
) -> Result<StreamOutcome, CoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    decode_stream(response.bytes_stream(), idle_timeout, cancel, on_item).await
}

/// Decode a stream of byte chunks.
///
/// The only suspension point is waiting for the next chunk. A chunk's records
/// are delivered back to back; cancellation is checked between them.
pub async fn decode_stream<S, B, E>(
    stream: S,
    idle_timeout: Duration,
    cancel: &CancellationToken,
    mut on_item: impl FnMut(Decoded),
) -> Result<StreamOutcome, CoreError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CoreError: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = StreamDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("stream cancelled after {} records", decoder.records_seen());
                return Ok(StreamOutcome::Cancelled);
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        let chunk = match next {
            Err(_) => {
                log::warn!("no data for {}s, giving up", idle_timeout.as_secs());
                return Err(CoreError::Stalled(idle_timeout));
            }
            Ok(None) => break,
            Ok(Some(chunk)) => chunk?,
        };

        for item in decoder.push(chunk) {
            if cancel.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }
            on_item(item);
        }
    }

    if let Some(item) = decoder.finish() {
        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }
        on_item(item);
    }

    let records = decoder.records_seen();
    log::info!("stream closed after {records} records");
    Ok(StreamOutcome::Completed { records })
}
