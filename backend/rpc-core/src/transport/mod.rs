//! Frame transport: one HTTP exchange per batch, streamed de-framing,
//! envelope demultiplexing, network retry and one-shot auth refresh.
//!
//! # Recovery policy
//! - Network errors and 502/503/504: retried with exponential backoff up to
//!   `retry.max_retries`, each attempt with a fresh timeout
//! - Auth rejection (401/403, a session-expired marker, or envelope code 16):
//!   one refresh through the [`Session`], then one more exchange
//! - Everything else (framing, other 4xx, remote codes): surfaced immediately

pub mod envelope;
pub mod framing;

pub use envelope::{DATA_ENVELOPE_MARKER, RpcEnvelope, UNAUTHENTICATED_CODE, parse_frame};
pub use framing::{ANTI_HIJACK_PREAMBLE, Frame, FrameReader, split_frames};

use crate::config::{ClientConfig, RetryConfig};
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::encoder::{CallEncoder, EncodedRequest};
use crate::error::{ConfigError, CoreError, RpcError};
use crate::session::{Credentials, Session};

use common::{ErrorLocation, HttpStatusCode};
use models::Call;

use std::collections::{HashMap, VecDeque};
use std::panic::Location;
use std::sync::Arc;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::time::sleep as TokioSleep;
use tokio_util::sync::CancellationToken;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";
const SAME_DOMAIN_HEADER: &str = "X-Same-Domain";
/// Most of an unframed body inspected for session-expired markers.
const UNFRAMED_BODY_LIMIT: usize = 64 * 1024;

/// Data envelopes from one successful exchange, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    pub envelopes: Vec<RpcEnvelope>,
    pub bytes_read: usize,
}

/// Outcome of one exchange that did not produce envelopes.
#[derive(Debug)]
enum ExchangeFailure {
    AuthRejected(String),
    Failed(RpcError),
}

impl From<RpcError> for ExchangeFailure {
    fn from(error: RpcError) -> Self {
        ExchangeFailure::Failed(error)
    }
}

pub struct BatchTransport {
    client: Client,
    batch_url: Url,
    encoder: CallEncoder,
    session: Arc<Session>,
    retry: RetryConfig,
    session_expired_markers: Vec<String>,
    diagnostics: Diagnostics,
}

impl BatchTransport {
    pub fn new(
        config: &ClientConfig,
        session: Arc<Session>,
        diagnostics: Diagnostics,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let batch_url = Url::parse(&config.endpoint.base_url)
            .and_then(|base| base.join(&config.endpoint.batch_path))
            .map_err(|e| ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid batch endpoint URL: {e}"),
            })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RpcError::from_reqwest("client", &e))?;

        Ok(Self {
            client,
            batch_url,
            encoder: CallEncoder::new(&config.endpoint),
            session,
            retry: config.retry.clone(),
            session_expired_markers: config.auth.session_expired_markers.clone(),
            diagnostics,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }

    /// Send a batch and collect its data envelopes.
    pub async fn send(
        &self,
        calls: &[Call],
        cancel: &CancellationToken,
    ) -> Result<BatchResponse, RpcError> {
        let label = calls.iter().map(Call::id).collect::<Vec<_>>().join(",");
        if cancel.is_cancelled() {
            return Err(RpcError::cancelled(label));
        }

        let mut snapshot = self.session.current().await;
        let mut refreshed = false;

        loop {
            let request = self.encoder.encode(calls, &snapshot.credentials)?;
            self.diagnostics.emit(|| DiagnosticEvent::RequestEncoded {
                rpc_ids: request.rpc_ids.clone(),
                request_index: request.request_index,
                body_preview: self.diagnostics.preview(request.batch_json.as_bytes()),
            });
            debug!("Sending batch [{label}] as request {}", request.request_index);

            match self
                .exchange_with_retry(&request, &snapshot.credentials, cancel)
                .await
            {
                Ok(response) => return Ok(response),
                Err(ExchangeFailure::Failed(e)) => return Err(e),
                Err(ExchangeFailure::AuthRejected(reason)) if refreshed => {
                    warn!("Batch [{label}] rejected again after refresh: {reason}");
                    return Err(RpcError::AuthExpired {
                        rpc_id: Some(label),
                        message: format!("credentials rejected after refresh: {reason}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                Err(ExchangeFailure::AuthRejected(reason)) => {
                    info!("Batch [{label}] rejected ({reason}), refreshing credentials");
                    snapshot = tokio::select! {
                        _ = cancel.cancelled() => return Err(RpcError::cancelled(label)),
                        result = self.session.refresh_after(snapshot.generation) => {
                            result.map_err(|e| e.with_rpc_id(&label))?
                        }
                    };
                    refreshed = true;
                }
            }
        }
    }

    async fn exchange_with_retry(
        &self,
        request: &EncodedRequest,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<BatchResponse, ExchangeFailure> {
        let mut backoff = ExponentialBackoff {
            current_interval: self.retry.initial_delay(),
            initial_interval: self.retry.initial_delay(),
            max_interval: self.retry.max_delay(),
            max_elapsed_time: None,
            ..Default::default()
        };
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RpcError::cancelled(request.label()).into()),
                result = self.exchange(request, credentials, attempt) => result,
            };

            match result {
                Err(ExchangeFailure::Failed(e))
                    if e.is_retryable() && attempt <= self.retry.max_retries =>
                {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.retry.max_delay());
                    warn!(
                        "Batch [{}] attempt {attempt} failed ({}), retrying after {delay:?}: {e}",
                        request.label(),
                        e.error_category()
                    );
                    self.diagnostics.emit(|| DiagnosticEvent::RetryScheduled {
                        rpc_ids: request.rpc_ids.clone(),
                        attempt,
                        delay,
                        reason: e.error_category().to_string(),
                    });
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(RpcError::cancelled(request.label()).into());
                        }
                        _ = TokioSleep(delay) => {}
                    }
                }
                other => return other,
            }
        }
    }

    /// One HTTP exchange. Dropping the future aborts the request and discards
    /// any partially read frames.
    async fn exchange(
        &self,
        request: &EncodedRequest,
        credentials: &Credentials,
        attempt: u32,
    ) -> Result<BatchResponse, ExchangeFailure> {
        let label = request.label();

        let mut url = self.batch_url.clone();
        url.query_pairs_mut().extend_pairs(&request.query);

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(SAME_DOMAIN_HEADER, "1")
            .body(request.body.clone());
        let cookie_header = credentials.cookie_header();
        if !cookie_header.is_empty() {
            builder = builder.header(COOKIE, cookie_header);
        }
        if let Some(token) = &credentials.bearer_token {
            builder = builder.bearer_auth(token.expose());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(&label, &e))?;

        let status = HttpStatusCode(response.status().as_u16());
        self.diagnostics.emit(|| DiagnosticEvent::ResponseStatus {
            rpc_ids: request.rpc_ids.clone(),
            status: status.0,
            attempt,
        });

        if !status.is_success() {
            let body = error_body(&label, response.text().await);
            if status.is_auth_rejection() {
                return Err(ExchangeFailure::AuthRejected(format!("HTTP {status}")));
            }
            if let Some(marker) = self.session_expired_marker(&body) {
                return Err(ExchangeFailure::AuthRejected(format!(
                    "HTTP {status} with session-expired marker {marker:?}"
                )));
            }
            return Err(RpcError::from_http_response(label, status.0, &body).into());
        }

        let mut reader = FrameReader::new();
        let mut envelopes = Vec::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RpcError::from_reqwest(&label, &e))?
        {
            reader.push(&chunk);
            if let Err(e) = self.drain_frames(&mut reader, &mut envelopes) {
                return Err(self.classify_unframed(e, &reader, &mut response, &label).await);
            }
        }
        if let Err(e) = reader.finish() {
            return Err(self.classify_unframed(e, &reader, &mut response, &label).await);
        }

        if let Some(rejected) = envelopes.iter().find(|envelope| envelope.is_auth_rejection()) {
            return Err(ExchangeFailure::AuthRejected(format!(
                "rpc '{}' answered with code {UNAUTHENTICATED_CODE}",
                rejected.matched_id
            )));
        }

        trace!(
            "Batch [{label}] read {} envelopes from {} bytes",
            envelopes.len(),
            reader.bytes_read()
        );
        Ok(BatchResponse {
            envelopes,
            bytes_read: reader.bytes_read(),
        })
    }

    fn drain_frames(
        &self,
        reader: &mut FrameReader,
        envelopes: &mut Vec<RpcEnvelope>,
    ) -> Result<(), RpcError> {
        while let Some(frame) = reader.next_frame()? {
            self.diagnostics.emit(|| DiagnosticEvent::FrameRead {
                offset: frame.offset,
                declared_length: frame.declared_length,
                preview: self.diagnostics.preview(&frame.payload),
            });
            envelopes.extend(parse_frame(&frame, &self.diagnostics)?);
        }
        Ok(())
    }

    /// A 2xx body without the preamble is usually a login page.
    async fn classify_unframed(
        &self,
        error: RpcError,
        reader: &FrameReader,
        response: &mut Response,
        label: &str,
    ) -> ExchangeFailure {
        if reader.preamble_matched() {
            return ExchangeFailure::Failed(error.with_rpc_id(label));
        }

        let mut body = reader.pending_bytes().to_vec();
        while body.len() < UNFRAMED_BODY_LIMIT {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                _ => break,
            }
        }

        let text = String::from_utf8_lossy(&body);
        match self.session_expired_marker(&text) {
            Some(marker) => ExchangeFailure::AuthRejected(format!(
                "unframed response with session-expired marker {marker:?}"
            )),
            None => ExchangeFailure::Failed(error.with_rpc_id(label)),
        }
    }

    fn session_expired_marker(&self, body: &str) -> Option<&str> {
        self.session_expired_markers
            .iter()
            .find(|marker| body.contains(marker.as_str()))
            .map(String::as_str)
    }
}

/// Text of a non-2xx body; a failed read becomes a placeholder naming the failure.
pub(crate) fn error_body(label: &str, read: Result<String, reqwest::Error>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            warn!("Batch [{label}] error body could not be read: {e}");
            format!("<body unreadable: {e}>")
        }
    }
}

/// Assign envelopes to calls, in call order.
///
/// Envelopes for ids nobody asked for are ignored. When one id appears more
/// than once in the batch, the k-th call with that id gets the k-th envelope
/// with that id, ordered by sequence index.
pub fn demultiplex(
    calls: &[Call],
    response: BatchResponse,
    diagnostics: &Diagnostics,
) -> Vec<Result<Value, RpcError>> {
    let bytes_read = response.bytes_read;

    let mut queues: HashMap<String, Vec<RpcEnvelope>> = HashMap::new();
    for envelope in response.envelopes {
        queues
            .entry(envelope.matched_id.clone())
            .or_default()
            .push(envelope);
    }
    let mut queues: HashMap<String, VecDeque<RpcEnvelope>> = queues
        .into_iter()
        .map(|(id, mut envelopes)| {
            envelopes.sort_by_key(|envelope| envelope.sequence_index);
            (id, VecDeque::from(envelopes))
        })
        .collect();

    calls
        .iter()
        .map(|call| {
            let Some(envelope) = queues.get_mut(call.id()).and_then(VecDeque::pop_front) else {
                return Err(RpcError::framing(
                    format!("missing envelope for rpc '{}'", call.id()),
                    bytes_read,
                )
                .with_rpc_id(call.id()));
            };

            diagnostics.emit(|| DiagnosticEvent::EnvelopeMatched {
                rpc_id: envelope.matched_id.clone(),
                sequence_index: envelope.sequence_index,
            });

            match envelope.error_code {
                Some(code) => Err(RpcError::remote(call.id(), code)),
                None => Ok(envelope.response_payload),
            }
        })
        .collect()
}
