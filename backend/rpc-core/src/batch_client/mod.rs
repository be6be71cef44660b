use crate::config::ClientConfig;
use crate::decoder::{self, PositionalMessage};
use crate::diagnostics::Diagnostics;
use crate::error::{CoreError, RpcError};
use crate::session::Session;
use crate::transport::{BatchTransport, demultiplex};

use models::{Call, Record, Schema};

use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Entry point for executing RPCs: `execute` decodes against a schema,
/// `execute_raw` hands back the payload as JSON.
pub struct BatchClient {
    transport: BatchTransport,
}

impl BatchClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, CoreError> {
        Self::with_diagnostics(config, session, Diagnostics::from_config(&config.diagnostics))
    }

    pub fn with_diagnostics(
        config: &ClientConfig,
        session: Arc<Session>,
        diagnostics: Diagnostics,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            transport: BatchTransport::new(config, session, diagnostics)?,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        self.transport.session()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.transport.diagnostics()
    }

    pub async fn execute(&self, call: &Call, schema: &Schema) -> Result<Record, RpcError> {
        self.execute_cancellable(call, schema, &CancellationToken::new())
            .await
    }

    pub async fn execute_raw(&self, call: &Call) -> Result<Value, RpcError> {
        self.execute_raw_cancellable(call, &CancellationToken::new())
            .await
    }

    pub async fn execute_typed<T: PositionalMessage>(&self, call: &Call) -> Result<T, RpcError> {
        let raw = self.execute_raw(call).await?;
        Ok(decoder::decode_message_with::<T>(&raw, self.diagnostics())?)
    }

    /// Like [`execute`](Self::execute), aborting with `Cancelled` when `cancel` fires.
    pub async fn execute_cancellable(
        &self,
        call: &Call,
        schema: &Schema,
        cancel: &CancellationToken,
    ) -> Result<Record, RpcError> {
        let raw = self.execute_raw_cancellable(call, cancel).await?;
        Ok(decoder::decode_with(&raw, schema, self.diagnostics())?)
    }

    pub async fn execute_raw_cancellable(
        &self,
        call: &Call,
        cancel: &CancellationToken,
    ) -> Result<Value, RpcError> {
        let calls = std::slice::from_ref(call);
        let response = self.transport.send(calls, cancel).await?;
        demultiplex(calls, response, self.diagnostics())
            .into_iter()
            .next()
            .unwrap_or_else(|| Err(RpcError::framing("empty demultiplex result", 0)))
    }

    /// Send several calls in one request.
    ///
    /// The outer error covers the exchange as a whole; each inner result is
    /// the payload (or remote error) for the call at the same position.
    /// Scoped calls in one batch must share a scope key.
    pub async fn execute_batch(
        &self,
        calls: &[Call],
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        self.execute_batch_cancellable(calls, &CancellationToken::new())
            .await
    }

    pub async fn execute_batch_cancellable(
        &self,
        calls: &[Call],
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        debug!("Executing batch of {} calls", calls.len());
        let response = self.transport.send(calls, cancel).await?;
        Ok(demultiplex(calls, response, self.diagnostics()))
    }
}
