//! Prometheus remote read endpoint
//!
//! `POST /api/v1/read` takes a snappy block compressed protobuf
//! `ReadRequest` and answers with a snappy compressed `ReadResponse`
//! (SAMPLES response type).

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use prost::Message;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::constants::{
    CONTENT_ENCODING_SNAPPY, CONTENT_TYPE_PROTOBUF, READ_BODY_LIMIT, READ_MAX_DECODED_BYTES,
    REMOTE_READ_VERSION, REMOTE_READ_VERSION_HEADER,
};
use crate::domain::promql::prompb::{ReadRequest, ReadResponse, ResponseType};
use crate::domain::promql::{ReadContext, ReadError, Reader};

#[derive(Clone)]
pub struct ReadState {
    pub reader: Arc<Reader>,
    /// Parent of every request's cancellation token; cancelled on shutdown
    pub cancel: CancellationToken,
    /// Per-request deadline
    pub timeout: Option<Duration>,
}

pub fn routes(state: ReadState) -> Router {
    Router::new()
        .route("/read", post(read))
        .with_state(state)
        .layer(DefaultBodyLimit::max(READ_BODY_LIMIT))
}

/// Errors surfaced by the remote read endpoint
#[derive(Error, Debug)]
pub enum RemoteReadError {
    #[error("snappy decode error: {0}")]
    Snappy(#[from] snap::Error),

    #[error("decoded request too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("snappy encode error: {0}")]
    Encode(snap::Error),

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl RemoteReadError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Snappy(_) | Self::TooLarge { .. } | Self::Protobuf(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Read(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Read(e) if e.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RemoteReadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "Remote read failed");
        } else {
            tracing::debug!(
                error = %self,
                status = status.as_u16(),
                "Rejected remote read request"
            );
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

pub async fn read(State(state): State<ReadState>, body: Bytes) -> Response {
    match handle_read(&state, &body).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, CONTENT_TYPE_PROTOBUF),
                (header::CONTENT_ENCODING, CONTENT_ENCODING_SNAPPY),
                (
                    HeaderName::from_static(REMOTE_READ_VERSION_HEADER),
                    REMOTE_READ_VERSION,
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_read(state: &ReadState, body: &[u8]) -> Result<Vec<u8>, RemoteReadError> {
    let request = decode_read_request(body)?;

    if !request.accepted_response_types.is_empty()
        && !request
            .accepted_response_types
            .contains(&(ResponseType::Samples as i32))
    {
        tracing::debug!(
            accepted = ?request.accepted_response_types,
            "Client did not list SAMPLES; answering with SAMPLES anyway"
        );
    }

    let mut ctx = ReadContext::child_of(&state.cancel);
    if let Some(timeout) = state.timeout {
        ctx = ctx.with_timeout(timeout);
    }

    let response = state.reader.read(&ctx, &request).await?;
    encode_read_response(&response)
}

/// Snappy-decompress and decode a `ReadRequest`
pub fn decode_read_request(body: &[u8]) -> Result<ReadRequest, RemoteReadError> {
    let size = snap::raw::decompress_len(body)?;
    if size > READ_MAX_DECODED_BYTES {
        return Err(RemoteReadError::TooLarge {
            size,
            max: READ_MAX_DECODED_BYTES,
        });
    }
    let decompressed = snap::raw::Decoder::new().decompress_vec(body)?;
    Ok(ReadRequest::decode(decompressed.as_slice())?)
}

/// Encode and snappy-compress a `ReadResponse`
pub fn encode_read_response(response: &ReadResponse) -> Result<Vec<u8>, RemoteReadError> {
    snap::raw::Encoder::new()
        .compress_vec(&response.encode_to_vec())
        .map_err(RemoteReadError::Encode)
}
