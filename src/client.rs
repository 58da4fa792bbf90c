/*
 * Copyright 2020 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! The contract between the filter and an authorization service, and the
//! transports implementing it.

pub mod cache;
pub mod grpc;
pub mod http;

use std::{
    collections::BTreeMap,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, SystemTime},
};

use ::http::{HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::metadata::{DynamicMetadata, Struct};

pub use self::{
    cache::{AsyncClientCache, CacheKey, ClientHandle, Transport},
    grpc::GrpcClient,
    http::HttpClient,
};

/// A single authorization call. Implementations perform exactly one remote
/// call per [`Client::check`] and abort it when the returned future is
/// dropped.
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    async fn check(&self, request: CheckRequest, timeout: Duration) -> CheckResult;
}

pub type CheckResult = Result<Response, Error>;

/// Why an authorization call produced no usable answer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("authorization service unavailable: {0}")]
    Transport(String),
    #[error("authorization service timed out")]
    Timeout,
    #[error("malformed authorization response: {0}")]
    MalformedResponse(String),
    #[error("authorization call cancelled")]
    Cancelled,
}

/// Everything the authorization service is told about a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckRequest {
    /// The value of the request's `x-request-id` header, if any.
    pub id: String,
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub protocol: String,
    /// Request headers that passed the configured matchers, in their original
    /// order, with repeated headers joined into one comma separated value.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// The value of `content-length`, or `-1` when unknown.
    pub size: i64,
    pub body: Option<RequestBody>,
    pub source: Peer,
    pub destination: Peer,
    pub context_extensions: BTreeMap<String, String>,
    pub metadata_context: DynamicMetadata,
    pub tls_session: Option<TlsSession>,
    pub time: Option<SystemTime>,
}

impl CheckRequest {
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Peer {
    pub address: Option<SocketAddr>,
    pub principal: String,
    /// Fingerprint of the peer's certificate, when requested and available.
    pub certificate: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestBody {
    pub data: Bytes,
    /// Whether `data` is only the beginning of the request's body.
    pub partial: bool,
    pub pack_as_bytes: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsSession {
    pub sni: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Denied,
}

/// The authorization service's answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: CheckStatus,
    /// The status to reply to the client with when denied.
    pub status_code: Option<StatusCode>,
    /// On OK these replace upstream request headers. On denial they are
    /// returned to the client.
    pub headers_to_set: Vec<(HeaderName, HeaderValue)>,
    pub headers_to_append: Vec<(HeaderName, HeaderValue)>,
    pub headers_to_remove: Vec<HeaderName>,
    pub dynamic_metadata: Struct,
    /// Returned to the client when denied.
    pub body: Bytes,
}

impl Response {
    pub fn ok() -> Self {
        Self::new(CheckStatus::Ok)
    }

    pub fn denied() -> Self {
        Self::new(CheckStatus::Denied)
    }

    fn new(status: CheckStatus) -> Self {
        Self {
            status,
            status_code: None,
            headers_to_set: Vec::new(),
            headers_to_append: Vec::new(),
            headers_to_remove: Vec::new(),
            dynamic_metadata: Struct::new(),
            body: Bytes::new(),
        }
    }
}

/// An authorization call in flight, bounded by a deadline fixed when it was
/// dispatched.
///
/// Dropping or [cancelling](PendingCheck::cancel) it aborts the remote call.
/// Once cancelled or completed it resolves to [`Error::Cancelled`], so a
/// decision is delivered at most once.
pub struct PendingCheck {
    inner: Option<BoxFuture<'static, CheckResult>>,
}

impl PendingCheck {
    pub fn dispatch(client: Arc<dyn Client>, request: CheckRequest, timeout: Duration) -> Self {
        let deadline = tokio::time::Instant::now() + timeout;
        let call = async move {
            tokio::time::timeout_at(deadline, client.check(request, timeout))
                .await
                .unwrap_or(Err(Error::Timeout))
        };

        Self {
            inner: Some(Box::pin(call)),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.is_some()
    }

    /// Aborts the call. Returns `false` when there was nothing left to
    /// cancel.
    pub fn cancel(&mut self) -> bool {
        self.inner.take().is_some()
    }
}

impl Future for PendingCheck {
    type Output = CheckResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(call) = self.inner.as_mut() else {
            return Poll::Ready(Err(Error::Cancelled));
        };

        let result = futures::ready!(call.as_mut().poll(cx));
        self.inner = None;
        Poll::Ready(result)
    }
}

impl std::fmt::Debug for PendingCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCheck")
            .field("pending", &self.is_pending())
            .finish()
    }
}
