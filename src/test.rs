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

//! Common utilities for testing
use std::{
    convert::Infallible,
    net::{Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Once,
    },
    time::Duration,
};

use http::HeaderMap;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::{
    client::{CheckRequest, CheckResult, Client},
    config::PerRouteConfig,
    filter::pipeline::{
        DecoderFilterCallbacks, LocalReply, StreamDecoderFilter, StreamInfo,
    },
    generated::envoy::service::auth::v3::authorization_server::{
        Authorization, AuthorizationServer,
    },
};

static LOG_ONCE: Once = Once::new();

/// Call to safely enable logging calls with a given tracing env filter, e.g. "ext_authz=debug"
/// This can be very useful when attempting to debug unit and integration tests.
pub fn enable_log(filter: impl Into<EnvFilter>) {
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init()
    });
}

/// A [`DecoderFilterCallbacks`] that records what the filter asked of it.
pub struct RecordingCallbacks {
    pub request: http::request::Parts,
    pub stream_info: StreamInfo,
    pub routes: Vec<Arc<PerRouteConfig>>,
    /// How many times decoding was resumed.
    pub continued: usize,
    pub local_replies: Vec<LocalReply>,
    pub stream_id: u64,
}

impl RecordingCallbacks {
    pub fn new(request: http::Request<()>) -> Self {
        Self {
            request: request.into_parts().0,
            stream_info: StreamInfo::default(),
            routes: Vec::new(),
            continued: 0,
            local_replies: Vec::new(),
            stream_id: 1,
        }
    }

    /// A `GET` of `path` on `shop.local`.
    pub fn get(path: &str) -> Self {
        Self::new(
            http::Request::get(path)
                .header(http::header::HOST, "shop.local")
                .body(())
                .unwrap(),
        )
    }

    /// Attaches `route` as the most specific level of the route hierarchy.
    pub fn with_route(mut self, route: PerRouteConfig) -> Self {
        self.routes.push(Arc::new(route));
        self
    }
}

impl DecoderFilterCallbacks for RecordingCallbacks {
    fn request(&self) -> &http::request::Parts {
        &self.request
    }

    fn request_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.request.headers
    }

    fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    fn stream_info_mut(&mut self) -> &mut StreamInfo {
        &mut self.stream_info
    }

    fn per_route_configs(&self) -> Vec<Arc<PerRouteConfig>> {
        self.routes.clone()
    }

    fn continue_decoding(&mut self) {
        self.continued += 1;
    }

    fn send_local_reply(&mut self, reply: LocalReply) {
        self.local_replies.push(reply);
    }

    fn stream_id(&self) -> u64 {
        self.stream_id
    }
}

/// Drives `filter` until it has nothing left to wait on.
pub async fn decide<F: StreamDecoderFilter>(filter: &mut F, callbacks: &mut RecordingCallbacks) {
    futures::future::poll_fn(|cx| filter.poll_decision(cx, callbacks)).await
}

/// Answers every check with the same result, remembering the requests.
pub struct StaticClient {
    result: CheckResult,
    requests: Mutex<Vec<CheckRequest>>,
}

impl StaticClient {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            requests: <_>::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CheckRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl Client for StaticClient {
    async fn check(&self, request: CheckRequest, _: Duration) -> CheckResult {
        self.requests.lock().push(request);
        self.result.clone()
    }
}

/// Never answers, leaving the caller's deadline to expire.
#[derive(Default)]
pub struct NeverClient {
    calls: AtomicUsize,
}

impl NeverClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Client for NeverClient {
    async fn check(&self, _: CheckRequest, _: Duration) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }
}

/// Serves `handler` over HTTP on an ephemeral local port, returning the
/// server's address. The server runs until the test's runtime shuts down.
pub async fn spawn_http_authz_server<F>(handler: F) -> SocketAddr
where
    F: Fn(hyper::Request<hyper::Body>) -> hyper::Response<hyper::Body> + Clone + Send + Sync + 'static,
{
    let make_service = hyper::service::make_service_fn(move |_| {
        let handler = handler.clone();
        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |request| {
                let response = handler(request);
                async move { Ok::<_, Infallible>(response) }
            }))
        }
    });

    let server = hyper::Server::bind(&(Ipv4Addr::LOCALHOST, 0).into()).serve(make_service);
    let addr = server.local_addr();
    tokio::spawn(async move {
        if let Err(error) = server.await {
            tracing::error!(%error, "test authorization server failed");
        }
    });

    tracing::debug!(%addr, "test::spawn_http_authz_server");
    addr
}

/// Serves `service` as an `envoy.service.auth.v3.Authorization` gRPC server
/// on an ephemeral local port, returning the server's address.
pub async fn spawn_grpc_authz_server<A: Authorization>(service: A) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let result = tonic::transport::Server::builder()
            .add_service(AuthorizationServer::new(service))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await;

        if let Err(error) = result {
            tracing::error!(%error, "test authorization server failed");
        }
    });

    tracing::debug!(%addr, "test::spawn_grpc_authz_server");
    addr
}
