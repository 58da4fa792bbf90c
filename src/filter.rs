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

//! The per-request authorization filter and the factory a filter chain
//! creates it from.

pub mod check_request;
pub mod decision;
mod metrics;
pub mod pipeline;

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use tracing::{debug, warn};

use self::{
    check_request::BufferedBody,
    decision::Decision,
    metrics::Metrics,
    pipeline::{
        DecoderFilterCallbacks, FilterDataStatus, FilterHeadersStatus, FilterTrailersStatus,
        LocalReply, ResponseFlag, StreamDecoderFilter,
    },
};
use crate::{
    client::{
        AsyncClientCache, CacheKey, CheckResult, Client, ClientHandle, Error, GrpcClient,
        HttpClient, PendingCheck,
    },
    config::{Config, ConfigError, EffectiveConfig, Service},
    metadata,
};

/// Where a [`Filter`] is in deciding the fate of its request.
///
/// ```text
/// Idle ──┬──────────────────────────────────────────▶ Allowed (route disabled)
///        ├──▶ Buffering ──┐
///        └────────────────┴──▶ AwaitingDecision ──┬─▶ Allowed
///                                                 ├─▶ Denied
///                                                 └─▶ Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    /// Collecting the request body to send with the check.
    Buffering,
    AwaitingDecision,
    Allowed,
    Denied,
    /// The stream ended before a decision arrived.
    Cancelled,
}

/// Builds one [`Filter`] per stream for a filter chain, sharing the chain's
/// configuration and authorization client between them.
#[derive(Clone)]
pub struct FilterFactory {
    config: Arc<Config>,
    client: Arc<dyn Client>,
    metrics: Metrics,
}

impl FilterFactory {
    /// Validates `config` and connects it to its authorization service,
    /// reusing a transport from `cache` where one exists.
    pub fn new(config: Config, cache: &AsyncClientCache) -> Result<Self, ConfigError> {
        config.validate()?;

        let handle = cache.get_or_create(&CacheKey::for_config(&config)?)?;
        let client: Arc<dyn Client> = match (config.service()?, &*handle) {
            (Service::Http(service), ClientHandle::Http(pool)) => {
                Arc::new(HttpClient::new(pool.clone(), service)?)
            }
            (Service::Grpc(service), ClientHandle::Grpc(channel)) => {
                Arc::new(GrpcClient::new(channel.clone(), service)?)
            }
            _ => unreachable!("cache keys are partitioned by transport"),
        };

        Ok(Self::build(config, client))
    }

    /// As [`Self::new`], sharing transports through the process-wide
    /// [`AsyncClientCache::shared`].
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Self::new(config, &AsyncClientCache::shared())
    }

    /// As [`Self::new`], checking requests with `client` instead of the
    /// configured service.
    pub fn with_client(config: Config, client: Arc<dyn Client>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, client))
    }

    fn build(config: Config, client: Arc<dyn Client>) -> Self {
        Self {
            metrics: Metrics::new(&config.stat_prefix),
            config: Arc::new(config),
            client,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn create_filter(&self) -> Filter {
        Filter {
            config: self.config.clone(),
            client: self.client.clone(),
            metrics: self.metrics.clone(),
            state: State::Idle,
            effective: None,
            body: BytesMut::new(),
            pending: None,
        }
    }
}

/// Asks the authorization service about one request, holding the request
/// until it answers.
pub struct Filter {
    config: Arc<Config>,
    client: Arc<dyn Client>,
    metrics: Metrics,
    state: State,
    effective: Option<EffectiveConfig>,
    body: BytesMut,
    pending: Option<PendingCheck>,
}

impl Filter {
    pub fn state(&self) -> State {
        self.state
    }

    fn dispatch(&mut self, callbacks: &dyn DecoderFilterCallbacks, body: Option<BufferedBody>) {
        let Some(effective) = self.effective.as_ref() else {
            return;
        };

        let request = check_request::build(
            effective,
            callbacks.request(),
            callbacks.stream_info(),
            body,
        );
        let timeout = effective.timeout();

        debug!(
            stream = callbacks.stream_id(),
            ?timeout,
            "sending authorization check"
        );
        self.pending = Some(PendingCheck::dispatch(
            self.client.clone(),
            request,
            timeout,
        ));
        self.state = State::AwaitingDecision;
    }

    fn dispatch_buffered(&mut self, callbacks: &dyn DecoderFilterCallbacks, partial: bool) {
        let body = BufferedBody {
            data: self.body.split().freeze(),
            partial,
        };
        self.dispatch(callbacks, Some(body));
    }

    fn complete(&mut self, callbacks: &mut dyn DecoderFilterCallbacks, result: CheckResult) {
        let Some(effective) = self.effective.as_ref() else {
            return;
        };
        let stream = callbacks.stream_id();

        match &result {
            Err(Error::Cancelled) => return,
            Err(error) => {
                self.metrics.error.inc();
                warn!(stream, %error, "authorization check failed");
            }
            Ok(_) => {}
        }

        match decision::apply(effective, &result) {
            Decision::Allow(allow) => {
                let headers = callbacks.request_headers_mut();
                for mutation in &allow.header_mutations {
                    mutation.apply(headers);
                }

                let stream_info = callbacks.stream_info_mut();
                metadata::merge(
                    &mut stream_info.dynamic_metadata,
                    metadata::NAMESPACE,
                    allow.dynamic_metadata,
                );

                if allow.failure_mode_allowed {
                    stream_info
                        .response_flags
                        .insert(ResponseFlag::FailureModeAllowed);
                    self.metrics.failure_mode_allowed.inc();
                    warn!(stream, action = "Allow", "authorization failed open");
                } else {
                    self.metrics.ok.inc();
                    debug!(stream, action = "Allow", "request authorized");
                }

                self.state = State::Allowed;
                callbacks.continue_decoding();
            }
            Decision::Deny(deny) => {
                self.metrics.denied.inc();
                callbacks
                    .stream_info_mut()
                    .response_flags
                    .insert(ResponseFlag::UnauthorizedExternalService);
                debug!(stream, action = "Deny", status = %deny.status, "request denied");

                self.state = State::Denied;
                callbacks.send_local_reply(LocalReply {
                    status: deny.status,
                    headers: deny.headers,
                    body: deny.body,
                    details: if result.is_err() {
                        "ext_authz_error"
                    } else {
                        "ext_authz_denied"
                    },
                });
            }
        }
    }

    fn reject_too_large(&mut self, callbacks: &mut dyn DecoderFilterCallbacks) {
        debug!(
            stream = callbacks.stream_id(),
            action = "Deny",
            "request body exceeds max_request_bytes"
        );
        self.metrics.denied.inc();
        self.body.clear();
        self.state = State::Denied;
        callbacks.send_local_reply(LocalReply {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            details: "request_payload_too_large",
        });
    }

    /// Abandons any outstanding check. Safe to call any number of times, and
    /// after the request has been decided.
    fn cancel(&mut self) {
        let cancelled = self
            .pending
            .take()
            .map_or(false, |mut pending| pending.cancel());

        if matches!(self.state, State::AwaitingDecision | State::Buffering) {
            self.state = State::Cancelled;
            self.body.clear();
            if cancelled {
                self.metrics.cancelled.inc();
                debug!("authorization check cancelled");
            }
        }
    }
}

impl StreamDecoderFilter for Filter {
    fn decode_headers(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        end_stream: bool,
    ) -> FilterHeadersStatus {
        if self.state != State::Idle {
            return FilterHeadersStatus::Continue;
        }

        let effective = EffectiveConfig::resolve(self.config.clone(), &callbacks.per_route_configs());
        if effective.disabled {
            self.metrics.disabled.inc();
            debug!(
                stream = callbacks.stream_id(),
                action = "Allow",
                "authorization disabled for route"
            );
            self.state = State::Allowed;
            return FilterHeadersStatus::Continue;
        }

        let buffer = !end_stream && effective.request_body().is_some();
        self.effective = Some(effective);

        if buffer {
            self.state = State::Buffering;
            return FilterHeadersStatus::StopIteration;
        }

        self.dispatch(callbacks, None);
        FilterHeadersStatus::StopAllIterationAndWatermark
    }

    fn decode_data(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        data: &Bytes,
        end_stream: bool,
    ) -> FilterDataStatus {
        match self.state {
            State::Buffering => {}
            State::AwaitingDecision => return FilterDataStatus::StopIterationAndWatermark,
            State::Denied | State::Cancelled => return FilterDataStatus::StopIterationNoBuffer,
            State::Idle | State::Allowed => return FilterDataStatus::Continue,
        }

        let Some(settings) = self
            .effective
            .as_ref()
            .and_then(|effective| effective.request_body())
            .cloned()
        else {
            return FilterDataStatus::Continue;
        };

        let limit = settings.max_request_bytes as usize;
        let room = limit.saturating_sub(self.body.len());
        let overflow = data.len() > room;
        self.body.extend_from_slice(&data[..data.len().min(room)]);

        if !settings.allow_partial_message {
            if overflow {
                self.reject_too_large(callbacks);
                return FilterDataStatus::StopIterationNoBuffer;
            }

            if !end_stream {
                return FilterDataStatus::StopIterationAndBuffer;
            }
        }

        if end_stream || self.body.len() >= limit {
            self.dispatch_buffered(callbacks, !end_stream);
            return FilterDataStatus::StopIterationAndWatermark;
        }

        FilterDataStatus::StopIterationAndBuffer
    }

    fn decode_trailers(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        _trailers: &HeaderMap,
    ) -> FilterTrailersStatus {
        match self.state {
            State::Buffering => {
                self.dispatch_buffered(callbacks, false);
                FilterTrailersStatus::StopIteration
            }
            State::AwaitingDecision | State::Denied | State::Cancelled => {
                FilterTrailersStatus::StopIteration
            }
            State::Idle | State::Allowed => FilterTrailersStatus::Continue,
        }
    }

    fn poll_decision(
        &mut self,
        cx: &mut Context<'_>,
        callbacks: &mut dyn DecoderFilterCallbacks,
    ) -> Poll<()> {
        if self.state != State::AwaitingDecision {
            return Poll::Ready(());
        }

        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(());
        };

        let result = futures::ready!(Pin::new(pending).poll(cx));
        self.pending = None;
        self.complete(callbacks, result);
        Poll::Ready(())
    }

    fn on_stream_reset(&mut self) {
        self.cancel();
    }

    fn on_destroy(&mut self) {
        self.cancel();
    }
}

impl Drop for Filter {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        client::Response,
        config::{BodyConfig, HeaderToAdd, PerRouteConfig},
        test::{decide, NeverClient, RecordingCallbacks, StaticClient},
    };

    fn config() -> Config {
        Config::grpc("http://authz.local:9001".parse().unwrap())
    }

    fn factory(config: Config, client: Arc<dyn Client>) -> FilterFactory {
        FilterFactory::with_client(config, client).unwrap()
    }

    #[tokio::test]
    async fn disabled_route_skips_check() {
        let client = Arc::new(NeverClient::default());
        let mut filter = factory(config(), client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::get("/health").with_route(PerRouteConfig::disabled());

        assert_eq!(
            FilterHeadersStatus::Continue,
            filter.decode_headers(&mut callbacks, true)
        );
        assert_eq!(State::Allowed, filter.state());

        decide(&mut filter, &mut callbacks).await;
        assert_eq!(0, client.calls());
        assert_eq!(0, callbacks.continued);
        assert!(callbacks.local_replies.is_empty());
    }

    #[tokio::test]
    async fn allowed_request_is_mutated_and_resumed() {
        let mut response = Response::ok();
        response
            .headers_to_set
            .push(("x-user-id".parse().unwrap(), "alice".parse().unwrap()));
        response
            .headers_to_remove
            .push(http::header::AUTHORIZATION);
        response
            .dynamic_metadata
            .insert("user".into(), "alice".into());

        let mut config = config();
        config.headers_to_add = vec![HeaderToAdd::new("x-user-id", "anonymous")];
        let mut filter = factory(config, Arc::new(StaticClient::new(Ok(response)))).create_filter();
        let mut callbacks = RecordingCallbacks::new(
            http::Request::get("/orders")
                .header("authorization", "Bearer token")
                .body(())
                .unwrap(),
        );

        assert_eq!(
            FilterHeadersStatus::StopAllIterationAndWatermark,
            filter.decode_headers(&mut callbacks, true)
        );
        assert_eq!(State::AwaitingDecision, filter.state());

        decide(&mut filter, &mut callbacks).await;
        assert_eq!(State::Allowed, filter.state());
        assert_eq!(1, callbacks.continued);
        assert_eq!("alice", callbacks.request.headers["x-user-id"]);
        assert!(!callbacks.request.headers.contains_key("authorization"));
        assert_eq!(
            serde_json::json!("alice"),
            callbacks.stream_info.dynamic_metadata[metadata::NAMESPACE]["user"]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn denied_request_gets_local_reply() {
        let mut response = Response::denied();
        response.status_code = Some(StatusCode::UNAUTHORIZED);
        response.body = "login required".into();

        let mut filter =
            factory(config(), Arc::new(StaticClient::new(Ok(response)))).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");

        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;

        assert_eq!(State::Denied, filter.state());
        assert_eq!(0, callbacks.continued);
        assert_eq!(1, callbacks.local_replies.len());
        assert_eq!(StatusCode::UNAUTHORIZED, callbacks.local_replies[0].status);
        assert_eq!(Bytes::from("login required"), callbacks.local_replies[0].body);
        assert!(callbacks
            .stream_info
            .response_flags
            .contains(&ResponseFlag::UnauthorizedExternalService));
        assert!(logs_contain("Deny"));
    }

    #[tokio::test]
    async fn denied_without_status_is_forbidden() {
        let mut filter =
            factory(config(), Arc::new(StaticClient::new(Ok(Response::denied())))).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");

        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;

        assert_eq!(StatusCode::FORBIDDEN, callbacks.local_replies[0].status);
    }

    #[tokio::test]
    async fn failure_mode() {
        let error = || Arc::new(StaticClient::new(Err(Error::Transport("refused".into()))));

        let mut filter = factory(config(), error()).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");
        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;
        assert_eq!(State::Denied, filter.state());
        assert_eq!(StatusCode::FORBIDDEN, callbacks.local_replies[0].status);
        assert_eq!("ext_authz_error", callbacks.local_replies[0].details);

        let mut config = config();
        config.failure_mode_allow = true;
        config.failure_mode_allow_header_add = true;
        let mut filter = factory(config, error()).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");
        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;
        assert_eq!(State::Allowed, filter.state());
        assert_eq!(1, callbacks.continued);
        assert!(callbacks.local_replies.is_empty());
        assert_eq!(
            "true",
            callbacks.request.headers[decision::FAILURE_MODE_ALLOWED_HEADER]
        );
        assert!(callbacks
            .stream_info
            .response_flags
            .contains(&ResponseFlag::FailureModeAllowed));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_takes_failure_path() {
        let mut config = config();
        config.timeout = Duration::from_millis(10);
        config.failure_mode_allow = true;

        let client = Arc::new(NeverClient::default());
        let mut filter = factory(config, client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");

        let started = tokio::time::Instant::now();
        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;

        assert_eq!(Duration::from_millis(10), started.elapsed());
        assert_eq!(State::Allowed, filter.state());
        assert_eq!(1, client.calls());
    }

    #[tokio::test]
    async fn reset_cancels_outstanding_check() {
        let mut filter = factory(config(), Arc::new(NeverClient::default())).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");

        filter.decode_headers(&mut callbacks, true);
        filter.on_stream_reset();
        assert_eq!(State::Cancelled, filter.state());

        filter.on_stream_reset();
        filter.on_destroy();
        decide(&mut filter, &mut callbacks).await;

        assert_eq!(State::Cancelled, filter.state());
        assert_eq!(0, callbacks.continued);
        assert!(callbacks.local_replies.is_empty());
        assert_eq!(
            FilterDataStatus::StopIterationNoBuffer,
            filter.decode_data(&mut callbacks, &Bytes::from("late"), true)
        );
    }

    #[tokio::test]
    async fn destroy_after_decision_is_a_no_op() {
        let mut filter =
            factory(config(), Arc::new(StaticClient::new(Ok(Response::ok())))).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders");

        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;
        filter.on_destroy();

        assert_eq!(State::Allowed, filter.state());
        assert_eq!(1, callbacks.continued);
    }

    #[tokio::test]
    async fn route_context_extensions_reach_service() {
        let mut config = config();
        config.context_extensions = [("tenant", "default"), ("zone", "eu")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        let client = Arc::new(StaticClient::new(Ok(Response::ok())));
        let mut filter = factory(config, client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::get("/orders")
            .with_route(PerRouteConfig::with_context_extensions([("tenant", "acme")]));

        filter.decode_headers(&mut callbacks, true);
        decide(&mut filter, &mut callbacks).await;

        let requests = client.requests();
        assert_eq!("acme", requests[0].context_extensions["tenant"]);
        assert_eq!("eu", requests[0].context_extensions["zone"]);
    }

    #[tokio::test]
    async fn body_is_buffered_up_to_limit() {
        let mut config = config();
        config.with_request_body = Some(BodyConfig::new(8));

        let client = Arc::new(StaticClient::new(Ok(Response::ok())));
        let mut filter = factory(config, client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::new(
            http::Request::post("/upload").body(()).unwrap(),
        );

        assert_eq!(
            FilterHeadersStatus::StopIteration,
            filter.decode_headers(&mut callbacks, false)
        );
        assert_eq!(State::Buffering, filter.state());
        assert_eq!(
            FilterDataStatus::StopIterationAndBuffer,
            filter.decode_data(&mut callbacks, &Bytes::from("hello"), false)
        );
        assert_eq!(
            FilterDataStatus::StopIterationAndWatermark,
            filter.decode_data(&mut callbacks, &Bytes::from(" world"), false)
        );
        assert_eq!(State::AwaitingDecision, filter.state());
        assert_eq!(
            FilterDataStatus::StopIterationAndWatermark,
            filter.decode_data(&mut callbacks, &Bytes::from("!"), true)
        );

        decide(&mut filter, &mut callbacks).await;
        assert_eq!(State::Allowed, filter.state());

        let requests = client.requests();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(Bytes::from("hello wo"), body.data);
        assert!(body.partial);
        assert_eq!(
            Some(&http::HeaderValue::from_static("true")),
            requests[0].header(check_request::PARTIAL_BODY_HEADER)
        );
    }

    #[tokio::test]
    async fn trailers_end_buffering() {
        let mut config = config();
        config.with_request_body = Some(BodyConfig::new(1024));

        let client = Arc::new(StaticClient::new(Ok(Response::ok())));
        let mut filter = factory(config, client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::new(
            http::Request::post("/upload").body(()).unwrap(),
        );

        filter.decode_headers(&mut callbacks, false);
        filter.decode_data(&mut callbacks, &Bytes::from("small"), false);
        assert_eq!(State::Buffering, filter.state());
        assert_eq!(
            FilterTrailersStatus::StopIteration,
            filter.decode_trailers(&mut callbacks, &HeaderMap::new())
        );
        decide(&mut filter, &mut callbacks).await;

        let body = client.requests()[0].body.clone().unwrap();
        assert_eq!(Bytes::from("small"), body.data);
        assert!(!body.partial);
    }

    #[tokio::test]
    async fn oversized_body_rejected_without_partial_messages() {
        let mut config = config();
        config.stat_prefix = "oversized_body_rejected".into();
        config.with_request_body = Some(BodyConfig {
            allow_partial_message: false,
            ..BodyConfig::new(4)
        });

        let client = Arc::new(StaticClient::new(Ok(Response::ok())));
        let mut filter = factory(config, client.clone()).create_filter();
        let mut callbacks = RecordingCallbacks::new(
            http::Request::post("/upload").body(()).unwrap(),
        );

        filter.decode_headers(&mut callbacks, false);
        assert_eq!(
            FilterDataStatus::StopIterationAndBuffer,
            filter.decode_data(&mut callbacks, &Bytes::from("1234"), false)
        );
        assert_eq!(
            FilterDataStatus::StopIterationNoBuffer,
            filter.decode_data(&mut callbacks, &Bytes::from("5"), false)
        );

        assert_eq!(State::Denied, filter.state());
        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, callbacks.local_replies[0].status);
        assert_eq!(0, client.calls());
        assert_eq!(1, filter.metrics.denied.get());
    }

    #[tokio::test]
    async fn route_can_disable_body_buffering() {
        let mut config = config();
        config.with_request_body = Some(BodyConfig::new(1024));

        let client = Arc::new(StaticClient::new(Ok(Response::ok())));
        let mut filter = factory(config, client.clone()).create_filter();
        let mut route = PerRouteConfig::default();
        route.check_settings.disable_request_body_buffering = Some(true);
        let mut callbacks =
            RecordingCallbacks::new(http::Request::post("/upload").body(()).unwrap())
                .with_route(route);

        assert_eq!(
            FilterHeadersStatus::StopAllIterationAndWatermark,
            filter.decode_headers(&mut callbacks, false)
        );
        decide(&mut filter, &mut callbacks).await;
        assert_eq!(None, client.requests()[0].body);
    }

    #[tokio::test]
    async fn factory_validates_config() {
        let mut config = config();
        config.use_alpha = true;

        assert_eq!(
            Some(ConfigError::UseAlpha),
            FilterFactory::with_client(config.clone(), Arc::new(NeverClient::default())).err()
        );
        assert_eq!(
            Some(ConfigError::UseAlpha),
            FilterFactory::new(config, &AsyncClientCache::new()).err()
        );
    }

    #[tokio::test]
    async fn factories_share_cached_transport() {
        let cache = AsyncClientCache::new();
        let first = FilterFactory::new(config(), &cache).unwrap();
        let second = FilterFactory::new(config(), &cache).unwrap();
        FilterFactory::new(
            Config::http("http://authz.local:9000".parse().unwrap()),
            &cache,
        )
        .unwrap();

        assert_eq!(2, cache.constructed());
        assert_eq!(first.config(), second.config());
        assert_eq!(State::Idle, first.create_filter().state());
    }

    #[test]
    fn grpc_chain_outside_runtime_is_rejected() {
        assert!(matches!(
            FilterFactory::new(config(), &AsyncClientCache::new()),
            Err(ConfigError::NoRuntime(_))
        ));
    }

    #[test]
    fn from_config_uses_shared_cache() {
        let config = Config::http("http://from-config.authz.local:9000".parse().unwrap());
        let key = CacheKey::for_config(&config).unwrap();
        FilterFactory::from_config(config).unwrap();

        AsyncClientCache::shared()
            .get_or_create_with(&key, |_| panic!("handle should already be cached"))
            .unwrap();
    }
}
