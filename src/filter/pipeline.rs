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

//! The contract between a stream filter and the proxy's request pipeline.
//!
//! The pipeline owns the request and the connection. It hands each filter a
//! [`DecoderFilterCallbacks`] implementation as request data arrives, and a
//! filter that needs to wait for something pauses the request by returning a
//! `Stop*` status. The pipeline then polls
//! [`StreamDecoderFilter::poll_decision`] from the worker's event loop until
//! the filter either [continues](DecoderFilterCallbacks::continue_decoding)
//! or [replies locally](DecoderFilterCallbacks::send_local_reply). Other
//! requests on the same connection keep flowing in the meantime.

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::Arc,
    task::{Context, Poll},
    time::SystemTime,
};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::{config::PerRouteConfig, metadata::DynamicMetadata};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterHeadersStatus {
    /// Pass the headers on to the next filter.
    Continue,
    /// Hold the headers, letting body data reach this filter.
    StopIteration,
    /// Hold the headers and all further data, applying flow control to the
    /// downstream once buffers fill.
    StopAllIterationAndWatermark,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterDataStatus {
    Continue,
    /// Keep this data in the pipeline's buffer and deliver the next chunk.
    StopIterationAndBuffer,
    /// As above, applying flow control to the downstream.
    StopIterationAndWatermark,
    /// Drop this data, the stream is ending.
    StopIterationNoBuffer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterTrailersStatus {
    Continue,
    StopIteration,
}

/// Why a request did not complete normally, recorded for access logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseFlag {
    /// Denied by the external authorization service.
    UnauthorizedExternalService,
    /// Let through because the authorization service failed and the filter
    /// is configured to fail open.
    FailureModeAllowed,
}

/// A response synthesized by the proxy instead of the upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Short machine readable reason for access logs.
    pub details: &'static str,
}

/// The downstream connection a stream arrived on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_address: Option<SocketAddr>,
    pub local_address: Option<SocketAddr>,
    /// `None` when the connection isn't TLS, or the client sent no
    /// certificate.
    pub peer_certificate: Option<PeerCertificate>,
    pub local_principal: String,
    pub requested_server_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerCertificate {
    /// Hex encoded SHA-256 digest of the certificate.
    pub fingerprint: String,
    /// First URI SAN, falling back to the subject.
    pub principal: String,
}

/// Per-stream state shared between filters.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub connection: ConnectionInfo,
    pub dynamic_metadata: DynamicMetadata,
    pub response_flags: HashSet<ResponseFlag>,
    pub start_time: SystemTime,
}

impl StreamInfo {
    pub fn new(connection: ConnectionInfo) -> Self {
        Self {
            connection,
            dynamic_metadata: <_>::default(),
            response_flags: <_>::default(),
            start_time: SystemTime::now(),
        }
    }
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self::new(<_>::default())
    }
}

/// What the pipeline exposes to a filter about the stream it is processing.
pub trait DecoderFilterCallbacks {
    /// Method, URI, version, and headers of the request.
    fn request(&self) -> &http::request::Parts;
    /// The request's headers, mutable until they have been passed on.
    fn request_headers_mut(&mut self) -> &mut HeaderMap;
    fn stream_info(&self) -> &StreamInfo;
    fn stream_info_mut(&mut self) -> &mut StreamInfo;
    /// This filter's settings attached to the matched route hierarchy,
    /// ordered from least to most specific.
    fn per_route_configs(&self) -> Vec<Arc<PerRouteConfig>>;
    /// Resumes a request paused by a `Stop*` status.
    fn continue_decoding(&mut self);
    /// Ends the stream with a response that never reaches the upstream.
    fn send_local_reply(&mut self, reply: LocalReply);
    fn stream_id(&self) -> u64;
}

/// A filter processing the request half of one stream.
pub trait StreamDecoderFilter: Send {
    fn decode_headers(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        end_stream: bool,
    ) -> FilterHeadersStatus;

    fn decode_data(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        data: &Bytes,
        end_stream: bool,
    ) -> FilterDataStatus;

    fn decode_trailers(
        &mut self,
        callbacks: &mut dyn DecoderFilterCallbacks,
        trailers: &HeaderMap,
    ) -> FilterTrailersStatus;

    /// Drives whatever the filter paused the stream for. Returns
    /// [`Poll::Ready`] once the filter has nothing left to wait on.
    fn poll_decision(
        &mut self,
        cx: &mut Context<'_>,
        callbacks: &mut dyn DecoderFilterCallbacks,
    ) -> Poll<()>;

    /// The downstream reset the stream.
    fn on_stream_reset(&mut self);

    /// The stream is finished, for whatever reason. Called exactly once,
    /// before the filter is dropped.
    fn on_destroy(&mut self);
}
