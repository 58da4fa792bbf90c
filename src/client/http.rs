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

//! Authorization over plain HTTP: the request is replayed against the
//! authorization server, and any `2xx` answer allows it.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use hyper::body::HttpBody;

use super::{cache::HttpConnectionPool, CheckRequest, CheckResult, Error, Response};
use crate::config::{matcher, AuthorizationResponse, ConfigError, HttpService};

/// Framing headers describe the authorization server's own message, and are
/// never copied to or from it.
fn is_framing(name: &HeaderName) -> bool {
    *name == header::CONTENT_LENGTH
        || *name == header::TRANSFER_ENCODING
        || *name == header::CONNECTION
}

/// The most of a denial body relayed to the client. Anything past this is
/// dropped.
pub const MAX_DENIED_BODY_BYTES: usize = 64 * 1024;

/// Reads at most `limit` bytes of `body`, abandoning the rest.
async fn read_limited(mut body: hyper::Body, limit: usize) -> Result<Bytes, Error> {
    let mut buffer = BytesMut::new();
    while buffer.len() < limit {
        let Some(chunk) = body.data().await else {
            break;
        };
        let chunk = chunk.map_err(|error| Error::Transport(error.to_string()))?;
        let room = limit - buffer.len();
        buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    Ok(buffer.freeze())
}

pub struct HttpClient {
    pool: HttpConnectionPool,
    origin: String,
    path_prefix: String,
    headers_to_add: Vec<(HeaderName, HeaderValue)>,
    response: AuthorizationResponse,
}

impl HttpClient {
    pub fn new(pool: HttpConnectionPool, service: &HttpService) -> Result<Self, ConfigError> {
        let headers_to_add = service
            .authorization_request
            .headers_to_add
            .iter()
            .map(|header| header.parse("http_service.authorization_request.headers_to_add"))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            pool,
            origin: service.server_uri[..url::Position::BeforePath].to_owned(),
            path_prefix: service.path_prefix.clone(),
            headers_to_add,
            response: service.authorization_response.clone(),
        })
    }

    fn build_request(&self, request: &CheckRequest) -> Result<hyper::Request<hyper::Body>, Error> {
        let path = if request.path.is_empty() {
            "/"
        } else {
            &request.path
        };
        let method = if request.method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(request.method.as_bytes())
                .map_err(|error| Error::Transport(error.to_string()))?
        };
        let body = request
            .body
            .as_ref()
            .map(|body| body.data.clone())
            .unwrap_or_default();

        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(format!("{}{}{}", self.origin, self.path_prefix, path));

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in &request.headers {
                if !is_framing(name) {
                    headers.append(name.clone(), value.clone());
                }
            }

            for (name, value) in &self.headers_to_add {
                headers.insert(name.clone(), value.clone());
            }

            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        builder
            .body(hyper::Body::from(body))
            .map_err(|error| Error::Transport(error.to_string()))
    }

    fn allowed(&self, headers: &HeaderMap) -> Response {
        let mut response = Response::ok();

        for (name, value) in headers {
            if is_framing(name) {
                continue;
            }

            if matcher::any_match(&self.response.allowed_upstream_headers, name.as_str()) {
                response
                    .headers_to_set
                    .push((name.clone(), value.clone()));
            }

            if matcher::any_match(
                &self.response.allowed_upstream_headers_to_append,
                name.as_str(),
            ) {
                response
                    .headers_to_append
                    .push((name.clone(), value.clone()));
            }

            if matcher::any_match(&self.response.dynamic_metadata_from_headers, name.as_str()) {
                if let Ok(value) = value.to_str() {
                    response
                        .dynamic_metadata
                        .insert(name.as_str().to_owned(), value.into());
                }
            }
        }

        response
    }

    fn denied(&self, status: http::StatusCode, headers: &HeaderMap, body: Bytes) -> Response {
        let mut response = Response::denied();
        response.status_code = Some(status);
        response.body = body;

        let forwarded = headers.keys().filter(|name| !is_framing(name)).filter(|name| {
            self.response
                .allowed_client_headers
                .as_deref()
                .map_or(true, |allowed| matcher::any_match(allowed, name.as_str()))
        });

        // Repeated headers such as `set-cookie` keep every value.
        for name in forwarded {
            let mut values = headers.get_all(name).iter();
            if let Some(first) = values.next() {
                response.headers_to_set.push((name.clone(), first.clone()));
            }
            response
                .headers_to_append
                .extend(values.map(|value| (name.clone(), value.clone())));
        }

        response
    }

    async fn call(&self, request: &CheckRequest) -> CheckResult {
        let response = self
            .pool
            .request(self.build_request(request)?)
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;

        let (parts, body) = response.into_parts();
        if parts.status.is_success() {
            tracing::trace!(status = %parts.status, "authorization server allowed request");
            return Ok(self.allowed(&parts.headers));
        }

        let body = read_limited(body, MAX_DENIED_BODY_BYTES).await?;
        tracing::trace!(status = %parts.status, "authorization server denied request");
        Ok(self.denied(parts.status, &parts.headers, body))
    }
}

#[async_trait::async_trait]
impl super::Client for HttpClient {
    async fn check(&self, request: CheckRequest, timeout: Duration) -> CheckResult {
        tokio::time::timeout(timeout, self.call(&request))
            .await
            .unwrap_or(Err(Error::Timeout))
    }
}
