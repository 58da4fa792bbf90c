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

/// Everything that can be wrong with a filter chain's authorization
/// configuration. These are only ever produced while the chain is being
/// constructed, never while requests are flowing.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("exactly one of `http_service` or `grpc_service` must be configured")]
    ServiceNotConfigured,
    #[error("only one of `http_service` or `grpc_service` may be configured")]
    MultipleServices,
    #[error("invalid authorization service uri `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("path_prefix `{0}` must be empty or begin with `/`")]
    InvalidPathPrefix(String),
    #[error("transport api version {0:?} is not supported, only V3 is")]
    UnsupportedApiVersion(super::ApiVersion),
    #[error("The use_alpha field is deprecated and is no longer supported.")]
    UseAlpha,
    #[error("`{field}` contains an invalid header name `{name}`")]
    InvalidHeaderName { field: &'static str, name: String },
    #[error("`{field}` contains an invalid value for header `{name}`")]
    InvalidHeaderValue { field: &'static str, name: String },
    #[error("`{0}` must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("`with_request_body.max_request_bytes` must be greater than zero")]
    ZeroMaxRequestBytes,
    #[error("failed to configure TLS for `{uri}`: {reason}")]
    Tls { uri: String, reason: String },
    #[error("gRPC authorization service `{0}` must be configured from within a Tokio runtime")]
    NoRuntime(String),
}
