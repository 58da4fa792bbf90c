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

//! Chain-wide configuration of the authorization filter.

mod error;
pub mod matcher;
pub mod route;

use std::{collections::BTreeMap, time::Duration};

use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

pub use self::{
    error::ConfigError,
    matcher::{HeaderMatchers, StringMatcher},
    route::{CheckSettings, EffectiveConfig, PerRouteConfig},
};

/// The timeout applied to authorization calls when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_true() -> bool {
    true
}

/// Settings shared by every request passing through one filter chain.
///
/// ```yaml
/// http_service:
///   server_uri: http://authz.default.svc:9000
///   path_prefix: /check
/// timeout: 250ms
/// failure_mode_allow: false
/// allowed_headers:
///   - exact: authorization
///   - prefix: x-
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Authorization service reached over plain HTTP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_service: Option<HttpService>,
    /// Authorization service reached over the `Authorization/Check` gRPC API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_service: Option<GrpcService>,
    /// How long to wait for a decision before treating the call as failed.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub timeout: Duration,
    /// Let requests through when the authorization service can't be reached.
    #[serde(default)]
    pub failure_mode_allow: bool,
    /// Mark requests let through by `failure_mode_allow` with
    /// `x-envoy-auth-failure-mode-allowed: true`.
    #[serde(default)]
    pub failure_mode_allow_header_add: bool,
    #[serde(default)]
    pub include_peer_certificate: bool,
    #[serde(default)]
    pub include_tls_session: bool,
    /// Headers added to the upstream request when it is allowed.
    #[serde(default)]
    pub headers_to_add: Vec<HeaderToAdd>,
    /// Request headers forwarded to the authorization service. Every header
    /// is forwarded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<StringMatcher>>,
    /// Request headers never forwarded to the authorization service.
    #[serde(default)]
    pub disallowed_headers: Vec<StringMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_request_body: Option<BodyConfig>,
    /// Dynamic metadata namespaces sent to the authorization service.
    #[serde(default)]
    pub metadata_context_namespaces: Vec<String>,
    #[serde(default)]
    pub context_extensions: BTreeMap<String, String>,
    #[serde(default)]
    pub transport_api_version: ApiVersion,
    #[serde(default)]
    pub use_alpha: bool,
    #[serde(default)]
    pub stat_prefix: String,
}

impl Config {
    fn with_service(http_service: Option<HttpService>, grpc_service: Option<GrpcService>) -> Self {
        Self {
            http_service,
            grpc_service,
            timeout: DEFAULT_TIMEOUT,
            failure_mode_allow: false,
            failure_mode_allow_header_add: false,
            include_peer_certificate: false,
            include_tls_session: false,
            headers_to_add: Vec::new(),
            allowed_headers: None,
            disallowed_headers: Vec::new(),
            with_request_body: None,
            metadata_context_namespaces: Vec::new(),
            context_extensions: BTreeMap::new(),
            transport_api_version: ApiVersion::V3,
            use_alpha: false,
            stat_prefix: String::new(),
        }
    }

    /// A configuration with default settings that checks requests against the
    /// HTTP authorization server at `server_uri`.
    pub fn http(server_uri: Url) -> Self {
        Self::with_service(Some(HttpService::new(server_uri)), None)
    }

    /// A configuration with default settings that checks requests against the
    /// gRPC authorization server at `target_uri`.
    pub fn grpc(target_uri: Url) -> Self {
        Self::with_service(None, Some(GrpcService::new(target_uri)))
    }

    pub fn service(&self) -> Result<Service<'_>, ConfigError> {
        match (&self.http_service, &self.grpc_service) {
            (Some(http), None) => Ok(Service::Http(http)),
            (None, Some(grpc)) => Ok(Service::Grpc(grpc)),
            (Some(_), Some(_)) => Err(ConfigError::MultipleServices),
            (None, None) => Err(ConfigError::ServiceNotConfigured),
        }
    }

    /// The deadline for one authorization call. A timeout set on the service
    /// takes precedence over the chain-wide one.
    pub fn timeout(&self) -> Duration {
        let service_timeout = match self.service() {
            Ok(Service::Http(http)) => http.timeout,
            Ok(Service::Grpc(grpc)) => grpc.timeout,
            Err(_) => None,
        };

        service_timeout.unwrap_or(self.timeout)
    }

    pub fn header_matchers(&self) -> HeaderMatchers<'_> {
        HeaderMatchers {
            allowed: self.allowed_headers.as_deref(),
            disallowed: &self.disallowed_headers,
        }
    }

    /// Checks everything that would otherwise only fail once requests are
    /// flowing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_alpha {
            return Err(ConfigError::UseAlpha);
        }

        if self.transport_api_version != ApiVersion::V3 {
            return Err(ConfigError::UnsupportedApiVersion(self.transport_api_version));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("timeout"));
        }

        match self.service()? {
            Service::Http(http) => http.validate()?,
            Service::Grpc(grpc) => grpc.validate()?,
        }

        for header in &self.headers_to_add {
            header.parse("headers_to_add")?;
        }

        if let Some(body) = &self.with_request_body {
            if body.max_request_bytes == 0 {
                return Err(ConfigError::ZeroMaxRequestBytes);
            }
        }

        Ok(())
    }
}

/// Which authorization backend a [`Config`] points at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Service<'a> {
    Http(&'a HttpService),
    Grpc(&'a GrpcService),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ApiVersion {
    V2,
    #[default]
    V3,
}

/// A header name and value, either appended to or replacing existing values.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HeaderToAdd {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub append: bool,
}

impl HeaderToAdd {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            append: false,
        }
    }

    pub fn parse(&self, field: &'static str) -> Result<(HeaderName, HeaderValue), ConfigError> {
        let name =
            HeaderName::from_bytes(self.key.as_bytes()).map_err(|_| ConfigError::InvalidHeaderName {
                field,
                name: self.key.clone(),
            })?;
        let value =
            HeaderValue::from_str(&self.value).map_err(|_| ConfigError::InvalidHeaderValue {
                field,
                name: self.key.clone(),
            })?;

        Ok((name, value))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    /// The most body bytes sent to the authorization service.
    pub max_request_bytes: u32,
    /// When `false`, requests whose body exceeds `max_request_bytes` are
    /// rejected with `413 Payload Too Large` instead of being sent truncated.
    #[serde(default = "default_true")]
    pub allow_partial_message: bool,
    /// Send the body as raw bytes rather than as a UTF-8 string.
    #[serde(default)]
    pub pack_as_bytes: bool,
}

impl BodyConfig {
    pub fn new(max_request_bytes: u32) -> Self {
        Self {
            max_request_bytes,
            allow_partial_message: true,
            pack_as_bytes: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HttpService {
    pub server_uri: Url,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub timeout: Option<Duration>,
    /// Prepended to the original request path when calling the service.
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub authorization_request: AuthorizationRequest,
    #[serde(default)]
    pub authorization_response: AuthorizationResponse,
}

impl HttpService {
    pub fn new(server_uri: Url) -> Self {
        Self {
            server_uri,
            timeout: None,
            path_prefix: String::new(),
            authorization_request: <_>::default(),
            authorization_response: <_>::default(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_uri(&self.server_uri)?;

        if !self.path_prefix.is_empty() && !self.path_prefix.starts_with('/') {
            return Err(ConfigError::InvalidPathPrefix(self.path_prefix.clone()));
        }

        if self.timeout.map_or(false, |timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTimeout("http_service.timeout"));
        }

        for header in &self.authorization_request.headers_to_add {
            header.parse("http_service.authorization_request.headers_to_add")?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationRequest {
    /// Headers added to every request sent to the authorization service.
    #[serde(default)]
    pub headers_to_add: Vec<HeaderToAdd>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationResponse {
    /// Service response headers that replace upstream request headers on OK.
    #[serde(default)]
    pub allowed_upstream_headers: Vec<StringMatcher>,
    /// Service response headers appended to upstream request headers on OK.
    #[serde(default)]
    pub allowed_upstream_headers_to_append: Vec<StringMatcher>,
    /// Service response headers returned to the client on denial. Every
    /// header is returned when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_client_headers: Option<Vec<StringMatcher>>,
    /// Service response headers copied into dynamic metadata on OK.
    #[serde(default)]
    pub dynamic_metadata_from_headers: Vec<StringMatcher>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GrpcService {
    pub target_uri: Url,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub timeout: Option<Duration>,
    /// Sent as request metadata on every call.
    #[serde(default)]
    pub initial_metadata: Vec<HeaderToAdd>,
}

impl GrpcService {
    pub fn new(target_uri: Url) -> Self {
        Self {
            target_uri,
            timeout: None,
            initial_metadata: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_uri(&self.target_uri)?;

        if self.timeout.map_or(false, |timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTimeout("grpc_service.timeout"));
        }

        for header in &self.initial_metadata {
            header.parse("grpc_service.initial_metadata")?;
        }

        Ok(())
    }
}

fn validate_uri(uri: &Url) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.into(),
    };

    if !matches!(uri.scheme(), "http" | "https") {
        return Err(invalid("scheme must be `http` or `https`"));
    }

    if uri.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    uri.as_str()
        .parse::<http::Uri>()
        .map(drop)
        .map_err(|error| invalid(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn deserialize_http() {
        let yaml = "
http_service:
  server_uri: http://authz.local:9000
  path_prefix: /check
  authorization_request:
    headers_to_add:
      - key: x-authz-client
        value: edge
  authorization_response:
    allowed_upstream_headers:
      - exact: x-user-id
timeout: 250ms
failure_mode_allow: true
headers_to_add:
  - key: x-checked
    value: 'yes'
allowed_headers:
  - prefix: x-
with_request_body:
  max_request_bytes: 4096
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let Service::Http(http) = config.service().unwrap() else {
            panic!("expected an http service");
        };
        assert_eq!("/check", http.path_prefix);
        assert_eq!(
            vec![HeaderToAdd::new("x-authz-client", "edge")],
            http.authorization_request.headers_to_add
        );
        assert_eq!(Duration::from_millis(250), config.timeout());
        assert!(config.failure_mode_allow);
        assert_eq!(
            Some(BodyConfig {
                max_request_bytes: 4096,
                allow_partial_message: true,
                pack_as_bytes: false,
            }),
            config.with_request_body
        );
    }

    #[test]
    fn deserialize_grpc_defaults() {
        let yaml = "
grpc_service:
  target_uri: http://authz.local:9001
  timeout: 1s
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(DEFAULT_TIMEOUT, config.timeout);
        assert_eq!(Duration::from_secs(1), config.timeout());
        assert!(!config.failure_mode_allow);
        assert_eq!(ApiVersion::V3, config.transport_api_version);
        assert!(matches!(config.service(), Ok(Service::Grpc(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "
grpc_service:
  target_uri: http://authz.local:9001
fail_open: true
";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn service_must_be_configured_once() {
        let mut config = Config::http("http://authz.local".parse().unwrap());
        config.grpc_service = Some(GrpcService::new("http://authz.local".parse().unwrap()));
        assert_eq!(Err(ConfigError::MultipleServices), config.validate());

        config.http_service = None;
        config.grpc_service = None;
        assert_eq!(Err(ConfigError::ServiceNotConfigured), config.validate());
    }

    #[test]
    fn invalid_configs() {
        let base = Config::http("http://authz.local".parse().unwrap());

        let mut config = base.clone();
        config.use_alpha = true;
        assert_eq!(
            "The use_alpha field is deprecated and is no longer supported.",
            config.validate().unwrap_err().to_string()
        );

        let mut config = base.clone();
        config.transport_api_version = ApiVersion::V2;
        assert_eq!(
            Err(ConfigError::UnsupportedApiVersion(ApiVersion::V2)),
            config.validate()
        );

        let mut config = base.clone();
        config.http_service.as_mut().unwrap().path_prefix = "check".into();
        assert_eq!(
            Err(ConfigError::InvalidPathPrefix("check".into())),
            config.validate()
        );

        let mut config = base.clone();
        config.headers_to_add.push(HeaderToAdd::new("bad header", "1"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeaderName { field: "headers_to_add", .. })
        ));

        let mut config = base.clone();
        config.timeout = Duration::ZERO;
        assert_eq!(Err(ConfigError::ZeroTimeout("timeout")), config.validate());

        let mut config = base.clone();
        config.with_request_body = Some(BodyConfig::new(0));
        assert_eq!(Err(ConfigError::ZeroMaxRequestBytes), config.validate());

        let config = Config::grpc("unix:/var/run/authz.sock".parse().unwrap());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUri { .. })
        ));
    }

    #[test]
    fn schema() {
        let schema = schemars::schema_for!(Config);
        let schema = serde_json::to_value(schema).unwrap();
        assert!(schema["properties"]["http_service"].is_object());
        assert!(schema["properties"]["timeout"].is_object());
    }
}
