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

//! Authorization over the `envoy.service.auth.v3.Authorization` gRPC API.

use std::{net::SocketAddr, time::Duration};

use http::{HeaderName, HeaderValue, StatusCode};
use tonic::{
    metadata::{AsciiMetadataKey, AsciiMetadataValue},
    transport::Channel,
};

use super::{CheckRequest, CheckResult, Error, Peer, Response};
use crate::{
    config::{ConfigError, GrpcService},
    generated::envoy::{
        config::core::v3 as envoy_core,
        service::auth::v3::{
            self as proto, attribute_context, authorization_client::AuthorizationClient,
            check_response::HttpResponse,
        },
    },
};

pub struct GrpcClient {
    channel: Channel,
    initial_metadata: Vec<(AsciiMetadataKey, AsciiMetadataValue)>,
}

impl GrpcClient {
    pub fn new(channel: Channel, service: &GrpcService) -> Result<Self, ConfigError> {
        const FIELD: &str = "grpc_service.initial_metadata";

        let initial_metadata = service
            .initial_metadata
            .iter()
            .map(|header| {
                let key = AsciiMetadataKey::from_bytes(header.key.as_bytes()).map_err(|_| {
                    ConfigError::InvalidHeaderName {
                        field: FIELD,
                        name: header.key.clone(),
                    }
                })?;
                let value = header
                    .value
                    .parse::<AsciiMetadataValue>()
                    .map_err(|_| ConfigError::InvalidHeaderValue {
                        field: FIELD,
                        name: header.key.clone(),
                    })?;
                Ok((key, value))
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self {
            channel,
            initial_metadata,
        })
    }
}

#[async_trait::async_trait]
impl super::Client for GrpcClient {
    async fn check(&self, request: CheckRequest, timeout: Duration) -> CheckResult {
        let mut grpc_request = tonic::Request::new(proto::CheckRequest::from(request));
        grpc_request.set_timeout(timeout);

        let metadata = grpc_request.metadata_mut();
        for (key, value) in &self.initial_metadata {
            metadata.insert(key.clone(), value.clone());
        }

        let mut client = AuthorizationClient::new(self.channel.clone());
        let response = client
            .check(grpc_request)
            .await
            .map_err(|status| match status.code() {
                tonic::Code::DeadlineExceeded => Error::Timeout,
                code => Error::Transport(format!("{code}: {}", status.message())),
            })?;

        Response::try_from(response.into_inner())
    }
}

fn address(address: SocketAddr) -> envoy_core::Address {
    envoy_core::Address {
        address: Some(envoy_core::address::Address::SocketAddress(envoy_core::SocketAddress {
            address: address.ip().to_string(),
            port_specifier: Some(envoy_core::socket_address::PortSpecifier::PortValue(
                address.port().into(),
            )),
            ..<_>::default()
        })),
    }
}

impl From<Peer> for attribute_context::Peer {
    fn from(peer: Peer) -> Self {
        Self {
            address: peer.address.map(address),
            principal: peer.principal,
            certificate: peer.certificate,
            ..<_>::default()
        }
    }
}

impl From<CheckRequest> for proto::CheckRequest {
    fn from(request: CheckRequest) -> Self {
        let (body, raw_body) = match request.body {
            Some(body) if body.pack_as_bytes => (String::new(), body.data.to_vec()),
            Some(body) => (String::from_utf8_lossy(&body.data).into_owned(), Vec::new()),
            None => <_>::default(),
        };

        let http = attribute_context::HttpRequest {
            id: request.id,
            method: request.method,
            headers: request
                .headers
                .into_iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            path: request.path,
            host: request.host,
            scheme: request.scheme,
            size: request.size,
            protocol: request.protocol,
            body,
            raw_body,
            ..<_>::default()
        };

        let metadata_context = (!request.metadata_context.is_empty()).then(|| envoy_core::Metadata {
            filter_metadata: request
                .metadata_context
                .into_iter()
                .map(|(namespace, fields)| (namespace, crate::prost::struct_from_map(fields)))
                .collect(),
        });

        Self {
            attributes: Some(proto::AttributeContext {
                source: Some(request.source.into()),
                destination: Some(request.destination.into()),
                request: Some(attribute_context::Request {
                    time: request.time.map(From::from),
                    http: Some(http),
                }),
                context_extensions: request.context_extensions.into_iter().collect(),
                metadata_context,
                tls_session: request
                    .tls_session
                    .map(|session| attribute_context::TlsSession { sni: session.sni }),
            }),
        }
    }
}

/// A header from the service, and whether it is appended rather than set.
/// Empty values are dropped unless the service asked to keep them.
fn header(option: envoy_core::HeaderValueOption) -> Result<Option<(HeaderName, HeaderValue, bool)>, Error> {
    let header = option
        .header
        .ok_or_else(|| Error::MalformedResponse("header option without a header".into()))?;

    let name = HeaderName::from_bytes(header.key.as_bytes())
        .map_err(|_| Error::MalformedResponse(format!("invalid header name `{}`", header.key)))?;
    let value = if header.raw_value.is_empty() {
        HeaderValue::from_str(&header.value)
    } else {
        HeaderValue::from_bytes(&header.raw_value)
    }
    .map_err(|_| Error::MalformedResponse(format!("invalid value for header `{name}`")))?;

    if value.is_empty() && !option.keep_empty_value {
        return Ok(None);
    }

    Ok(Some((name, value, option.append.unwrap_or(false))))
}

impl TryFrom<proto::CheckResponse> for Response {
    type Error = Error;

    fn try_from(message: proto::CheckResponse) -> Result<Self, Self::Error> {
        let code = message.status.as_ref().map_or(0, |status| status.code);
        let mut response = if code == tonic::Code::Ok as i32 {
            Response::ok()
        } else {
            Response::denied()
        };

        let mut options = Vec::new();
        let mut fallback_metadata = None;
        match message.http_response {
            Some(HttpResponse::OkResponse(ok)) if code == tonic::Code::Ok as i32 => {
                options = ok.headers;
                fallback_metadata = ok.dynamic_metadata;
                response.headers_to_remove = ok
                    .headers_to_remove
                    .into_iter()
                    .map(|name| {
                        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                            Error::MalformedResponse(format!("invalid header name `{name}`"))
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
            Some(HttpResponse::DeniedResponse(denied)) if code != tonic::Code::Ok as i32 => {
                options = denied.headers;
                response.status_code = denied
                    .status
                    .and_then(|status| u16::try_from(status.code).ok())
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .filter(|status| (200..600).contains(&status.as_u16()));
                response.body = denied.body.into();
            }
            _ => {}
        }

        for option in options {
            if let Some((name, value, append)) = header(option)? {
                if append {
                    response.headers_to_append.push((name, value));
                } else {
                    response.headers_to_set.push((name, value));
                }
            }
        }

        if let Some(metadata) = message.dynamic_metadata.or(fallback_metadata) {
            response.dynamic_metadata = crate::prost::map_from_struct(metadata);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::{CheckStatus, RequestBody, TlsSession},
        generated::{envoy::r#type::v3::HttpStatus, google::rpc::Status},
    };

    fn option(key: &str, value: &str, append: Option<bool>) -> envoy_core::HeaderValueOption {
        envoy_core::HeaderValueOption {
            header: Some(envoy_core::HeaderValue {
                key: key.into(),
                value: value.into(),
                ..<_>::default()
            }),
            append,
            ..<_>::default()
        }
    }

    #[test]
    fn request_conversion() {
        let request = CheckRequest {
            id: "req-1".into(),
            method: "GET".into(),
            path: "/orders".into(),
            headers: vec![(
                HeaderName::from_static("x-a"),
                HeaderValue::from_static("1,2"),
            )],
            size: -1,
            body: Some(RequestBody {
                data: "payload".into(),
                partial: false,
                pack_as_bytes: true,
            }),
            source: Peer {
                address: Some("10.0.0.1:4000".parse().unwrap()),
                certificate: "ab:cd".into(),
                ..<_>::default()
            },
            context_extensions: [("tenant".to_owned(), "acme".to_owned())].into(),
            tls_session: Some(TlsSession {
                sni: "shop.local".into(),
            }),
            time: Some(SystemTime::UNIX_EPOCH),
            ..<_>::default()
        };

        let attributes = proto::CheckRequest::from(request).attributes.unwrap();
        let http = attributes.request.as_ref().unwrap().http.as_ref().unwrap();
        assert_eq!("req-1", http.id);
        assert_eq!("1,2", http.headers["x-a"]);
        assert_eq!(b"payload".to_vec(), http.raw_body);
        assert!(http.body.is_empty());
        assert_eq!(-1, http.size);

        let source = attributes.source.unwrap();
        assert_eq!("ab:cd", source.certificate);
        assert_eq!(
            Some(address("10.0.0.1:4000".parse().unwrap())),
            source.address
        );
        assert_eq!("acme", attributes.context_extensions["tenant"]);
        assert_eq!("shop.local", attributes.tls_session.unwrap().sni);
        assert!(attributes.metadata_context.is_none());
    }

    #[test]
    fn ok_response() {
        let message = proto::CheckResponse {
            status: Some(Status::default()),
            http_response: Some(HttpResponse::OkResponse(proto::OkHttpResponse {
                headers: vec![
                    option("x-user-id", "alice", None),
                    option("x-tag", "blue", Some(true)),
                    option("x-empty", "", Some(false)),
                ],
                headers_to_remove: vec!["authorization".into()],
                dynamic_metadata: None,
            })),
            dynamic_metadata: Some(crate::prost::struct_from_map(
                [("user".to_owned(), serde_json::json!("alice"))]
                    .into_iter()
                    .collect(),
            )),
        };

        let response = Response::try_from(message).unwrap();
        assert_eq!(CheckStatus::Ok, response.status);
        assert_eq!(
            vec![(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_static("alice")
            )],
            response.headers_to_set
        );
        assert_eq!(
            vec![(HeaderName::from_static("x-tag"), HeaderValue::from_static("blue"))],
            response.headers_to_append
        );
        assert_eq!(vec![http::header::AUTHORIZATION], response.headers_to_remove);
        assert_eq!(serde_json::json!("alice"), response.dynamic_metadata["user"]);
    }

    #[test]
    fn missing_status_is_ok() {
        let response = Response::try_from(proto::CheckResponse::default()).unwrap();
        assert_eq!(Response::ok(), response);
    }

    #[test]
    fn denied_response() {
        let message = proto::CheckResponse {
            status: Some(Status {
                code: tonic::Code::PermissionDenied as i32,
                ..<_>::default()
            }),
            http_response: Some(HttpResponse::DeniedResponse(proto::DeniedHttpResponse {
                status: Some(HttpStatus { code: 401 }),
                headers: vec![option("www-authenticate", "Bearer", None)],
                body: "login required".into(),
            })),
            dynamic_metadata: None,
        };

        let response = Response::try_from(message).unwrap();
        assert_eq!(CheckStatus::Denied, response.status);
        assert_eq!(Some(StatusCode::UNAUTHORIZED), response.status_code);
        assert_eq!(bytes::Bytes::from("login required"), response.body);
        assert_eq!(1, response.headers_to_set.len());
    }

    #[test]
    fn denied_without_override() {
        let message = proto::CheckResponse {
            status: Some(Status {
                code: tonic::Code::PermissionDenied as i32,
                ..<_>::default()
            }),
            http_response: Some(HttpResponse::DeniedResponse(proto::DeniedHttpResponse {
                status: Some(HttpStatus { code: 0 }),
                ..<_>::default()
            })),
            dynamic_metadata: None,
        };

        let response = Response::try_from(message).unwrap();
        assert_eq!(None, response.status_code);

        for code in [0, 101, 600, 999, 70000] {
            let message = proto::CheckResponse {
                status: Some(Status {
                    code: tonic::Code::PermissionDenied as i32,
                    ..<_>::default()
                }),
                http_response: Some(HttpResponse::DeniedResponse(proto::DeniedHttpResponse {
                    status: Some(HttpStatus { code }),
                    ..<_>::default()
                })),
                dynamic_metadata: None,
            };

            let response = Response::try_from(message).unwrap();
            assert_eq!(None, response.status_code, "status override {code}");
        }

        let redirect = proto::CheckResponse {
            status: Some(Status {
                code: tonic::Code::Unauthenticated as i32,
                ..<_>::default()
            }),
            http_response: Some(HttpResponse::DeniedResponse(proto::DeniedHttpResponse {
                status: Some(HttpStatus { code: 302 }),
                headers: vec![option("location", "https://login.local/", None)],
                ..<_>::default()
            })),
            dynamic_metadata: None,
        };
        let response = Response::try_from(redirect).unwrap();
        assert_eq!(Some(StatusCode::FOUND), response.status_code);
    }

    #[test]
    fn malformed_headers() {
        let message = proto::CheckResponse {
            http_response: Some(HttpResponse::OkResponse(proto::OkHttpResponse {
                headers: vec![option("bad header", "1", None)],
                ..<_>::default()
            })),
            ..<_>::default()
        };

        assert!(matches!(
            Response::try_from(message),
            Err(Error::MalformedResponse(_))
        ));
    }
}
