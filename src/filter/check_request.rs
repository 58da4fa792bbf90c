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

use bytes::{BufMut, Bytes, BytesMut};
use http::{header, HeaderName, HeaderValue, Version};

use super::pipeline::StreamInfo;
use crate::{
    client::{CheckRequest, Peer, RequestBody, TlsSession},
    config::EffectiveConfig,
};

/// Tells the authorization service whether the body it received was cut
/// short at `max_request_bytes`.
pub const PARTIAL_BODY_HEADER: &str = "x-envoy-auth-partial-body";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// The request body collected before the check was sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferedBody {
    pub data: Bytes,
    pub partial: bool,
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "",
    }
}

/// Every value of `name`, joined with `,` into one value.
fn joined(headers: &http::HeaderMap, name: &HeaderName) -> Option<HeaderValue> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?;

    let mut rest = values.peekable();
    if rest.peek().is_none() {
        return Some(first.clone());
    }

    let mut buffer = BytesMut::from(first.as_bytes());
    for value in rest {
        buffer.put_u8(b',');
        buffer.put_slice(value.as_bytes());
    }

    HeaderValue::from_maybe_shared(buffer.freeze()).ok()
}

/// Assembles what the authorization service is told about a request.
pub fn build(
    config: &EffectiveConfig,
    request: &http::request::Parts,
    stream_info: &StreamInfo,
    body: Option<BufferedBody>,
) -> CheckRequest {
    let matchers = config.header_matchers();
    let mut headers: Vec<(HeaderName, HeaderValue)> = request
        .headers
        .keys()
        .filter(|name| matchers.includes(name.as_str()))
        .filter_map(|name| joined(&request.headers, name).map(|value| (name.clone(), value)))
        .collect();

    let body = body.map(|body| {
        headers.push((
            HeaderName::from_static(PARTIAL_BODY_HEADER),
            HeaderValue::from_static(if body.partial { "true" } else { "false" }),
        ));

        RequestBody {
            data: body.data,
            partial: body.partial,
            pack_as_bytes: config
                .with_request_body
                .as_ref()
                .map_or(false, |settings| settings.pack_as_bytes),
        }
    });

    let header_str = |name: &str| {
        request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    };

    let connection = &stream_info.connection;
    let peer_certificate = connection.peer_certificate.as_ref();

    CheckRequest {
        id: header_str(REQUEST_ID_HEADER).unwrap_or_default().to_owned(),
        method: request.method.as_str().to_owned(),
        scheme: request.uri.scheme_str().unwrap_or("http").to_owned(),
        host: request
            .uri
            .authority()
            .map(|authority| authority.as_str())
            .or_else(|| header_str(header::HOST.as_str()))
            .unwrap_or_default()
            .to_owned(),
        path: request
            .uri
            .path_and_query()
            .map_or("/", |path| path.as_str())
            .to_owned(),
        protocol: protocol(request.version).to_owned(),
        headers,
        size: header_str(header::CONTENT_LENGTH.as_str())
            .and_then(|length| length.parse().ok())
            .unwrap_or(-1),
        body,
        source: Peer {
            address: connection.remote_address,
            principal: peer_certificate
                .map(|certificate| certificate.principal.clone())
                .unwrap_or_default(),
            certificate: peer_certificate
                .filter(|_| config.include_peer_certificate)
                .map(|certificate| certificate.fingerprint.clone())
                .unwrap_or_default(),
        },
        destination: Peer {
            address: connection.local_address,
            principal: connection.local_principal.clone(),
            certificate: String::new(),
        },
        context_extensions: config.context_extensions.clone(),
        metadata_context: config
            .metadata_context_namespaces
            .iter()
            .filter_map(|namespace| {
                stream_info
                    .dynamic_metadata
                    .get(namespace)
                    .map(|fields| (namespace.clone(), fields.clone()))
            })
            .collect(),
        tls_session: connection
            .requested_server_name
            .as_ref()
            .filter(|_| config.include_tls_session)
            .map(|sni| TlsSession { sni: sni.clone() }),
        time: Some(stream_info.start_time),
    }
}
