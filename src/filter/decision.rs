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

//! Translation of an authorization outcome into what should happen to the
//! request. Nothing here touches the live request; [`super::Filter`] applies
//! the [`Decision`].

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::{
    client::{CheckResult, CheckStatus, Response},
    config::EffectiveConfig,
    metadata::Struct,
};

/// Added to upstream requests let through because the authorization service
/// failed, when `failure_mode_allow_header_add` is set.
pub const FAILURE_MODE_ALLOWED_HEADER: &str = "x-envoy-auth-failure-mode-allowed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderMutation {
    Set(HeaderName, HeaderValue),
    Append(HeaderName, HeaderValue),
    Remove(HeaderName),
}

impl HeaderMutation {
    pub fn apply(&self, headers: &mut HeaderMap) {
        match self {
            Self::Set(name, value) => {
                headers.insert(name.clone(), value.clone());
            }
            Self::Append(name, value) => {
                headers.append(name.clone(), value.clone());
            }
            Self::Remove(name) => {
                headers.remove(name);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Allow(Allow),
    Deny(Deny),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Allow {
    /// Applied to the upstream request in order, so later mutations win.
    pub header_mutations: Vec<HeaderMutation>,
    pub dynamic_metadata: Struct,
    /// The service failed and the request is let through regardless.
    pub failure_mode_allowed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Deny {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Decides the fate of a request from the outcome of its check.
///
/// Every error is handled alike: the request is let through when
/// `failure_mode_allow` is set and rejected with `403` otherwise. Cancelled
/// checks are never passed here.
pub fn apply(config: &EffectiveConfig, result: &CheckResult) -> Decision {
    match result {
        Ok(response) if response.status == CheckStatus::Ok => {
            Decision::Allow(allow(config, response, false))
        }
        Ok(response) => Decision::Deny(deny(response)),
        Err(_) if config.failure_mode_allow => {
            Decision::Allow(allow(config, &Response::ok(), true))
        }
        Err(_) => Decision::Deny(Deny {
            status: StatusCode::FORBIDDEN,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }),
    }
}

fn allow(config: &EffectiveConfig, response: &Response, failure_mode_allowed: bool) -> Allow {
    // Configuration was validated when the chain was built.
    let static_headers = config.headers_to_add.iter().filter_map(|header| {
        let (name, value) = header.parse("headers_to_add").ok()?;
        Some(if header.append {
            HeaderMutation::Append(name, value)
        } else {
            HeaderMutation::Set(name, value)
        })
    });

    let mut header_mutations: Vec<_> = static_headers
        .chain(
            response
                .headers_to_set
                .iter()
                .map(|(name, value)| HeaderMutation::Set(name.clone(), value.clone())),
        )
        .chain(
            response
                .headers_to_append
                .iter()
                .map(|(name, value)| HeaderMutation::Append(name.clone(), value.clone())),
        )
        .chain(
            response
                .headers_to_remove
                .iter()
                .filter(|name| **name != header::HOST)
                .map(|name| HeaderMutation::Remove(name.clone())),
        )
        .collect();

    if failure_mode_allowed && config.failure_mode_allow_header_add {
        header_mutations.push(HeaderMutation::Set(
            HeaderName::from_static(FAILURE_MODE_ALLOWED_HEADER),
            HeaderValue::from_static("true"),
        ));
    }

    Allow {
        header_mutations,
        dynamic_metadata: response.dynamic_metadata.clone(),
        failure_mode_allowed,
    }
}

fn deny(response: &Response) -> Deny {
    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers_to_set {
        headers.insert(name.clone(), value.clone());
    }
    for (name, value) in &response.headers_to_append {
        headers.append(name.clone(), value.clone());
    }

    Deny {
        status: response.status_code.unwrap_or(StatusCode::FORBIDDEN),
        headers,
        body: response.body.clone(),
    }
}
