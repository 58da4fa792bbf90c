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

use std::{collections::BTreeMap, ops::Deref, sync::Arc};

use serde::{Deserialize, Serialize};

use super::Config;

/// Per-route authorization settings, layered over the chain-wide [`Config`].
///
/// ```yaml
/// check_settings:
///   context_extensions:
///     tenant: acme
///   disable_request_body_buffering: true
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PerRouteConfig {
    /// Skips authorization entirely for matching requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub check_settings: CheckSettings,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CheckSettings {
    /// Sent to the authorization service alongside the request, overriding
    /// entries of the same name in the chain-wide `context_extensions`.
    #[serde(default)]
    pub context_extensions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_request_body_buffering: Option<bool>,
}

impl PerRouteConfig {
    pub fn disabled() -> Self {
        Self {
            disabled: Some(true),
            ..Self::default()
        }
    }

    pub fn with_context_extensions<I, K, V>(extensions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            check_settings: CheckSettings {
                context_extensions: extensions
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
                ..<_>::default()
            },
            ..Self::default()
        }
    }

    /// Combines two layers of the route hierarchy (virtual host, route,
    /// weighted cluster). Fields set on `more_specific` take precedence.
    pub fn merge(less_specific: &Self, more_specific: &Self) -> Self {
        let mut context_extensions = less_specific.check_settings.context_extensions.clone();
        context_extensions.extend(
            more_specific
                .check_settings
                .context_extensions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        Self {
            disabled: more_specific.disabled.or(less_specific.disabled),
            check_settings: CheckSettings {
                context_extensions,
                disable_request_body_buffering: more_specific
                    .check_settings
                    .disable_request_body_buffering
                    .or(less_specific.check_settings.disable_request_body_buffering),
            },
        }
    }
}

/// The settings in force for a single request: the chain-wide [`Config`]
/// with any route overrides applied. Dereferences to the underlying
/// [`Config`] for everything routes cannot override.
///
/// This is recomputed for every request, as route configuration can change
/// between requests on the same connection.
#[derive(Clone, Debug)]
pub struct EffectiveConfig {
    config: Arc<Config>,
    pub disabled: bool,
    pub context_extensions: BTreeMap<String, String>,
    pub buffer_request_body: bool,
}

impl EffectiveConfig {
    /// Resolves the settings for a request whose route hierarchy carries
    /// `routes`, ordered from least to most specific.
    pub fn resolve(config: Arc<Config>, routes: &[Arc<PerRouteConfig>]) -> Self {
        let route = routes
            .iter()
            .fold(PerRouteConfig::default(), |merged, layer| {
                PerRouteConfig::merge(&merged, layer)
            });

        let mut context_extensions = config.context_extensions.clone();
        context_extensions.extend(route.check_settings.context_extensions);

        Self {
            disabled: route.disabled.unwrap_or(false),
            context_extensions,
            buffer_request_body: !route
                .check_settings
                .disable_request_body_buffering
                .unwrap_or(false),
            config,
        }
    }

    /// The body buffering settings, if the body should be buffered for this
    /// request.
    pub fn request_body(&self) -> Option<&super::BodyConfig> {
        self.config
            .with_request_body
            .as_ref()
            .filter(|_| self.buffer_request_body)
    }
}

impl Deref for EffectiveConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}
