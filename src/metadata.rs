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

//! Well known dynamic metadata used by the authorization filter.

use std::collections::BTreeMap;

/// Namespace that fields returned by the authorization service are written
/// under in the stream's dynamic metadata.
pub const NAMESPACE: &str = "envoy.filters.http.ext_authz";

/// A single namespace's worth of metadata, as a JSON object.
pub type Struct = serde_json::Map<String, serde_json::Value>;

/// Per-stream key-value store shared across filters in one chain, keyed by
/// namespace (usually the reverse DNS name of the filter that wrote it).
pub type DynamicMetadata = BTreeMap<String, Struct>;

/// Merges `fields` into `namespace`, replacing any existing keys of the same
/// name. Empty updates do not create the namespace.
pub fn merge(metadata: &mut DynamicMetadata, namespace: &str, fields: Struct) {
    if fields.is_empty() {
        return;
    }

    metadata
        .entry(namespace.to_owned())
        .or_default()
        .extend(fields);
}
