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

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec};

use crate::metrics::{opts, registry, CollectorExt, STAT_PREFIX_LABEL};

const SUBSYSTEM: &str = "filter";

fn counter_vec(name: &str, description: &str) -> IntCounterVec {
    IntCounterVec::new(opts(name, SUBSYSTEM, description), &[STAT_PREFIX_LABEL])
        .and_then(|counter| counter.register_if_not_exists(registry()))
        .unwrap()
}

static OK: Lazy<IntCounterVec> =
    Lazy::new(|| counter_vec("ok_total", "Total number of requests allowed by the authorization service"));
static DENIED: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "denied_total",
        "Total number of requests denied, by the authorization service or by failing closed",
    )
});
static ERROR: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "error_total",
        "Total number of authorization calls that failed or timed out",
    )
});
static DISABLED: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "disabled_total",
        "Total number of requests on routes with authorization disabled",
    )
});
static FAILURE_MODE_ALLOWED: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "failure_mode_allowed_total",
        "Total number of requests let through because the authorization service failed",
    )
});
static CANCELLED: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "cancelled_total",
        "Total number of authorization calls abandoned because the stream ended",
    )
});

/// Counters for one filter chain, labelled with its `stat_prefix`.
#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) ok: IntCounter,
    pub(crate) denied: IntCounter,
    pub(crate) error: IntCounter,
    pub(crate) disabled: IntCounter,
    pub(crate) failure_mode_allowed: IntCounter,
    pub(crate) cancelled: IntCounter,
}

impl Metrics {
    pub(crate) fn new(stat_prefix: &str) -> Self {
        let labels = &[stat_prefix];
        Self {
            ok: OK.with_label_values(labels),
            denied: DENIED.with_label_values(labels),
            error: ERROR.with_label_values(labels),
            disabled: DISABLED.with_label_values(labels),
            failure_mode_allowed: FAILURE_MODE_ALLOWED.with_label_values(labels),
            cancelled: CANCELLED.with_label_values(labels),
        }
    }
}
