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
use prometheus::core::Collector;
pub use prometheus::Result;
use prometheus::{Opts, Registry};

/// Label carrying the configured `stat_prefix` of a filter chain.
pub const STAT_PREFIX_LABEL: &str = "stat_prefix";

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// The registry every metric in this crate is registered with. The embedding
/// process decides how, and whether, it is exported.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

pub fn opts(name: &str, subsystem: &str, description: &str) -> Opts {
    Opts::new(name, description)
        .namespace("ext_authz")
        .subsystem(subsystem)
}

pub trait CollectorExt: Collector + Clone + Sized + 'static {
    fn register_if_not_exists(self, registry: &Registry) -> Result<Self> {
        match registry.register(Box::new(self.clone())) {
            Ok(_) | Err(prometheus::Error::AlreadyReg) => Ok(self),
            Err(prometheus::Error::Msg(msg)) if msg.contains("already exists") => {
                // FIXME: We should be able to remove this branch entirely if `AlreadyReg` gets fixed.
                //  https://github.com/tikv/rust-prometheus/issues/247
                Ok(self)
            }
            Err(err) => Err(err),
        }
    }
}

impl<C: Collector + Clone + 'static> CollectorExt for C {}
