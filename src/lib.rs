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

//! An external authorization stream filter.
//!
//! For each request the [`filter::Filter`] asks an out-of-process
//! authorization service whether the request may proceed, pausing only that
//! request until a decision arrives. The service is reached over either plain
//! HTTP or the `envoy.service.auth.v3.Authorization` gRPC API, both of which
//! sit behind the [`client::Client`] trait.

#![deny(unused_must_use)]

pub mod client;
pub mod config;
pub mod filter;
pub mod generated;
pub mod metadata;
pub mod metrics;
mod prost;

#[doc(hidden)]
pub mod test;

#[doc(inline)]
pub use self::{
    client::{AsyncClientCache, Client},
    config::{Config, ConfigError, PerRouteConfig},
    filter::{Filter, FilterFactory},
};
