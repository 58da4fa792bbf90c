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

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use url::Url;

use crate::config::{Config, ConfigError, Service};

/// Pooled HTTP/1.1 and HTTP/2 connections to one authorization server.
pub type HttpConnectionPool = hyper::Client<HttpsConnector<HttpConnector>, hyper::Body>;

static SHARED: Lazy<Arc<AsyncClientCache>> = Lazy::new(<_>::default);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transport {
    Http,
    Grpc,
}

/// Identifies one authorization backend, independent of how its URI was
/// spelled in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub transport: Transport,
    pub tls: bool,
    pub host: String,
    pub port: u16,
}

impl CacheKey {
    pub fn new(transport: Transport, uri: &Url) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.into(),
        };

        let host = uri
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host"))?
            .to_ascii_lowercase();
        let port = uri
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            transport,
            tls: uri.scheme() == "https",
            host,
            port,
        })
    }

    /// The key for the backend `config` points at.
    pub fn for_config(config: &Config) -> Result<Self, ConfigError> {
        match config.service()? {
            Service::Http(http) => Self::new(Transport::Http, &http.server_uri),
            Service::Grpc(grpc) => Self::new(Transport::Grpc, &grpc.target_uri),
        }
    }

    /// `scheme://host:port` of the backend.
    pub fn origin(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// A reusable, cheaply cloned connection to an authorization backend.
#[derive(Clone, Debug)]
pub enum ClientHandle {
    Http(HttpConnectionPool),
    Grpc(tonic::transport::Channel),
}

impl ClientHandle {
    /// Builds a handle for `key`. Connections are established lazily on first
    /// use, but gRPC channels can only be created from within a Tokio runtime.
    pub fn connect(key: &CacheKey) -> Result<Self, ConfigError> {
        match key.transport {
            Transport::Http => Ok(Self::Http(
                hyper::Client::builder().build(
                    hyper_rustls::HttpsConnectorBuilder::new()
                        .with_webpki_roots()
                        .https_or_http()
                        .enable_http1()
                        .enable_http2()
                        .build(),
                ),
            )),
            Transport::Grpc => {
                let origin = key.origin();
                // Channels spawn their connection task onto the current runtime.
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(ConfigError::NoRuntime(origin));
                }

                let mut endpoint = tonic::transport::Endpoint::from_shared(origin.clone())
                    .map_err(|error| ConfigError::InvalidUri {
                        uri: origin.clone(),
                        reason: error.to_string(),
                    })?;

                if key.tls {
                    let domain = key.host.trim_start_matches('[').trim_end_matches(']');
                    endpoint = endpoint
                        .tls_config(tonic::transport::ClientTlsConfig::new().domain_name(domain))
                        .map_err(|error| ConfigError::Tls {
                            uri: origin,
                            reason: error.to_string(),
                        })?;
                }

                Ok(Self::Grpc(endpoint.connect_lazy()))
            }
        }
    }
}

/// Transport handles shared by every filter chain in the process, keyed by
/// backend.
///
/// The process-wide instance returned by [`AsyncClientCache::shared`] is
/// created on first use and lives until the process exits. Entries are never
/// evicted, as the set of configured backends is small and static.
///
/// Lookups take a shared read lock. Only a caller that misses takes the write
/// lock, and it checks again before constructing, so callers racing on the
/// same key all receive the single handle the winner inserted.
#[derive(Debug, Default)]
pub struct AsyncClientCache {
    handles: RwLock<HashMap<CacheKey, Arc<ClientHandle>>>,
    constructed: AtomicUsize,
}

impl AsyncClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<Self> {
        SHARED.clone()
    }

    pub fn get_or_create(&self, key: &CacheKey) -> Result<Arc<ClientHandle>, ConfigError> {
        self.get_or_create_with(key, ClientHandle::connect)
    }

    /// As [`Self::get_or_create`], building missing handles with `build`.
    pub fn get_or_create_with<F>(
        &self,
        key: &CacheKey,
        build: F,
    ) -> Result<Arc<ClientHandle>, ConfigError>
    where
        F: FnOnce(&CacheKey) -> Result<ClientHandle, ConfigError>,
    {
        if let Some(handle) = self.handles.read().get(key) {
            return Ok(handle.clone());
        }

        let mut handles = self.handles.write();
        if let Some(handle) = handles.get(key) {
            tracing::trace!(?key, "lost race to construct authorization client");
            return Ok(handle.clone());
        }

        let handle = Arc::new(build(key)?);
        self.constructed.fetch_add(1, Ordering::Relaxed);
        handles.insert(key.clone(), handle.clone());
        tracing::debug!(?key, "constructed authorization client");
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many handles this cache has ever constructed.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }
}
