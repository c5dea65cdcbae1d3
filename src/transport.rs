//! HTTP transport seam.
//!
//! The protocol logic never talks to a socket directly. It hands a fully
//! formed [`http::Request`] to an [`HttpTransport`] and receives the status
//! and headers back, with the body left unread until the caller asks for it.
//! Connection pooling, TLS, proxies, timeouts and cancellation all live
//! behind this trait.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::EstClientConfig;
use crate::error::{EstError, Result};
use crate::tls::build_http_client;

type BodyFuture = Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

/// A response body that has not been read yet.
///
/// Dropping it without calling [`ResponseBody::read`] abandons the body.
pub struct ResponseBody {
    inner: BodyInner,
}

enum BodyInner {
    Ready(Bytes),
    Deferred(BodyFuture),
}

impl ResponseBody {
    /// A body whose bytes are already in memory.
    pub fn ready(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: BodyInner::Ready(bytes.into()),
        }
    }

    /// A body produced by `future` the first time it is read.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: BodyInner::Deferred(Box::pin(future)),
        }
    }

    /// Collect the full body.
    pub async fn read(self) -> Result<Bytes> {
        match self.inner {
            BodyInner::Ready(bytes) => Ok(bytes),
            BodyInner::Deferred(future) => future.await,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            BodyInner::Ready(bytes) => f.debug_tuple("Ready").field(&bytes.len()).finish(),
            BodyInner::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::ready(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::ready(bytes)
    }
}

impl From<&'static [u8]> for ResponseBody {
    fn from(bytes: &'static [u8]) -> Self {
        Self::ready(Bytes::from_static(bytes))
    }
}

/// Executes a single HTTP exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return once the status line and headers are in.
    async fn execute(&self, request: http::Request<Vec<u8>>)
        -> Result<http::Response<ResponseBody>>;
}

/// [`HttpTransport`] backed by a rustls reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from client configuration (trust anchors, identity, timeout).
    pub fn new(config: &EstClientConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config)?,
        })
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<ResponseBody>> {
        let (parts, body) = request.into_parts();

        let response = self
            .http
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = ResponseBody::deferred(async move { response.bytes().await.map_err(EstError::from) });

        let mut builder = http::Response::builder().status(status);
        if let Some(h) = builder.headers_mut() {
            *h = headers;
        }
        builder
            .body(body)
            .map_err(|e| EstError::transport(format!("Failed to assemble response: {}", e)))
    }
}
