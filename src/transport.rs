//! HTTP transport
//!
//! The pusher only needs "send this request, give me status and body". The
//! reqwest implementation keeps one pooled client with bounded timeouts that
//! every concurrent push shares.

use crate::adapters::{BasicAuth, HttpMethod};
use crate::error::{PushError, TransportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Outbound request produced by the pusher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything able to carry a push to a provider
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with a total request timeout and a connect timeout
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, PushError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(crate::SOFTWARE_SIGNATURE)
            .build()
            .map_err(|e| PushError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::PostForm => self.client.post(&request.url).form(&request.fields),
            HttpMethod::GetQuery => self.client.get(&request.url).query(&request.fields),
        };
        if let Some(auth) = &request.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
