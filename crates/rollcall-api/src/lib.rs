// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod endpoints;
mod envelope;
mod error;
mod executor;

pub use envelope::{Envelope, SUCCESS_CODE};
pub use error::{ApiError, GENERIC_FAILURE};
pub use executor::{Completion, Executor, ExecutorState, Transport};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// One outbound call: target path relative to the API base, method, body,
/// and extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub target: String,
    pub method: Method,
    pub payload: Payload,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            payload: Payload::None,
            headers: Vec::new(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.payload = Payload::Form(fields);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    token: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_owned()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("api.base_url must use http or https, got {:?}", base_url.scheme());
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            token: None,
            http,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn resolve(&self, target: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(target.trim_start_matches('/'))
            .map_err(|error| {
                ApiError::transport(format!("invalid request target {target:?}: {error}"))
            })
    }

    pub fn send(&self, request: &RequestDescriptor) -> Result<Envelope, ApiError> {
        let url = self.resolve(&request.target)?;
        debug!(method = request.method.as_str(), %url, "sending request");

        let mut builder = self.http.request(request.method.to_reqwest(), url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.payload {
            Payload::None => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Form(fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), &error))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|error| ApiError::transport(format!("read response body: {error}")))?;
        Envelope::decode(status, &body)
    }
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        return ApiError::transport(format!(
            "request to {base_url} timed out -- raise [api].timeout or check the server"
        ));
    }
    ApiError::transport(format!(
        "cannot reach {base_url} -- check [api].base_url ({error})"
    ))
}
