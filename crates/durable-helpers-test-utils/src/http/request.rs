use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
};
use serde::Serialize;

use super::query::QueryCollection;
use crate::error::TestHostError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builder for a request to hand straight to an HTTP-triggered function.
///
/// Defaults to `GET /` with no headers, no query and an empty body.
#[derive(Debug, Clone)]
pub struct DummyHttpRequest {
    method: Method,
    path: String,
    query: QueryCollection,
    headers: HeaderMap,
    body: Bytes,
    form: Option<QueryCollection>,
}

impl Default for DummyHttpRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query: QueryCollection::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            form: None,
        }
    }
}

impl DummyHttpRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.add(key, value);
        self
    }

    pub fn with_query(mut self, query: QueryCollection) -> Self {
        self.query = query;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, TestHostError> {
        let body = serde_json::to_vec(value).map_err(|e| TestHostError::InvalidRequest(e.to_string()))?;
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(body);
        Ok(self)
    }

    /// Form-urlencoded body with a matching content type
    pub fn form(mut self, form: QueryCollection) -> Self {
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        self.body = Bytes::from(form.to_query_string());
        self.form = Some(form);
        self
    }

    pub fn query(&self) -> &QueryCollection {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The form fields, empty when no form body was set.
    pub fn read_form(&self) -> QueryCollection {
        self.form.clone().unwrap_or_default()
    }

    pub fn has_form_content_type(&self) -> bool {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.starts_with(FORM_CONTENT_TYPE))
    }

    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.to_query_string())
        }
    }

    pub fn into_request(self) -> Result<Request<Body>, TestHostError> {
        let mut builder = Request::builder().method(self.method.clone()).uri(self.uri());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder
            .body(Body::from(self.body))
            .map_err(|e| TestHostError::InvalidRequest(e.to_string()))
    }
}
