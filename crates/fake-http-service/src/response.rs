//! The response responders write into.

use crate::error::{FakeServiceError, Result};
use bytes::{Bytes, BytesMut};
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;
use std::str::FromStr;

/// Response under construction. Starts as `200 OK` with no headers and an empty body.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl FakeResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Set the status from a raw code.
    pub fn set_status_code(&mut self, code: u16) -> Result<&mut Self> {
        let status = StatusCode::from_u16(code)
            .map_err(|_| FakeServiceError::InvalidStatus(code))?;
        Ok(self.set_status(status))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Add a value for `name`, keeping any values already present.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set `name` to `value`, replacing any values already present.
    pub fn insert_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn set_content_type(&mut self, content_type: &str) -> Result<&mut Self> {
        self.insert_header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Append UTF-8 text to the body.
    pub fn write_text(&mut self, text: &str) -> &mut Self {
        self.body.extend_from_slice(text.as_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Serialize `value` as the body and set `content-type: application/json`.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        let payload = serde_json::to_vec(value)?;
        self.body.extend_from_slice(&payload);
        self.set_content_type("application/json")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, for assertions and logging.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub(crate) fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_str(name)
        .map_err(|_| FakeServiceError::InvalidHeader(format!("name {name:?}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| FakeServiceError::InvalidHeader(format!("value {value:?} for {name}")))?;
    Ok((name, value))
}
