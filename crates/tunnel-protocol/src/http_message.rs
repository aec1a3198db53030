//! Encoding and parsing of the "embedded HTTP" carried in REQUEST and
//! RESPONSE frame bodies: complete HTTP/1.x messages,
//! byte-identical to the wire form a conforming HTTP/1.1 peer would
//! produce or consume.
//!
//! Parsing uses `httparse` for the request/status line and headers;
//! `http` carries the parsed result (`Method`, `StatusCode`,
//! `HeaderMap`) through the rest of the pipeline. Serialization is a
//! direct writer, since no crate in the stack owns "serialize an
//! `http::Request` back to wire bytes" as a public API.

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";
/// httparse needs a fixed-size header slab up front; 64 headers is
/// generous for anything this tunnel is expected to carry.
const MAX_HEADERS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HttpMessageError {
    #[error("malformed HTTP message: {0}")]
    Malformed(String),
    #[error("HTTP message truncated")]
    Truncated,
}

/// A parsed HTTP/1.x request: method, request-target, headers, body.
#[derive(Debug, Clone)]
pub struct DecodedRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A parsed HTTP/1.x response: status, headers, body.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub fn encode_request(method: &Method, path_and_query: &str, headers: &HeaderMap, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(method.as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(path_and_query.as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(HTTP_VERSION.as_bytes());
    buf.put_slice(b"\r\n");
    write_headers(&mut buf, headers);
    buf.put_slice(b"\r\n");
    buf.put_slice(body);
    buf.freeze()
}

pub fn encode_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(HTTP_VERSION.as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
    buf.put_slice(b"\r\n");
    write_headers(&mut buf, headers);
    buf.put_slice(b"\r\n");
    buf.put_slice(body);
    buf.freeze()
}

fn write_headers(buf: &mut BytesMut, headers: &HeaderMap) {
    for (name, value) in headers {
        buf.put_slice(name.as_str().as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }
}

pub fn decode_request(data: &[u8]) -> Result<DecodedRequest, HttpMessageError> {
    let mut header_slab = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut header_slab);
    let body_offset = match parsed
        .parse(data)
        .map_err(|e| HttpMessageError::Malformed(e.to_string()))?
    {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Err(HttpMessageError::Truncated),
    };

    let method_str = parsed
        .method
        .ok_or_else(|| HttpMessageError::Malformed("missing method".to_owned()))?;
    let method = Method::from_bytes(method_str.as_bytes())
        .map_err(|e| HttpMessageError::Malformed(e.to_string()))?;
    let path_and_query = parsed
        .path
        .ok_or_else(|| HttpMessageError::Malformed("missing request target".to_owned()))?
        .to_owned();
    let headers = decode_headers(parsed.headers)?;
    let body = Bytes::copy_from_slice(&data[body_offset..]);

    Ok(DecodedRequest {
        method,
        path_and_query,
        headers,
        body,
    })
}

pub fn decode_response(data: &[u8]) -> Result<DecodedResponse, HttpMessageError> {
    let mut header_slab = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut header_slab);
    let body_offset = match parsed
        .parse(data)
        .map_err(|e| HttpMessageError::Malformed(e.to_string()))?
    {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Err(HttpMessageError::Truncated),
    };

    let code = parsed
        .code
        .ok_or_else(|| HttpMessageError::Malformed("missing status code".to_owned()))?;
    let status = StatusCode::from_u16(code).map_err(|e| HttpMessageError::Malformed(e.to_string()))?;
    let headers = decode_headers(parsed.headers)?;
    let body = Bytes::copy_from_slice(&data[body_offset..]);

    Ok(DecodedResponse { status, headers, body })
}

fn decode_headers(raw: &[httparse::Header]) -> Result<HeaderMap, HttpMessageError> {
    let mut headers = HeaderMap::new();
    for header in raw {
        if header.name.is_empty() {
            continue;
        }
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| HttpMessageError::Malformed(e.to_string()))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|e| HttpMessageError::Malformed(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}
