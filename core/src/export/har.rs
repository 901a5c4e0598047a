use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::error::DebuggerError;
use crate::models::{RequestRecord, RequestStatus};

const HAR_VERSION: &str = "1.2";
const CREATOR_NAME: &str = "netdebug";
const CREATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
const HTTP_VERSION: &str = "HTTP/1.1";
const TRUNCATED_COMMENT: &str = "body truncated at the capture limit";

#[derive(Serialize)]
struct HarLog<'a> {
    log: HarLogInner<'a>,
}

#[derive(Serialize)]
struct HarLogInner<'a> {
    version: &'static str,
    creator: HarCreator<'a>,
    entries: Vec<HarEntry>,
}

#[derive(Serialize)]
struct HarCreator<'a> {
    name: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct HarEntry {
    #[serde(rename = "startedDateTime")]
    started_datetime: String,
    time: i64,
    request: HarRequest,
    response: HarResponse,
    cache: HashMap<String, Value>,
    timings: HarTimings,
    #[serde(rename = "_state")]
    state: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none", rename = "_error")]
    error: Option<String>,
}

#[derive(Serialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(rename = "httpVersion")]
    http_version: &'static str,
    headers: Vec<HarHeader>,
    #[serde(rename = "queryString")]
    query_string: Vec<HarHeader>,
    cookies: Vec<Value>,
    #[serde(rename = "headersSize")]
    headers_size: i64,
    #[serde(rename = "bodySize")]
    body_size: i64,
    #[serde(skip_serializing_if = "Option::is_none", rename = "postData")]
    post_data: Option<HarPostData>,
}

#[derive(Serialize)]
struct HarResponse {
    status: i64,
    #[serde(rename = "statusText")]
    status_text: String,
    #[serde(rename = "httpVersion")]
    http_version: &'static str,
    headers: Vec<HarHeader>,
    cookies: Vec<Value>,
    content: HarContent,
    #[serde(rename = "redirectURL")]
    redirect_url: String,
    #[serde(rename = "headersSize")]
    headers_size: i64,
    #[serde(rename = "bodySize")]
    body_size: i64,
}

#[derive(Serialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct HarPostData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'static str>,
}

#[derive(Serialize)]
struct HarContent {
    size: i64,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'static str>,
}

#[derive(Serialize)]
struct HarTimings {
    send: i64,
    wait: i64,
    receive: i64,
}

/// Build a HAR 1.2 document from recorded requests, in the given order.
pub fn records_to_har(records: &[RequestRecord]) -> Result<Value, DebuggerError> {
    let entries = records.iter().map(HarEntry::from).collect();
    let log = HarLog {
        log: HarLogInner {
            version: HAR_VERSION,
            creator: HarCreator {
                name: CREATOR_NAME,
                version: CREATOR_VERSION,
            },
            entries,
        },
    };
    Ok(serde_json::to_value(log)?)
}

/// Write the HAR document to `path`. Returns the number of entries written.
pub fn export_har_to_path(records: &[RequestRecord], path: &Path) -> anyhow::Result<usize> {
    let har = records_to_har(records)?;
    let json = serde_json::to_vec_pretty(&har).context("serializing HAR log")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing HAR export to {}", path.display()))?;
    tracing::info!("Exported {} requests to {}", records.len(), path.display());
    Ok(records.len())
}

impl From<&RequestRecord> for HarEntry {
    fn from(record: &RequestRecord) -> Self {
        let time = record
            .response
            .as_ref()
            .map(|r| r.response_time_ms() as i64)
            .unwrap_or(0);
        Self {
            started_datetime: record.timestamp.to_rfc3339(),
            time,
            request: HarRequest::from(record),
            response: HarResponse::from(record),
            cache: HashMap::new(),
            timings: HarTimings {
                send: 0,
                wait: time,
                receive: 0,
            },
            state: record.status,
            error: record.error.clone(),
        }
    }
}

impl From<&RequestRecord> for HarRequest {
    fn from(record: &RequestRecord) -> Self {
        let (body_size, post_data) =
            encode_body(&record.body, record.content_type(), record.body_truncated);
        Self {
            method: record.method.clone(),
            url: record.url.clone(),
            http_version: HTTP_VERSION,
            headers: har_headers(&record.headers),
            query_string: parse_query_pairs(&record.url),
            cookies: Vec::new(),
            headers_size: -1,
            body_size,
            post_data,
        }
    }
}

impl From<&RequestRecord> for HarResponse {
    fn from(record: &RequestRecord) -> Self {
        let Some(response) = &record.response else {
            return Self {
                status: 0,
                status_text: String::new(),
                http_version: HTTP_VERSION,
                headers: Vec::new(),
                cookies: Vec::new(),
                content: HarContent::from_body(&None, None, false).1,
                redirect_url: String::new(),
                headers_size: -1,
                body_size: -1,
            };
        };

        let (body_size, content) = HarContent::from_body(
            &response.body,
            response.content_type(),
            response.body_truncated,
        );
        let status_text = http::StatusCode::from_u16(response.status_code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        let redirect_url = crate::models::header_value(&response.headers, "location")
            .unwrap_or_default()
            .to_string();
        Self {
            status: response.status_code as i64,
            status_text,
            http_version: HTTP_VERSION,
            headers: har_headers(&response.headers),
            cookies: Vec::new(),
            content,
            redirect_url,
            headers_size: -1,
            body_size,
        }
    }
}

impl HarContent {
    fn from_body(
        body: &Option<Vec<u8>>,
        mime_type: Option<&str>,
        truncated: bool,
    ) -> (i64, Self) {
        let mime_type = mime_type.unwrap_or("application/octet-stream").to_string();
        match body {
            Some(bytes) => {
                let (text, encoding) = text_or_base64(bytes);
                let size = bytes.len() as i64;
                (
                    recorded_size(size, truncated),
                    Self {
                        size,
                        mime_type,
                        text: Some(text),
                        encoding,
                        comment: truncated.then_some(TRUNCATED_COMMENT),
                    },
                )
            }
            None => (
                0,
                Self {
                    size: 0,
                    mime_type,
                    text: None,
                    encoding: None,
                    comment: None,
                },
            ),
        }
    }
}

fn text_or_base64(bytes: &[u8]) -> (String, Option<&'static str>) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), None),
        Err(_) => (general_purpose::STANDARD.encode(bytes), Some("base64")),
    }
}

/// Full size when the whole body was kept, -1 (unknown) when it was cut.
fn recorded_size(len: i64, truncated: bool) -> i64 {
    if truncated {
        -1
    } else {
        len
    }
}

fn encode_body(
    body: &Option<Vec<u8>>,
    mime_type: Option<&str>,
    truncated: bool,
) -> (i64, Option<HarPostData>) {
    match body {
        Some(bytes) => {
            let (text, encoding) = text_or_base64(bytes);
            (
                recorded_size(bytes.len() as i64, truncated),
                Some(HarPostData {
                    mime_type: mime_type.unwrap_or("application/octet-stream").to_string(),
                    text,
                    encoding,
                    comment: truncated.then_some(TRUNCATED_COMMENT),
                }),
            )
        }
        None => (0, None),
    }
}

fn har_headers(headers: &HashMap<String, String>) -> Vec<HarHeader> {
    let mut headers: Vec<_> = headers
        .iter()
        .map(|(name, value)| HarHeader {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    headers.sort_by(|a, b| a.name.cmp(&b.name));
    headers
}

fn parse_query_pairs(raw: &str) -> Vec<HarHeader> {
    match url::Url::parse(raw) {
        Ok(parsed) => parsed
            .query_pairs()
            .map(|(name, value)| HarHeader {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestOutcome, ResponseRecord};
    use std::time::Duration;

    fn completed() -> RequestRecord {
        let mut record = RequestRecord::new(
            "https://example.com/search?q=rust%20lang&page=2",
            "POST",
            HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            Some(br#"{"x":1}"#.to_vec()),
        );
        record
            .apply_outcome(RequestOutcome::Completed(ResponseRecord {
                status_code: 404,
                headers: HashMap::from([("content-type".to_string(), "text/plain".to_string())]),
                body: Some(b"missing".to_vec()),
                response_time: Duration::from_millis(42),
                body_truncated: false,
            }))
            .unwrap();
        record
    }

    #[test]
    fn har_contains_request_and_response() {
        let har = records_to_har(&[completed()]).unwrap();
        assert_eq!(har["log"]["version"], "1.2");
        let entry = &har["log"]["entries"][0];
        assert_eq!(entry["time"], 42);
        assert_eq!(entry["_state"], "completed");

        let request = &entry["request"];
        assert_eq!(request["method"], "POST");
        assert_eq!(request["postData"]["text"], r#"{"x":1}"#);
        assert_eq!(request["postData"]["mimeType"], "application/json");
        assert_eq!(request["queryString"][0]["name"], "q");
        assert_eq!(request["queryString"][0]["value"], "rust lang");
        assert_eq!(request["queryString"][1]["value"], "2");

        let response = &entry["response"];
        assert_eq!(response["status"], 404);
        assert_eq!(response["statusText"], "Not Found");
        assert_eq!(response["content"]["text"], "missing");
        assert_eq!(response["content"]["mimeType"], "text/plain");
    }

    #[test]
    fn failed_and_binary_entries() {
        let mut failed = RequestRecord::new(
            "http://example.com/upload",
            "PUT",
            HashMap::new(),
            Some(vec![0xff, 0xfe, 0x00]),
        );
        failed
            .apply_outcome(RequestOutcome::failed("timed out"))
            .unwrap();

        let har = records_to_har(&[failed]).unwrap();
        let entry = &har["log"]["entries"][0];
        assert_eq!(entry["_error"], "timed out");
        assert_eq!(entry["response"]["status"], 0);
        assert_eq!(entry["request"]["postData"]["encoding"], "base64");
        assert_eq!(entry["request"]["postData"]["text"], "//4A");
        assert!(entry["request"]["queryString"].as_array().unwrap().is_empty());
    }

    #[test]
    fn truncated_bodies_have_unknown_size() {
        let mut record = completed();
        record.body_truncated = true;
        let har = records_to_har(&[record]).unwrap();
        let request = &har["log"]["entries"][0]["request"];
        assert_eq!(request["bodySize"], -1);
        assert_eq!(request["postData"]["comment"], TRUNCATED_COMMENT);

        let full = records_to_har(&[completed()]).unwrap();
        let request = &full["log"]["entries"][0]["request"];
        assert_eq!(request["bodySize"], 7);
        assert!(request["postData"].get("comment").is_none());
        assert!(full["log"]["entries"][0]["response"]["content"]
            .get("comment")
            .is_none());
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.har");
        let written = export_har_to_path(&[completed(), completed()], &path).unwrap();
        assert_eq!(written, 2);

        let parsed: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed["log"]["entries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("traffic.har");
        let err = export_har_to_path(&[completed()], &path).unwrap_err();
        assert!(err.to_string().contains("writing HAR export"));
    }
}
