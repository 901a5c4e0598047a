//! Text rendering of recorded bodies for the detail screen and "share" exports.

use crate::models::{format_size, header_value, RequestRecord};
use std::collections::HashMap;
use std::fmt::Write as _;

const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// How a body should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPreview {
    Empty,
    /// Pretty-printed when the body parsed, raw text otherwise
    Json(String),
    Text { content_type: String, text: String },
    /// Over the display limit; only metadata is shown
    TooLarge { content_type: String, size: usize },
    /// Not valid UTF-8
    Unreadable { content_type: String, size: usize },
}

impl BodyPreview {
    /// Single block of text suitable for a label.
    pub fn display_text(&self) -> String {
        match self {
            BodyPreview::Empty => "-".to_string(),
            BodyPreview::Json(text) => text.clone(),
            BodyPreview::Text { text, .. } => text.clone(),
            BodyPreview::TooLarge { content_type, size } => format!(
                "Size: {}\nContent-Type: {}\nShare to export the full content",
                format_size(*size),
                content_type
            ),
            BodyPreview::Unreadable { content_type, size } => {
                format!("{} ({})", content_type, format_size(*size))
            }
        }
    }
}

fn content_type_of(headers: &HashMap<String, String>) -> &str {
    header_value(headers, "content-type").unwrap_or(UNKNOWN_CONTENT_TYPE)
}

fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

fn pretty_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| text.to_string())
}

pub fn preview_body(
    body: Option<&[u8]>,
    headers: &HashMap<String, String>,
    limit: usize,
) -> BodyPreview {
    let Some(bytes) = body.filter(|b| !b.is_empty()) else {
        return BodyPreview::Empty;
    };
    let content_type = content_type_of(headers).to_string();
    if bytes.len() > limit {
        return BodyPreview::TooLarge {
            content_type,
            size: bytes.len(),
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) if is_json(&content_type) => BodyPreview::Json(pretty_json(text)),
        Ok(text) => BodyPreview::Text {
            content_type,
            text: text.to_string(),
        },
        Err(_) => BodyPreview::Unreadable {
            content_type,
            size: bytes.len(),
        },
    }
}

/// Full body as text for sharing, with no size limit.
pub fn body_as_text(body: &[u8], headers: &HashMap<String, String>) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if is_json(content_type_of(headers)) => pretty_json(text),
        Ok(text) => text.to_string(),
        Err(_) => format!("Binary data ({})", format_size(body.len())),
    }
}

fn write_headers(out: &mut String, title: &str, headers: &HashMap<String, String>) {
    if headers.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
    let mut sorted: Vec<_> = headers.iter().collect();
    sorted.sort();
    for (name, value) in sorted {
        let _ = writeln!(out, "{name}: {value}");
    }
    out.push('\n');
}

/// Plain-text report of one exchange.
pub fn details_text(record: &RequestRecord) -> String {
    let mut out = String::from("Network Request Details\n======================\n\n");
    let _ = writeln!(out, "URL: {}", record.url);
    let _ = writeln!(out, "Method: {}", record.method);
    let _ = writeln!(out, "Timestamp: {}", record.timestamp.to_rfc3339());
    let _ = writeln!(out, "Status: {}\n", record.status_label());

    write_headers(&mut out, "Request Headers", &record.headers);
    if let Some(body) = &record.body {
        let _ = writeln!(out, "Request Body ({}):", format_size(body.len()));
        let _ = writeln!(out, "{}", body_as_text(body, &record.headers));
        if record.body_truncated {
            out.push_str("[truncated]\n");
        }
        out.push('\n');
    }

    if let Some(response) = &record.response {
        out.push_str("Response:\n---------\n");
        let _ = writeln!(out, "Status Code: {}", response.status_code);
        let _ = writeln!(
            out,
            "Response Time: {:.3}s\n",
            response.response_time.as_secs_f64()
        );
        write_headers(&mut out, "Response Headers", &response.headers);
        if let Some(body) = &response.body {
            let _ = writeln!(out, "Response Body ({}):", format_size(body.len()));
            let _ = writeln!(out, "{}", body_as_text(body, &response.headers));
            if response.body_truncated {
                out.push_str("[truncated]\n");
            }
        }
    }
    if let Some(error) = &record.error {
        let _ = writeln!(out, "Error: {error}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestOutcome, ResponseRecord};
    use std::time::Duration;

    fn json_headers() -> HashMap<String, String> {
        HashMap::from([(
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        )])
    }

    #[test]
    fn json_is_pretty_printed() {
        let preview = preview_body(Some(&br#"{"ok":true}"#[..]), &json_headers(), 1024);
        assert_eq!(preview, BodyPreview::Json("{\n  \"ok\": true\n}".to_string()));
    }

    #[test]
    fn invalid_json_falls_back_to_raw() {
        let preview = preview_body(Some(&b"{not json"[..]), &json_headers(), 1024);
        assert_eq!(preview, BodyPreview::Json("{not json".to_string()));
    }

    #[test]
    fn empty_large_and_binary_bodies() {
        assert_eq!(preview_body(None, &HashMap::new(), 10), BodyPreview::Empty);
        assert_eq!(preview_body(Some(&b""[..]), &HashMap::new(), 10), BodyPreview::Empty);

        let big = vec![b'a'; 11];
        let preview = preview_body(Some(big.as_slice()), &HashMap::new(), 10);
        assert_eq!(
            preview,
            BodyPreview::TooLarge {
                content_type: "unknown".into(),
                size: 11
            }
        );
        assert!(preview.display_text().starts_with("Size: 11B"));

        let binary = preview_body(Some(&[0xff, 0xd8][..]), &HashMap::new(), 10);
        assert_eq!(binary.display_text(), "unknown (2B)");
    }

    #[test]
    fn plain_text_is_shown_verbatim() {
        let headers = HashMap::from([("content-type".to_string(), "text/html".to_string())]);
        let preview = preview_body(Some(&b"<p>hi</p>"[..]), &headers, 1024);
        assert_eq!(preview.display_text(), "<p>hi</p>");
        assert_eq!(body_as_text(&[0xff; 3], &headers), "Binary data (3B)");
    }

    #[test]
    fn details_report_includes_both_halves() {
        let mut record = RequestRecord::new(
            "https://example.com/a",
            "POST",
            json_headers(),
            Some(br#"{"a":1,"b":2}"#.to_vec()),
        );
        record
            .apply_outcome(RequestOutcome::Completed(ResponseRecord {
                status_code: 201,
                headers: HashMap::new(),
                body: Some(b"created".to_vec()),
                response_time: Duration::from_millis(1500),
                body_truncated: true,
            }))
            .unwrap();

        let text = details_text(&record);
        assert!(text.contains("URL: https://example.com/a"));
        assert!(text.contains("Status: 201"));
        assert!(text.contains("Request Headers:\n---------------\nContent-Type:"));
        assert!(text.contains("\"a\": 1,\n  \"b\": 2"));
        assert!(text.contains("Response Time: 1.500s"));
        assert!(text.contains("created\n[truncated]"));
        assert!(!text.contains("Error:"));
    }

    #[test]
    fn truncated_request_body_is_flagged() {
        let mut record = RequestRecord::new(
            "https://example.com/u",
            "POST",
            HashMap::new(),
            Some(b"01234567".to_vec()),
        );
        assert!(!details_text(&record).contains("[truncated]"));

        record.body_truncated = true;
        let text = details_text(&record);
        assert!(text.contains("Request Body (8B):\n01234567\n[truncated]\n\n"));
    }
}
