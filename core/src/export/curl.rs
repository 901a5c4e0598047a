use crate::models::RequestRecord;

/// Quote `value` for a POSIX shell.
fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// A `curl` command that reproduces the recorded request.
pub fn to_curl(record: &RequestRecord) -> String {
    let mut parts = vec!["curl".to_string()];
    if record.method != "GET" || record.body.is_some() {
        parts.push("-X".to_string());
        parts.push(shell_quote(&record.method));
    }

    let mut headers: Vec<_> = record.headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        parts.push("-H".to_string());
        parts.push(shell_quote(&format!("{name}: {value}")));
    }

    if let Some(body) = &record.body {
        match std::str::from_utf8(body) {
            _ if record.body_truncated => {
                tracing::debug!("Request {} body was truncated, omitted from curl", record.id);
                parts.push("--data-binary".to_string());
                parts.push("@-".to_string());
            }
            Ok(text) => {
                parts.push("--data-raw".to_string());
                parts.push(shell_quote(text));
            }
            Err(_) => {
                tracing::debug!("Request {} has a binary body, omitted from curl", record.id);
                parts.push("--data-binary".to_string());
                parts.push("@-".to_string());
            }
        }
    }

    parts.push(shell_quote(&record.url));
    parts.join(" ")
}
