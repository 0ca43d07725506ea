//! Gmail wire types and message parsing.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

/// A fetched, parsed email as returned by the provider. Immutable once built.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Provider message id.
    pub id: String,
    /// Resolved sender address (lowercased bare address where possible).
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Received timestamp.
    pub received_at: DateTime<Utc>,
    /// Raw body, HTML preferred over plain text for multipart messages.
    pub body: String,
    /// Permalink into the provider's web UI.
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageListResponse {
    #[serde(default)]
    pub messages: Vec<MessageStub>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageStub {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

/// One node of the MIME tree. `parts` recurses for multipart messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePayload {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PayloadBody>,
    #[serde(default)]
    pub parts: Vec<MessagePayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PayloadBody {
    #[serde(default)]
    pub data: Option<String>,
}

impl MessageDetail {
    /// Parses a detail response into a [`RawMessage`].
    pub(crate) fn into_raw_message(self) -> RawMessage {
        let headers = self
            .payload
            .as_ref()
            .map(|p| &p.headers[..])
            .unwrap_or(&[]);

        let get_header = |name: &str| -> &str {
            headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map_or("", |h| h.value.as_str())
        };

        let subject = {
            let s = get_header("Subject");
            if s.is_empty() { "No Subject" } else { s }.to_string()
        };
        let sender = extract_sender(get_header("From"));
        let received_at = parse_rfc2822(get_header("Date"));
        let body = self
            .payload
            .as_ref()
            .and_then(extract_body)
            .unwrap_or_default();
        let permalink = format!("https://mail.google.com/mail/u/0/#inbox/{}", self.id);

        RawMessage {
            id: self.id,
            sender,
            subject,
            received_at,
            body,
            permalink,
        }
    }
}

/// Extracts a bare address from a free-form "From" header.
///
/// `Jane Doe <jane@x.com>` yields `jane@x.com`; otherwise the last
/// whitespace-delimited token is used.
pub(crate) fn extract_sender(from_header: &str) -> String {
    if let Some(start) = from_header.find('<') {
        if let Some(end) = from_header[start + 1..].find('>') {
            return from_header[start + 1..start + 1 + end].trim().to_lowercase();
        }
    }
    from_header
        .split_whitespace()
        .next_back()
        .unwrap_or_default()
        .to_lowercase()
}

/// Parses an RFC 2822 date header, falling back to now for malformed values.
fn parse_rfc2822(date_header: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc2822(date_header).map_or_else(
        |_| {
            debug!(date = %date_header, "unparseable Date header, using current time");
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    )
}

/// Picks the message body from the MIME tree.
///
/// Single-part bodies are used directly. For multipart messages, HTML is
/// preferred over plain text: newsletters carry their real content in the
/// HTML variant.
fn extract_body(payload: &MessagePayload) -> Option<String> {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        if let Some(text) = decode_body(data) {
            return Some(text);
        }
    }

    find_part(payload, "text/html").or_else(|| find_part(payload, "text/plain"))
}

/// Recursively walks MIME parts for body data of the target type.
fn find_part(payload: &MessagePayload, target_mime: &str) -> Option<String> {
    for part in &payload.parts {
        if part.mime_type == target_mime {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
                if let Some(text) = decode_body(data) {
                    return Some(text);
                }
            }
        }
    }
    for part in &payload.parts {
        if let Some(text) = find_part(part, target_mime) {
            return Some(text);
        }
    }
    None
}

/// Decodes the URL-safe base64 (no padding) used by the Gmail API.
fn decode_body(data: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .ok()?;
    String::from_utf8(bytes).map(|s| s.trim().to_string()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    #[test]
    fn sender_from_angle_brackets() {
        assert_eq!(
            extract_sender("Jane Doe <Jane@Example.com>"),
            "jane@example.com"
        );
    }

    #[test]
    fn sender_from_bare_address() {
        assert_eq!(extract_sender("news@daily.example"), "news@daily.example");
    }

    #[test]
    fn sender_last_token_fallback() {
        assert_eq!(
            extract_sender("The Daily news@daily.example"),
            "news@daily.example"
        );
    }

    #[test]
    fn sender_empty_header() {
        assert_eq!(extract_sender(""), "");
    }

    #[test]
    fn detail_parses_headers_and_body() {
        let json = format!(
            r#"{{
                "id": "msg1",
                "payload": {{
                    "mimeType": "text/html",
                    "headers": [
                        {{"name": "From", "value": "Daily <news@daily.example>"}},
                        {{"name": "Subject", "value": "Morning Edition"}},
                        {{"name": "Date", "value": "Mon, 02 Jun 2025 08:30:00 +0000"}}
                    ],
                    "body": {{"data": "{}"}}
                }}
            }}"#,
            encode("<p>Hello</p>")
        );

        let detail: MessageDetail = serde_json::from_str(&json).unwrap();
        let msg = detail.into_raw_message();
        assert_eq!(msg.id, "msg1");
        assert_eq!(msg.sender, "news@daily.example");
        assert_eq!(msg.subject, "Morning Edition");
        assert_eq!(msg.body, "<p>Hello</p>");
        assert_eq!(
            msg.permalink,
            "https://mail.google.com/mail/u/0/#inbox/msg1"
        );
        assert_eq!(msg.received_at.to_rfc2822(), "Mon, 2 Jun 2025 08:30:00 +0000");
    }

    #[test]
    fn multipart_prefers_html_over_plain() {
        let json = format!(
            r#"{{
                "id": "msg2",
                "payload": {{
                    "mimeType": "multipart/alternative",
                    "headers": [{{"name": "From", "value": "a@x.com"}}],
                    "parts": [
                        {{"mimeType": "text/plain", "body": {{"data": "{}"}}}},
                        {{"mimeType": "text/html", "body": {{"data": "{}"}}}}
                    ]
                }}
            }}"#,
            encode("plain body"),
            encode("<b>html body</b>")
        );

        let detail: MessageDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(detail.into_raw_message().body, "<b>html body</b>");
    }

    #[test]
    fn missing_subject_uses_placeholder() {
        let json = r#"{"id": "msg3", "payload": {"headers": []}}"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        let msg = detail.into_raw_message();
        assert_eq!(msg.subject, "No Subject");
        assert!(msg.body.is_empty());
    }

    #[test]
    fn empty_list_response() {
        let json = r#"{"resultSizeEstimate": 0}"#;
        let resp: MessageListResponse = serde_json::from_str(json).unwrap();
        assert!(resp.messages.is_empty());
        assert!(resp.next_page_token.is_none());
    }
}
