// SPDX-License-Identifier: GPL-3.0-only

//! JSON parsing for Discord channel message responses.
//!
//! The `GET /channels/{id}/messages` endpoint answers with either a JSON
//! array of message objects or, on failure, a JSON object carrying a numeric
//! `code` (for example `{"code": 50001, "message": "Missing Access"}`). This
//! module tells the two apart and deserializes the success case into typed
//! records holding only the fields the transcript needs.
//!
//! # Example
//!
//! ```
//! use discord_export::parser::{Response, parse_response};
//!
//! let json = r#"[{
//!     "author": { "username": "alice" },
//!     "timestamp": "2023-01-12T14:23:01.123000+00:00",
//!     "content": "Hello",
//!     "mentions": [],
//!     "embeds": [],
//!     "attachments": []
//! }]"#;
//!
//! let Response::Messages(messages) = parse_response(json).unwrap() else {
//!     panic!("expected messages");
//! };
//! assert_eq!(messages[0].author.username, "alice");
//! ```

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use snafu::prelude::*;
use std::fmt;

/// Error type for response parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The response body is not valid JSON.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// The JSON is valid but a message record does not have the expected shape.
    #[snafu(display("malformed message record: {source}"))]
    Record {
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
}

/// A parsed messages response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The messages in the order the API returned them.
    Messages(Vec<Message>),

    /// The API refused the request.
    Error(ApiError),
}

/// An error payload returned by the API in place of a message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    payload: serde_json::Value,
}

impl ApiError {
    /// The numeric Discord error code, if it is an integer.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        self.payload.get("code").and_then(serde_json::Value::as_i64)
    }

    /// The full error object as returned by the API.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// The user who sent the message.
    pub author: Author,

    /// When the message was sent, in the offset the API reported.
    pub timestamp: DateTime<FixedOffset>,

    /// The raw message text, possibly containing `<@id>` mention tokens.
    pub content: String,

    /// Users mentioned in this message. Only these resolve its mention tokens.
    pub mentions: Vec<Mention>,

    /// Rich content cards attached to the message.
    pub embeds: Vec<Embed>,

    /// Uploaded files.
    pub attachments: Vec<Attachment>,

    /// The message this one replies to.
    ///
    /// `None` both for ordinary messages and for replies whose original was
    /// deleted (the API sends `null` in that case).
    pub referenced_message: Option<ReferencedMessage>,
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    /// Display name of the user.
    pub username: String,
}

/// A user mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mention {
    /// Snowflake identifier, kept as a string to preserve every digit.
    pub id: String,

    /// Display name of the mentioned user.
    pub username: String,
}

/// A rich content card. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Embed {
    /// Card title.
    pub title: Option<String>,

    /// Link target of the card.
    pub url: Option<String>,

    /// Body text of the card.
    pub description: Option<String>,

    /// Preview image.
    pub thumbnail: Option<Thumbnail>,
}

/// Preview image of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    /// Discord-hosted copy of the image.
    pub proxy_url: String,
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    /// File name shown for non-image attachments.
    #[serde(alias = "filename")]
    pub name: String,

    /// Discord-hosted copy of the file.
    pub proxy_url: String,

    /// Pixel width. Only images carry one.
    pub width: Option<u32>,
}

impl Attachment {
    /// Returns `true` if the attachment should be rendered inline as an image.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        self.width.is_some()
    }
}

/// The message a reply points at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferencedMessage {
    /// Author of the original message.
    pub author: Author,

    /// Text of the original message.
    pub content: String,
}

/// Parses a messages endpoint response body.
///
/// Any JSON object with a `code` field is an API error, whatever its HTTP
/// status was. Everything else must be an array of message records.
///
/// # Errors
///
/// Returns an error if the body is not JSON or if a message record lacks a
/// required field.
pub fn parse_response(json_str: &str) -> Result<Response, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json_str).context(JsonSnafu)?;

    if value.get("code").is_some() {
        return Ok(Response::Error(ApiError { payload: value }));
    }

    let messages = serde_json::from_value(value).context(RecordSnafu)?;
    Ok(Response::Messages(messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "1001",
                "author": {{ "id": "1", "username": "alice" }},
                "timestamp": "2023-01-12T14:23:01.123000+00:00",
                "content": "Hello",
                "mentions": [],
                "embeds": [],
                "attachments": []{extra}
            }}"#
        )
    }

    fn parse_messages(json: &str) -> Vec<Message> {
        match parse_response(json).unwrap() {
            Response::Messages(messages) => messages,
            Response::Error(err) => panic!("Expected messages, got error {err}"),
        }
    }

    #[test]
    fn parses_minimal_message() {
        let messages = parse_messages(&format!("[{}]", message_json("")));

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author.username, "alice");
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(
            messages[0].timestamp.to_rfc3339(),
            "2023-01-12T14:23:01.123+00:00"
        );
        assert!(messages[0].referenced_message.is_none());
    }

    #[test]
    fn parses_empty_list() {
        assert!(parse_messages("[]").is_empty());
    }

    #[test]
    fn keeps_mention_ids_as_strings() {
        let messages = parse_messages(&format!(
            "[{}]",
            message_json(r#", "mentions": [{"id": "123456789012345678", "username": "bob"}]"#)
                .replace(r#""mentions": [],"#, "")
        ));

        assert_eq!(messages[0].mentions[0].id, "123456789012345678");
        assert_eq!(messages[0].mentions[0].username, "bob");
    }

    #[test]
    fn parses_reply() {
        let messages = parse_messages(&format!(
            "[{}]",
            message_json(
                r#", "referenced_message": {
                    "author": { "username": "carol" },
                    "content": "original"
                }"#
            )
        ));

        let reply = messages[0].referenced_message.as_ref().unwrap();
        assert_eq!(reply.author.username, "carol");
        assert_eq!(reply.content, "original");
    }

    #[test]
    fn treats_null_reference_as_absent() {
        let messages = parse_messages(&format!(
            "[{}]",
            message_json(r#", "referenced_message": null"#)
        ));

        assert!(messages[0].referenced_message.is_none());
    }

    #[test]
    fn parses_partial_embeds() {
        let json = format!(
            "[{}]",
            message_json("").replace(
                r#""embeds": []"#,
                r#""embeds": [
                    {"title": "T", "url": "http://x"},
                    {"description": "d", "thumbnail": {"proxy_url": "http://p", "width": 80}},
                    {"type": "rich"}
                ]"#
            )
        );
        let messages = parse_messages(&json);
        let embeds = &messages[0].embeds;

        assert_eq!(embeds[0].title.as_deref(), Some("T"));
        assert_eq!(embeds[0].url.as_deref(), Some("http://x"));
        assert!(embeds[0].description.is_none());
        assert_eq!(embeds[1].thumbnail.as_ref().unwrap().proxy_url, "http://p");
        assert_eq!(embeds[2], Embed::default());
    }

    #[test]
    fn parses_attachments() {
        let json = format!(
            "[{}]",
            message_json("").replace(
                r#""attachments": []"#,
                r#""attachments": [
                    {"name": "a.txt", "proxy_url": "u1"},
                    {"filename": "b.png", "proxy_url": "u2", "width": 10, "height": 5},
                    {"name": "c.bin", "proxy_url": "u3", "width": null}
                ]"#
            )
        );
        let messages = parse_messages(&json);
        let attachments = &messages[0].attachments;

        assert_eq!(attachments[0].name, "a.txt");
        assert!(!attachments[0].is_image());
        assert_eq!(attachments[1].name, "b.png");
        assert!(attachments[1].is_image());
        assert!(!attachments[2].is_image());
    }

    #[test]
    fn recognizes_api_error() {
        let result = parse_response(r#"{"message": "Missing Access", "code": 50001}"#).unwrap();

        match result {
            Response::Error(err) => {
                assert_eq!(err.code(), Some(50001));
                assert!(err.to_string().contains("Missing Access"));
            }
            Response::Messages(_) => panic!("Expected API error"),
        }
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(matches!(
            parse_response("not valid json"),
            Err(ParseError::Json { .. })
        ));
    }

    #[test]
    fn returns_error_for_missing_author() {
        let json = format!(
            "[{}]",
            message_json("").replace(r#""author": { "id": "1", "username": "alice" },"#, "")
        );

        assert!(matches!(
            parse_response(&json),
            Err(ParseError::Record { .. })
        ));
    }

    #[test]
    fn returns_error_for_bad_timestamp() {
        let json = format!(
            "[{}]",
            message_json("").replace("2023-01-12T14:23:01.123000+00:00", "yesterday")
        );

        assert!(parse_response(&json).is_err());
    }

    #[test]
    fn returns_error_for_object_without_code() {
        assert!(matches!(
            parse_response(r#"{"message": "odd"}"#),
            Err(ParseError::Record { .. })
        ));
    }
}
