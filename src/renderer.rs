// SPDX-License-Identifier: GPL-3.0-only

//! Markdown rendering for parsed Discord messages.
//!
//! This module turns the message records from [`crate::parser`] into a
//! Markdown transcript. Each message becomes a list item headed by its
//! author and timestamp, with the body indented beneath it and replies,
//! embeds, and attachments rendered as quoted or linked blocks.
//!
//! # Output Format
//!
//! ```text
//! [» Open Thread in Discord](https://discord.com/channels/1/2/3)
//!
//! - **alice** (Thu Jan 12 14:23:01 2023):
//!     > r @bob: what do you think?
//!
//!     Looks good to me @bob
//!
//!     > [**Release notes**](https://example.com/notes)
//!
//!    ![](https://media.discordapp.net/attachments/1/2/shot.png)
//! ```
//!
//! # Example
//!
//! ```
//! use discord_export::renderer::{indent, resolve_mentions};
//! use std::collections::HashMap;
//!
//! let mentions = HashMap::from([("42".to_owned(), "alice".to_owned())]);
//! let body = resolve_mentions("hello <@42> and <@99>", &mentions);
//!
//! assert_eq!(body, "hello @alice and <@99>");
//! assert_eq!(indent("a\nb", "  "), "  a\n  b");
//! ```

use crate::parser::{Attachment, Embed, Message, ReferencedMessage};
use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Indentation of message bodies under their list item.
const BODY_PREFIX: &str = "    ";

/// Prefix of every quoted line (replies and embeds).
const QUOTE_PREFIX: &str = "    > ";

/// Empty quoted line separating parts of an embed.
const QUOTE_SEPARATOR: &str = "    >";

const ATTACHMENT_PREFIX: &str = "   ";

/// Maximum length of a reply preview, placeholder included.
const REPLY_WIDTH: usize = 32;

const PLACEHOLDER: &str = "...";

/// U+2028, which many Markdown viewers treat as a hard line break.
const LINE_SEPARATOR: char = '\u{2028}';

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@(\d+)>").expect("mention regex pattern is valid"));

/// Backslash-escapes `[` and `]` so text cannot form Markdown links.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Removes every U+2028 line separator.
#[must_use]
pub fn scrub(text: &str) -> String {
    text.replace(LINE_SEPARATOR, "")
}

/// Prefixes every line of `text` with `prefix`.
///
/// Empty text stays empty rather than becoming a lone prefix.
#[must_use]
pub fn indent(text: &str, prefix: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    text.split('\n')
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces `<@id>` tokens with `@username` using `mentions` (id to name).
///
/// Tokens whose id is not in the table are left untouched.
#[must_use]
pub fn resolve_mentions(text: &str, mentions: &HashMap<String, String>) -> String {
    MENTION_RE
        .replace_all(text, |caps: &Captures<'_>| {
            mentions
                .get(&caps[1])
                .map_or_else(|| caps[0].to_owned(), |name| format!("@{name}"))
        })
        .into_owned()
}

/// Builds the id-to-username table from a message's own mention list.
fn mention_table(message: &Message) -> HashMap<String, String> {
    message
        .mentions
        .iter()
        .map(|m| (m.id.clone(), m.username.clone()))
        .collect()
}

/// Formats a timestamp like C's `%c`, e.g. `Thu Jan 12 14:23:01 2023`.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%c").to_string()
}

/// Renders one embed as blockquoted lines.
///
/// Returns an empty string for an embed with no title, URL, non-blank
/// description, or thumbnail.
#[must_use]
pub fn render_embed(embed: &Embed) -> String {
    let mut lines = Vec::new();

    match (&embed.title, &embed.url) {
        (Some(title), Some(url)) => {
            lines.push(format!("{QUOTE_PREFIX}[**{}**]({url})", escape(title)));
        }
        (Some(title), None) => lines.push(format!("{QUOTE_PREFIX}**{}**", escape(title))),
        (None, Some(url)) => lines.push(format!("{QUOTE_PREFIX}<{url}>")),
        (None, None) => {}
    }

    if let Some(description) = embed
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        if !lines.is_empty() {
            lines.push(QUOTE_SEPARATOR.to_owned());
        }
        lines.push(indent(&escape(&scrub(description)), QUOTE_PREFIX));
    }

    if let Some(thumbnail) = &embed.thumbnail {
        lines.push(QUOTE_SEPARATOR.to_owned());
        lines.push(format!("{QUOTE_PREFIX}![]({})", thumbnail.proxy_url));
    }

    lines.join("\n")
}

/// Renders a message's embeds, set off from the body by blank lines.
#[must_use]
pub fn render_embeds(embeds: &[Embed]) -> String {
    if embeds.is_empty() {
        return String::new();
    }
    let fragments: Vec<String> = embeds.iter().map(render_embed).collect();
    format!("\n{}\n", fragments.join("\n\n"))
}

/// Renders attachments as image embeds or named links, one per line.
///
/// A non-empty list ends with a newline so the next message is spaced out.
#[must_use]
pub fn render_attachments(attachments: &[Attachment]) -> String {
    let mut lines: Vec<String> = attachments
        .iter()
        .map(|a| {
            if a.is_image() {
                format!("{ATTACHMENT_PREFIX}![]({})", a.proxy_url)
            } else {
                format!("{ATTACHMENT_PREFIX}[{}]({})", a.name, a.proxy_url)
            }
        })
        .collect();

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Collapses whitespace and truncates `text` at a word boundary so the
/// result, placeholder included, is at most `width` characters.
///
/// If not even the first word fits, only the placeholder is returned.
fn shorten(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(PLACEHOLDER.len());
    let mut out = String::new();
    let mut len = 0;
    for word in words {
        let word_len = word.chars().count();
        let needed = if out.is_empty() {
            word_len
        } else {
            len + 1 + word_len
        };
        if needed > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        len = needed;
    }
    out.push_str(PLACEHOLDER);
    out
}

/// Renders the quoted preview line of a reply, followed by a newline.
fn render_reply(original: &ReferencedMessage) -> String {
    format!(
        "{QUOTE_PREFIX}r @{}: {}\n",
        original.author.username,
        shorten(&scrub(&original.content), REPLY_WIDTH)
    )
}

/// Renders one message as a Markdown list item.
///
/// The item is the header line, the reply preview (or an empty line), the
/// indented body, the embed block, and the attachment block, joined by
/// newlines. Mention tokens in the body resolve against this message's own
/// mention list. The body is scrubbed but not bracket-escaped.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let mentions = mention_table(message);

    let header = format!(
        "- **{}** ({}): ",
        message.author.username,
        format_timestamp(&message.timestamp)
    );
    let reply = message
        .referenced_message
        .as_ref()
        .map(render_reply)
        .unwrap_or_default();
    let body = indent(
        &scrub(&resolve_mentions(&message.content, &mentions)),
        BODY_PREFIX,
    );

    [
        header,
        reply,
        body,
        render_embeds(&message.embeds),
        render_attachments(&message.attachments),
    ]
    .join("\n")
}

/// Renders a complete transcript.
///
/// `messages` are taken in the order the API returned them and are
/// reversed once, so the transcript reads oldest to newest. The first line
/// links back to `source_url`.
///
/// # Arguments
///
/// * `messages` - The messages as returned by the API
/// * `source_url` - The message link the export was started from
#[must_use]
pub fn render_transcript(messages: &[Message], source_url: &str) -> String {
    let rendered: Vec<String> = messages.iter().rev().map(render_message).collect();
    format!(
        "[» Open Thread in Discord]({source_url})\n\n{}",
        rendered.join("\n")
    )
}
