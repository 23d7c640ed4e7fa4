// SPDX-License-Identifier: GPL-3.0-only

//! Message link resolution and the Discord REST fetch.
//!
//! A message link (`https://discord.com/channels/<guild>/<channel>/<message>`)
//! is resolved into its identifiers, and [`Client`] issues the single
//! authenticated `GET /channels/{channel}/messages` request for the window of
//! messages around, before, or after that message.

use log::debug;
use reqwest::header::AUTHORIZATION;
use snafu::prelude::*;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Base URL of the Discord REST API.
pub const DEFAULT_API_BASE: &str = "https://discordapp.com/api/v9";

/// Environment variable holding the user token sent as `Authorization`.
pub const TOKEN_VAR: &str = "DISCORD_USER_TOKEN";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for message link parsing.
#[derive(Debug, Snafu)]
pub enum LinkError {
    /// The input is not a URL at all.
    #[snafu(display("invalid message URL {input:?}: {source}"))]
    Url {
        /// The rejected input.
        input: String,
        /// The underlying URL parsing error.
        source: url::ParseError,
    },

    /// The URL path does not name a guild, channel, and message.
    #[snafu(display("message URL {input:?} must look like /channels/<guild>/<channel>/<message>"))]
    Segments {
        /// The rejected input.
        input: String,
    },
}

/// Error returned when a context mode is not one of the known names.
#[derive(Debug, Snafu)]
#[snafu(display("context must be one of around, after, before (got {value:?})"))]
pub struct UnknownContextError {
    value: String,
}

/// Error type for the HTTP fetch.
#[derive(Debug, Snafu)]
pub enum ClientError {
    /// The token environment variable is unset or not Unicode.
    #[snafu(display("environment variable DISCORD_USER_TOKEN is required: {source}"))]
    MissingToken {
        /// The underlying lookup error.
        source: std::env::VarError,
    },

    /// The HTTP client could not be constructed.
    #[snafu(display("failed to build HTTP client: {source}"))]
    Build {
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The request URL could not be assembled from the API base.
    #[snafu(display("invalid API base {base:?}: {source}"))]
    RequestUrl {
        /// The configured API base.
        base: String,
        /// The underlying URL parsing error.
        source: url::ParseError,
    },

    /// The request failed before a response arrived.
    #[snafu(display("request to {url} failed: {source}"))]
    Request {
        /// The requested URL.
        url: Url,
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The response body could not be read.
    #[snafu(display("failed to read response from {url}: {source}"))]
    Body {
        /// The requested URL.
        url: Url,
        /// The underlying reqwest error.
        source: reqwest::Error,
    },
}

/// Which side of the anchor message the fetched window lies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextMode {
    /// Messages on both sides of the anchor, the anchor included.
    #[default]
    Around,
    /// Messages newer than the anchor.
    After,
    /// Messages older than the anchor.
    Before,
}

impl ContextMode {
    /// The query parameter name for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Around => "around",
            Self::After => "after",
            Self::Before => "before",
        }
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextMode {
    type Err = UnknownContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "around" => Ok(Self::Around),
            "after" => Ok(Self::After),
            "before" => Ok(Self::Before),
            _ => UnknownContextSnafu { value: s }.fail(),
        }
    }
}

/// Identifiers taken from a Discord message link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    /// Guild (server) id, or `@me` for direct messages.
    pub guild_id: String,
    /// Channel id.
    pub channel_id: String,
    /// Anchor message id.
    pub message_id: String,
}

impl MessageLink {
    /// Parses a message link of the form
    /// `https://discord.com/channels/<guild>/<channel>/<message>`.
    ///
    /// The host and the first path segment are not checked, so links from
    /// `canary.discord.com` or `discordapp.com` work too.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is not a URL or its path does not have
    /// exactly four segments.
    ///
    /// # Example
    ///
    /// ```
    /// use discord_export::client::MessageLink;
    ///
    /// let link = MessageLink::parse("https://discord.com/channels/1/22/333").unwrap();
    /// assert_eq!(link.channel_id, "22");
    /// assert_eq!(link.message_id, "333");
    /// ```
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let url = Url::parse(input).context(UrlSnafu { input })?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let [_, guild, channel, message] = segments.as_slice() else {
            return SegmentsSnafu { input }.fail();
        };

        Ok(Self {
            guild_id: (*guild).to_owned(),
            channel_id: (*channel).to_owned(),
            message_id: (*message).to_owned(),
        })
    }
}

/// Builds the messages endpoint URL for `link`.
///
/// # Errors
///
/// Returns an error if `api_base` is not a valid URL.
pub fn messages_url(
    api_base: &str,
    link: &MessageLink,
    context: ContextMode,
    limit: u8,
) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!(
            "{}/channels/{}/messages",
            api_base.trim_end_matches('/'),
            link.channel_id
        ),
        [
            ("limit", limit.to_string().as_str()),
            (context.as_str(), link.message_id.as_str()),
        ],
    )
}

/// A blocking Discord REST client authenticated with a user token.
pub struct Client {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl Client {
    /// Creates a client for the public API using the token from
    /// [`TOKEN_VAR`].
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or the HTTP client cannot
    /// be built.
    pub fn from_env() -> Result<Self, ClientError> {
        let token = std::env::var(TOKEN_VAR).context(MissingTokenSnafu)?;
        Self::new(DEFAULT_API_BASE, token)
    }

    /// Creates a client against `api_base` with an explicit token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(BuildSnafu)?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            token: token.into(),
        })
    }

    /// Fetches up to `limit` messages relative to the linked message and
    /// returns the raw response body.
    ///
    /// The body is returned whatever the HTTP status, since Discord reports
    /// failures as JSON objects that [`crate::parser::parse_response`]
    /// recognizes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the body cannot be
    /// read.
    pub fn fetch_messages(
        &self,
        link: &MessageLink,
        context: ContextMode,
        limit: u8,
    ) -> Result<String, ClientError> {
        let url = messages_url(&self.api_base, link, context, limit).context(RequestUrlSnafu {
            base: self.api_base.as_str(),
        })?;

        debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, self.token.as_str())
            .send()
            .context(RequestSnafu { url: url.clone() })?;
        debug!("{url} answered {}", response.status());

        response.text().context(BodySnafu { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_link() {
        let link =
            MessageLink::parse("https://discord.com/channels/111/222/333").unwrap();

        assert_eq!(
            link,
            MessageLink {
                guild_id: "111".into(),
                channel_id: "222".into(),
                message_id: "333".into(),
            }
        );
    }

    #[test]
    fn parses_link_with_trailing_slash_and_dm_guild() {
        let link = MessageLink::parse("https://discord.com/channels/@me/222/333/").unwrap();

        assert_eq!(link.guild_id, "@me");
        assert_eq!(link.channel_id, "222");
        assert_eq!(link.message_id, "333");
    }

    #[test]
    fn rejects_link_with_too_few_segments() {
        assert!(matches!(
            MessageLink::parse("https://discord.com/channels/111/222"),
            Err(LinkError::Segments { .. })
        ));
    }

    #[test]
    fn rejects_link_with_too_many_segments() {
        assert!(matches!(
            MessageLink::parse("https://discord.com/channels/111/222/333/444"),
            Err(LinkError::Segments { .. })
        ));
    }

    #[test]
    fn rejects_non_url() {
        assert!(matches!(
            MessageLink::parse("channels/111/222/333"),
            Err(LinkError::Url { .. })
        ));
    }

    #[test]
    fn parses_context_modes() {
        assert_eq!("around".parse::<ContextMode>().unwrap(), ContextMode::Around);
        assert_eq!("after".parse::<ContextMode>().unwrap(), ContextMode::After);
        assert_eq!("before".parse::<ContextMode>().unwrap(), ContextMode::Before);
        assert!("sideways".parse::<ContextMode>().is_err());
        assert_eq!(ContextMode::default(), ContextMode::Around);
    }

    #[test]
    fn builds_messages_url() {
        let link = MessageLink::parse("https://discord.com/channels/111/222/333").unwrap();
        let url = messages_url(DEFAULT_API_BASE, &link, ContextMode::Around, 11).unwrap();

        assert_eq!(
            url.as_str(),
            "https://discordapp.com/api/v9/channels/222/messages?limit=11&around=333"
        );
    }

    #[test]
    fn builds_messages_url_for_before_with_trailing_slash_base() {
        let link = MessageLink::parse("https://discord.com/channels/111/222/333").unwrap();
        let url =
            messages_url("http://localhost:8080/api/", &link, ContextMode::Before, 100).unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/channels/222/messages?limit=100&before=333"
        );
    }
}
