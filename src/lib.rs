// SPDX-License-Identifier: GPL-3.0-only

//! Export a window of Discord channel messages as a Markdown transcript.
//!
//! This crate fetches the messages around a Discord message link and renders
//! them as a readable Markdown document, with mentions resolved to names and
//! replies, embeds, and attachments laid out beneath each message.
//!
//! # Overview
//!
//! 1. [`client`] resolves the message link and performs the REST request
//! 2. [`parser`] turns the response body into typed messages or an API error
//! 3. [`renderer`] produces the Markdown transcript, oldest message first
//!
//! # Example
//!
//! ```no_run
//! use discord_export::client::{Client, ContextMode, MessageLink};
//! use discord_export::parser::{self, Response};
//! use discord_export::renderer;
//!
//! let url = "https://discord.com/channels/111/222/333";
//! let link = MessageLink::parse(url).unwrap();
//! let client = Client::from_env().unwrap();
//!
//! let body = client.fetch_messages(&link, ContextMode::Around, 11).unwrap();
//! if let Response::Messages(messages) = parser::parse_response(&body).unwrap() {
//!     println!("{}", renderer::render_transcript(&messages, url));
//! }
//! ```
//!
//! # Modules
//!
//! - [`client`]: message link parsing and the authenticated HTTP fetch
//! - [`parser`]: JSON parsing and type definitions for message responses
//! - [`renderer`]: Markdown generation for messages and transcripts

#![deny(missing_docs)]

pub mod client;
pub mod parser;
pub mod renderer;
