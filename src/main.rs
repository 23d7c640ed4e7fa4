// SPDX-License-Identifier: GPL-3.0-only

//! Command-line interface for discord-export.
//!
//! This binary provides the `discord-export` command, which prints the
//! messages surrounding a Discord message link as a Markdown transcript.

use discord_export::client::{self, Client, ContextMode, MessageLink};
use discord_export::parser::{self, ApiError, Response};
use discord_export::renderer;
use lexopt::prelude::*;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_LIMIT: u8 = 11;
const MAX_LIMIT: u8 = 100;

/// Exit status used when the API answers with an error payload.
const API_ERROR_EXIT: u8 = 127;

/// Where to write the rendered transcript.
enum OutputTarget {
    /// Write to the specified file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

struct Cli {
    url: String,
    context: ContextMode,
    limit: u8,
    input: Option<PathBuf>,
    output: OutputTarget,
    log_level: LevelFilter,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to set up logging: {source}"))]
    Logger { source: log::SetLoggerError },

    #[snafu(display("{source}"))]
    InvalidLink { source: client::LinkError },

    #[snafu(display("{source}"))]
    Client { source: client::ClientError },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{source}"))]
    Parse { source: parser::ParseError },

    #[snafu(display("Discord API returned an error: {payload}"))]
    Api { payload: ApiError },

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    const fn is_usage(&self) -> bool {
        matches!(self, Self::ParseArgs { .. })
    }

    const fn exit_code(&self) -> u8 {
        match self {
            Self::ParseArgs { .. } => 2,
            Self::Api { .. } => API_ERROR_EXIT,
            _ => 1,
        }
    }
}

fn print_help() {
    println!(
        "\
{name} {version}
Export Discord messages around a message link as Markdown

Usage: {name} [OPTIONS] <URL>

Arguments:
  <URL>  Discord message link (https://discord.com/channels/<guild>/<channel>/<message>)

Options:
      --context <MODE>  Fetch messages around, after, or before the linked one (default: around)
      --limit <N>       Number of messages to export, 1-{max} (default: {limit})
  -i, --input <FILE>    Render a saved API response instead of fetching
  -o, --output <FILE>   Write the transcript to FILE (default: - for stdout)

Other options:
  -v, --verbose         Log requests and progress to stderr
  -q, --quiet           Only log errors
  -h, --help            Print help
  -V, --version         Print version

Environment:
  {token}    User token sent with the request (required unless --input is given)",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        max = MAX_LIMIT,
        limit = DEFAULT_LIMIT,
        token = client::TOKEN_VAR,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args_os().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut url: Option<String> = None;
    let mut context = ContextMode::default();
    let mut limit = DEFAULT_LIMIT;
    let mut input = None;
    let mut output = OutputTarget::Stdout;
    let mut log_level = LevelFilter::Warn;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("context") => context = parser.value()?.parse()?,
            Long("limit") => {
                let val: u32 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "limit must be a number 1-100")?;
                if !(1..=u32::from(MAX_LIMIT)).contains(&val) {
                    return Err("limit must be 1-100".into());
                }
                limit = u8::try_from(val).map_err(|_| "limit must be 1-100")?;
            }
            Short('i') | Long("input") => input = Some(parser.value()?.parse()?),
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::File(val)
                };
            }
            // Last one wins
            Short('v') | Long("verbose") => log_level = LevelFilter::Debug,
            Short('q') | Long("quiet") => log_level = LevelFilter::Error,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if url.is_none() => url = Some(val.string()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        url: url.ok_or("missing required argument: <URL>")?,
        context,
        limit,
        input,
        output,
        log_level,
    })
}

fn init_logging(level: LevelFilter) -> Result<(), Error> {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).context(LoggerSnafu)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_usage() {
                eprintln!(
                    "Run '{} --help' for more information.",
                    env!("CARGO_PKG_NAME")
                );
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_logging(cli.log_level)?;

    let link = MessageLink::parse(&cli.url).context(InvalidLinkSnafu)?;

    let body = match &cli.input {
        Some(path) => {
            info!("reading saved response from {}", path.display());
            std::fs::read_to_string(path).context(ReadInputSnafu { path })?
        }
        None => {
            let client = Client::from_env().context(ClientSnafu)?;
            info!(
                "fetching {} messages {} {} in channel {}",
                cli.limit, cli.context, link.message_id, link.channel_id
            );
            client
                .fetch_messages(&link, cli.context, cli.limit)
                .context(ClientSnafu)?
        }
    };

    let messages = match parser::parse_response(&body).context(ParseSnafu)? {
        Response::Messages(messages) => messages,
        Response::Error(payload) => return ApiSnafu { payload }.fail(),
    };
    info!("rendering {} messages", messages.len());

    let transcript = renderer::render_transcript(&messages, &cli.url);
    write_output(&cli.output, &transcript)
}

/// Writes the finished transcript, followed by a newline.
fn write_output(target: &OutputTarget, transcript: &str) -> Result<(), Error> {
    match target {
        OutputTarget::Stdout => println!("{transcript}"),
        OutputTarget::File(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).context(CreateOutputDirSnafu)?;
            }
            std::fs::write(path, format!("{transcript}\n")).context(WriteOutputSnafu { path })?;
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}
