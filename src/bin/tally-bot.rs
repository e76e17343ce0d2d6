//! Console transport: each stdin line is a chat message, each reply goes to stdout.
//!
//! ```text
//! !inc 1 coffee              message in the default guild
//! 1234 !check_tally coffee   message in guild 1234
//! join 1234                  the bot joined guild 1234
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tally_bot::config::{BotConfig, CliArgs};
use tally_bot::secret::{EnvSecretProvider, SecretProvider};
use tally_bot::{CommandParser, GuildId, JsonFileStore, Renderer, SessionCoordinator, telemetry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Eq)]
enum ConsoleLine<'a> {
    Join(GuildId),
    Message { guild: GuildId, text: &'a str },
    Ignored,
}

fn classify<'a>(line: &'a str, prefix: &str, default_guild: &GuildId) -> ConsoleLine<'a> {
    let line = line.trim();
    if line.starts_with(prefix) {
        return ConsoleLine::Message {
            guild: default_guild.clone(),
            text: line,
        };
    }

    let Some((head, rest)) = line.split_once(char::is_whitespace) else {
        return ConsoleLine::Ignored;
    };
    let rest = rest.trim_start();
    match head {
        "join" if !rest.is_empty() => ConsoleLine::Join(GuildId::from(rest)),
        guild if rest.starts_with(prefix) => ConsoleLine::Message {
            guild: GuildId::from(guild),
            text: rest,
        },
        _ => ConsoleLine::Ignored,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = BotConfig::try_from(args)?;
    telemetry::init(config.log_format);

    match EnvSecretProvider::new(&config.token_var).fetch() {
        Ok(token) => debug!(
            var = %config.token_var,
            %token,
            length = token.expose().len(),
            "Transport credential loaded"
        ),
        Err(e) => warn!(error = %e, "No transport credential, running on the console only"),
    }

    let store = JsonFileStore::new(&config.data_path);
    let coordinator = Arc::new(SessionCoordinator::new(store, config.session.clone()));
    let parser = CommandParser::new(config.prefix.as_str());
    let renderer = Renderer::new(config.prefix.as_str());

    coordinator.register_guild(&config.default_guild)?;

    info!(
        data_path = %config.data_path.display(),
        prefix = %config.prefix,
        guild = %config.default_guild,
        tenancy = ?config.session.tenancy,
        "Logged in, ready for commands"
    );

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next() => match line {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
                None => break,
            },
        };

        match classify(&line, parser.prefix(), &config.default_guild) {
            ConsoleLine::Ignored => {}
            ConsoleLine::Join(guild) => {
                if let Err(e) = coordinator.register_guild(&guild) {
                    warn!(error = %e, guild = %guild, "Failed to register guild");
                }
            }
            ConsoleLine::Message { guild, text } => {
                let reply = match parser.parse(text) {
                    Ok(None) => continue,
                    Ok(Some(command)) => {
                        let kind = command.kind();
                        match Arc::clone(&coordinator).dispatch(guild, command).await {
                            Ok(outcome) => renderer.outcome(kind, &outcome),
                            Err(e) => renderer.session_error(&e),
                        }
                    }
                    Err(e) => renderer.parse_error(&e),
                };
                println!("{reply}");
            }
        }
    }

    info!("Shutting down, waiting for in-flight saves");
    Arc::clone(&coordinator).drain_async().await?;
    info!("Tallies flushed, goodbye");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_console_lines() {
        let default = GuildId::from("default");

        assert_eq!(
            classify("!inc 1 coffee", "!", &default),
            ConsoleLine::Message {
                guild: default.clone(),
                text: "!inc 1 coffee"
            }
        );
        assert_eq!(
            classify("1234  !check_tally coffee", "!", &default),
            ConsoleLine::Message {
                guild: GuildId::from(1234u64),
                text: "!check_tally coffee"
            }
        );
        assert_eq!(
            classify("join 1234", "!", &default),
            ConsoleLine::Join(GuildId::from("1234"))
        );
        assert_eq!(classify("hello there", "!", &default), ConsoleLine::Ignored);
        assert_eq!(classify("", "!", &default), ConsoleLine::Ignored);
    }
}
