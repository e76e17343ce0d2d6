use std::path::PathBuf;

use anyhow::bail;
use bon::Builder;
use clap::Parser;

use crate::command::DEFAULT_PREFIX;
use crate::guild::GuildId;
use crate::session::{SessionConfig, Tenancy};
use crate::state_machine::tally::{DEFAULT_BACKFILL_LIMIT, MAX_BACKFILL_LIMIT};
use crate::telemetry::LogFormat;

/// Runtime configuration for the `tally-bot` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env` file is loaded
/// first when present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tally-bot",
    version,
    about = "A chat bot that keeps named tallies per guild"
)]
pub struct CliArgs {
    /// JSON document holding every guild's tallies.
    ///
    /// Environment variable: `TALLY_DATA_PATH`
    #[arg(long, env = "TALLY_DATA_PATH", default_value = "./data.json")]
    pub data_path: PathBuf,

    /// Prefix that addresses the bot, e.g. `!` for `!inc 1 coffee`.
    ///
    /// Environment variable: `TALLY_PREFIX`
    #[arg(long, env = "TALLY_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Whether each guild has its own tallies or all guilds share one set.
    ///
    /// Environment variable: `TALLY_TENANCY`
    #[arg(long, env = "TALLY_TENANCY", value_enum, default_value_t = Tenancy::PerGuild)]
    pub tenancy: Tenancy,

    /// Guild used for console lines that do not name one.
    ///
    /// Environment variable: `TALLY_GUILD`
    #[arg(long, env = "TALLY_GUILD", default_value = "default")]
    pub guild: String,

    /// Most `UNKNOWN` history entries a single start or update may synthesize.
    ///
    /// Environment variable: `TALLY_BACKFILL_LIMIT`
    #[arg(long, env = "TALLY_BACKFILL_LIMIT", default_value_t = DEFAULT_BACKFILL_LIMIT)]
    pub backfill_limit: u64,

    /// Log output format.
    ///
    /// Environment variable: `TALLY_LOG_FORMAT`
    #[arg(long, env = "TALLY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Environment variable the transport credential is read from.
    ///
    /// Environment variable: `TALLY_TOKEN_VAR`
    #[arg(long, env = "TALLY_TOKEN_VAR", default_value = "TALLY_BOT_TOKEN")]
    pub token_var: String,
}

/// Validated configuration derived from [`CliArgs`].
#[derive(Debug, Clone, Builder)]
pub struct BotConfig {
    #[builder(into)]
    pub data_path: PathBuf,

    #[builder(into, default = DEFAULT_PREFIX.to_string())]
    pub prefix: String,

    #[builder(into, default = GuildId::from("default"))]
    pub default_guild: GuildId,

    #[builder(default)]
    pub session: SessionConfig,

    #[builder(default = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[builder(into, default = "TALLY_BOT_TOKEN".to_string())]
    pub token_var: String,
}

impl TryFrom<CliArgs> for BotConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.prefix.trim().is_empty() {
            bail!("prefix must not be empty");
        }
        if args.prefix.chars().any(char::is_whitespace) {
            bail!("prefix must not contain whitespace");
        }
        if args.guild.trim().is_empty() {
            bail!("guild must not be empty");
        }
        if args.backfill_limit == 0 {
            bail!("backfill_limit must be greater than zero");
        }
        if args.backfill_limit > MAX_BACKFILL_LIMIT {
            bail!(
                "backfill_limit ({}) exceeds the maximum of {}",
                args.backfill_limit,
                MAX_BACKFILL_LIMIT
            );
        }
        if args.data_path.as_os_str().is_empty() {
            bail!("data_path must not be empty");
        }

        Ok(BotConfig::builder()
            .data_path(args.data_path)
            .prefix(args.prefix)
            .default_guild(GuildId::from(args.guild))
            .session(
                SessionConfig::builder()
                    .tenancy(args.tenancy)
                    .backfill_limit(args.backfill_limit)
                    .build(),
            )
            .log_format(args.log_format)
            .token_var(args.token_var)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["tally-bot"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = BotConfig::try_from(args(&[
            "--data-path",
            "/var/lib/tally/data.json",
            "--prefix",
            "?",
            "--tenancy",
            "single",
            "--backfill-limit",
            "50",
            "--log-format",
            "json",
        ]))
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("/var/lib/tally/data.json"));
        assert_eq!(config.prefix, "?");
        assert_eq!(config.session.tenancy, Tenancy::Single);
        assert_eq!(config.session.backfill_limit, 50);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(BotConfig::try_from(args(&["--prefix", " "])).is_err());
        assert!(BotConfig::try_from(args(&["--prefix", "! "])).is_err());
        assert!(BotConfig::try_from(args(&["--backfill-limit", "0"])).is_err());
        assert!(BotConfig::try_from(args(&["--backfill-limit", "18446744073709551615"])).is_err());
        assert!(BotConfig::try_from(args(&["--backfill-limit", "10000000"])).is_ok());
        assert!(BotConfig::try_from(args(&["--guild", ""])).is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = BotConfig::builder().data_path("data.json").build();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.default_guild, GuildId::from("default"));
        assert_eq!(config.session.tenancy, Tenancy::PerGuild);
    }
}
