//! Command-line interface and process configuration.
//!
//! Every option can be given as a flag or through the environment. Boolean
//! variables accept `1`/`0`, `yes`/`no`, `on`/`off` and `true`/`false`.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::time::Duration;

/// Command-line arguments for the listing feed server.
///
/// # Examples
///
/// ```sh
/// # Defaults: listen on 0.0.0.0:1200, 5 minute cache
/// listing_feed
///
/// # Debug panel only for requests carrying ?debug=s3cret
/// DEBUG_INFO=s3cret listing_feed --listen 127.0.0.1:8080
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Socket address to listen on
    #[arg(short, long, env = "LISTEN", default_value = "0.0.0.0:1200")]
    pub listen: String,

    /// Seconds a rendered feed is served from the response cache (0 disables)
    #[arg(long, env = "CACHE_EXPIRE", default_value_t = 300)]
    pub cache_expire: u64,

    /// Maximum number of cached responses
    #[arg(long, env = "CACHE_MAX_ENTRIES", default_value_t = 256)]
    pub cache_max_entries: usize,

    /// Node name shown in the debug panel
    #[arg(long, env = "NODE_NAME")]
    pub node_name: Option<String>,

    /// Debug panel visibility: "true", "false", or a token matched against ?debug=
    #[arg(long, env = "DEBUG_INFO", default_value = "true")]
    pub debug_info: String,

    /// Serve a robots.txt that disallows all crawling
    #[arg(long, env = "DISALLOW_ROBOT", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub disallow_robot: bool,

    /// Upper bound for the `pages` query parameter
    #[arg(long, env = "MAX_PAGES", default_value_t = 10)]
    pub max_pages: u32,

    /// Per-request upstream timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 15)]
    pub request_timeout: u64,

    /// Seconds before a whole request is abandoned with 504
    #[arg(long, env = "RESPONSE_TIMEOUT", default_value_t = 30)]
    pub response_timeout: u64,

    /// Do not record request telemetry (the debug panel shows zeros)
    #[arg(long, env = "DISABLE_TELEMETRY", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub disable_telemetry: bool,

    /// User-Agent sent to upstream sources
    #[arg(
        long,
        env = "USER_AGENT",
        default_value = concat!("listing_feed/", env!("CARGO_PKG_VERSION"))
    )]
    pub user_agent: String,
}

impl Cli {
    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pages == 0 {
            return Err("--max-pages must be at least 1".to_string());
        }
        if self.request_timeout == 0 {
            return Err("--request-timeout must be at least 1 second".to_string());
        }
        if self.response_timeout == 0 {
            return Err("--response-timeout must be at least 1 second".to_string());
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_expire)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parse `args` with every environment fallback removed.
    fn parse(args: &[&str]) -> Cli {
        let cmd = Cli::command().mut_args(|a| a.env(None::<&str>));
        Cli::from_arg_matches(&cmd.get_matches_from(args)).unwrap()
    }

    /// Parse `--disable-telemetry` as if its variable held `value`.
    fn telemetry_disabled_by(value: &'static str) -> bool {
        let cmd = Cli::command().mut_arg("disable_telemetry", |a| a.env(None::<&str>).default_value(value));
        Cli::from_arg_matches(&cmd.get_matches_from(["listing_feed"]))
            .unwrap()
            .disable_telemetry
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["listing_feed"]);

        assert_eq!(cli.listen, "0.0.0.0:1200");
        assert_eq!(cli.cache_expire, 300);
        assert_eq!(cli.max_pages, 10);
        assert_eq!(cli.debug_info, "true");
        assert!(!cli.disallow_robot);
        assert!(!cli.disable_telemetry);
        assert_eq!(cli.response_timeout(), Duration::from_secs(30));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_flags() {
        let cli = parse(&[
            "listing_feed",
            "-l",
            "127.0.0.1:8080",
            "--cache-expire",
            "0",
            "--debug-info",
            "s3cret",
            "--disallow-robot",
            "--max-pages",
            "3",
            "--disable-telemetry",
        ]);

        assert_eq!(cli.listen, "127.0.0.1:8080");
        assert_eq!(cli.cache_ttl(), Duration::ZERO);
        assert_eq!(cli.debug_info, "s3cret");
        assert!(cli.disallow_robot);
        assert_eq!(cli.max_pages, 3);
        assert!(cli.disable_telemetry);
    }

    #[test]
    fn test_boolean_env_values() {
        for value in ["1", "yes", "true", "on"] {
            assert!(telemetry_disabled_by(value), "{value}");
        }
        for value in ["0", "no", "false", "off"] {
            assert!(!telemetry_disabled_by(value), "{value}");
        }
    }

    #[test]
    fn test_validate_rejects_zero_max_pages() {
        let cli = parse(&["listing_feed", "--max-pages", "0"]);
        assert!(cli.validate().is_err());
    }
}
