use clap::{Parser, Subcommand};
use tracing::debug;

use typerace::config::RaceConfig;
use typerace::relay::game::ScoreScope;
use typerace::relay::server;

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"), about = "Real-time multiplayer typing race server")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the game server
    Serve {
        /// Port to run the game server on
        #[arg(short, long)]
        port: Option<u16>,
        /// The listen address to run the game server on
        #[arg(short, long)]
        listen_address: Option<String>,
        /// Allowed CORS origin, `*` for any
        #[arg(short, long)]
        origin: Option<String>,
        /// Who receives score updates
        #[arg(long, value_enum)]
        score_scope: Option<ScoreScope>,
        /// Highest winning score a room may use
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_winning_score: Option<u32>,
    },
}

impl Commands {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut RaceConfig) {
        match self {
            Commands::Serve {
                port,
                listen_address,
                origin,
                score_scope,
                max_winning_score,
            } => {
                if let Some(port) = port {
                    config.app_port = *port;
                }
                if let Some(listen_address) = listen_address {
                    config.app_host = listen_address.clone();
                }
                if let Some(origin) = origin {
                    config.app_origin = origin.clone();
                }
                if let Some(score_scope) = score_scope {
                    config.score_scope = *score_scope;
                }
                if let Some(max_winning_score) = max_winning_score {
                    config.max_winning_score = *max_winning_score as usize;
                }
            }
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }

    /// Run the selected command. Without a subcommand the server starts with
    /// the environment configuration.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut config = RaceConfig::from_env()?;
        debug!("args: {:#?}", self);

        if let Some(command) = &self.command {
            command.apply(&mut config);
        }
        debug!("config: {:#?}", config);

        server::start_ws(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args = Args::try_parse_from([
            "typerace",
            "serve",
            "--port",
            "9000",
            "-l",
            "127.0.0.1",
            "--score-scope",
            "room",
            "--max-winning-score",
            "20",
        ])
        .unwrap();

        let mut config = RaceConfig::default();
        args.command.unwrap().apply(&mut config);

        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
        assert_eq!(config.score_scope, ScoreScope::Room);
        assert_eq!(config.max_winning_score, 20);
        assert_eq!(config.app_origin, "*");
    }

    #[test]
    fn test_no_subcommand() {
        let args = Args::try_parse_from(["typerace"]).unwrap();

        assert!(args.command.is_none());
    }

    #[test]
    fn test_rejects_zero_winning_score() {
        assert!(Args::try_parse_from(["typerace", "serve", "--max-winning-score", "0"]).is_err());
    }
}
