use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_ORIGINS: [&str; 3] = [
    "http://localhost:4000",
    "http://127.0.0.1:4000",
    "https://rithideandseek.ninjacheetah.dev",
];

pub const DEFAULT_BANNER: &str = "You've reached api.rithideandseek.ninjacheetah.dev. no snooping!";

/// Card deck backend for hide and seek hiders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    // https://github.com/clap-rs/clap/issues/3857#issuecomment-1239419407
    #[clap(flatten)]
    pub run: RunArgs,
}

/// Actions
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the API server
    Run(RunArgs),

    /// Load a card catalog and validate it. Echoes the catalog entries back.
    ValidateCatalog {
        /// Path to the card catalog
        path: PathBuf,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Address to listen on
    #[arg(long, env, default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Path to the JSON document holding every player's deck and hand
    #[arg(long, env, default_value = "players.json")]
    pub players_file: PathBuf,

    /// Path to the card catalog used to build fresh decks
    #[arg(long, env, default_value = "cards.json")]
    pub cards_file: PathBuf,

    /// Origin allowed to call the API from a browser. Can be repeated.
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGIN", value_delimiter = ',', default_values = DEFAULT_ORIGINS)]
    pub allowed_origins: Vec<String>,

    /// Text returned from `/`
    #[arg(long, env, default_value = DEFAULT_BANNER)]
    pub banner: String,
}

impl Cli {
    /// The command to execute, falling back to `run` with the top level arguments.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_run() {
        let cli = Cli::try_parse_from(["hider-deck", "--players-file", "/tmp/p.json"]).unwrap();
        match cli.into_command() {
            Command::Run(args) => {
                assert_eq!(args.players_file, PathBuf::from("/tmp/p.json"));
                assert_eq!(args.cards_file, PathBuf::from("cards.json"));
                assert_eq!(args.allowed_origins.len(), DEFAULT_ORIGINS.len());
                assert_eq!(
                    args.banner,
                    "You've reached api.rithideandseek.ninjacheetah.dev. no snooping!"
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_validate_catalog() {
        let cli = Cli::try_parse_from(["hider-deck", "validate-catalog", "cards.json"]).unwrap();
        assert!(matches!(
            cli.into_command(),
            Command::ValidateCatalog { path } if path == PathBuf::from("cards.json")
        ));
    }

    #[test]
    fn repeats_allowed_origins() {
        let cli = Cli::try_parse_from([
            "hider-deck",
            "run",
            "--allowed-origin",
            "http://a.test",
            "--allowed-origin",
            "http://b.test,http://c.test",
        ])
        .unwrap();
        match cli.into_command() {
            Command::Run(args) => assert_eq!(
                args.allowed_origins,
                vec!["http://a.test", "http://b.test", "http://c.test"]
            ),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
