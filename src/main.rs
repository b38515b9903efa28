mod api;
mod card;
mod cli;
mod player;
mod storage;
mod utils;

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use card::Catalog;
use cli::{Cli, Command, RunArgs};
use player::PlayerStore;
use storage::JsonFileStore;

async fn run(args: RunArgs) -> anyhow::Result<()> {
    log::info!("Loading card catalog from {:?}...", args.cards_file);
    let catalog = Catalog::from_json_file(&args.cards_file)?;

    let storage = JsonFileStore::new(args.players_file.clone());
    log::info!("Keeping player decks in {:?}", storage.path());

    let players = PlayerStore::new(storage, catalog);
    log::info!(
        "Fresh decks hold {} cards",
        players.catalog().deck_size()
    );

    let state = api::AppState::new(players, args.banner);
    let app = api::router(state, api::cors_layer(args.allowed_origins.as_slice())?);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("error binding to {}", args.listen))?;
    log::info!("Listening on http://{}", args.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    log::info!("Received shutdown signal");
}

fn validate_catalog(path: &Path) -> anyhow::Result<()> {
    let catalog = Catalog::from_json_file(path)?;
    log::info!(
        "{:?} holds {} card types making a deck of {}",
        path,
        catalog.entries().len(),
        catalog.deck_size()
    );
    println!("{}", serde_json::to_string_pretty(catalog.entries())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    match Cli::parse().into_command() {
        Command::Run(args) => run(args).await,
        Command::ValidateCatalog { path } => validate_catalog(&path),
    }
}
