pub mod api;
pub mod app;
pub mod cli;
pub mod error;
pub mod feed;
pub mod models;
pub mod pager;
pub mod quiz;
pub mod session;
pub mod sse;
pub mod store;
pub mod threads;

#[cfg(test)]
mod testing;

use api::{ HttpApi, PerfApi };
use cli::{ Args, Command };
use log::info;
use std::error::Error;
use std::sync::Arc;
use store::{ FileThreadStore, ThreadStore };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Client Configuration ---");
    info!("API Base URL: {}", args.base_url);
    info!("User: {}", args.user_id);
    info!("Model: {}", args.model);
    info!("Thread State File: {}", args.state_path);
    info!("Thread Page Size: {}", args.thread_page_size);
    info!("Feed Page Size: {}", args.feed_page_size);
    info!("----------------------------");

    let api: Arc<dyn PerfApi> = Arc::new(HttpApi::new(&args.base_url)?);
    let store: Arc<dyn ThreadStore> = Arc::new(FileThreadStore::new(&args.state_path));

    match args.command.clone().unwrap_or(Command::Chat) {
        Command::Chat => app::chat(&args, api, store).await,
        Command::Threads { query, pages } => app::threads(&args, api, &query, pages).await,
        Command::History { thread_id } => app::history(&args, api, store, thread_id).await,
        Command::Feed { query, pages } => app::feed(&args, api, &query, pages).await,
        Command::FeedItem { id } => app::feed_item(api, &id).await,
        Command::GenerateFeed => app::generate_feed(api).await,
        Command::Profile => app::profile(&args, api).await,
        Command::Quiz => app::quiz(&args, api).await,
    }
}
