mod cli;
mod controller;
mod error;
mod generation;
mod model;
mod pipeline;
mod render;
mod server;
mod session;
mod store;
mod terminal;
mod util;
mod views;

use std::sync::Arc;

use clap::Parser;
use cli::CliArgs;
use controller::Controller;
use error::Result;
use generation::GeminiClient;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the configurator itself; logs stay on stderr.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: CliArgs) -> Result<()> {
    let session_config = args.session_config();
    let session = session::HttpSession::new(&session_config)?;

    let client = GeminiClient::new(session, &args.text_model, &args.image_model);
    let controller = Controller::new(client, args.config()?);

    if args.serve {
        server::run_web_server(&args, Arc::new(controller)).await
    } else if args.once {
        terminal::run_once(&controller, args.image_dir.as_deref(), args.json).await
    } else {
        terminal::run_interactive(&controller, args.image_dir.as_deref()).await
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = CliArgs::parse();

    if let Err(error) = run(args).await {
        tracing::error!("{error:?}");
        std::process::exit(1);
    }
}
