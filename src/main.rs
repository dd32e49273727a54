// src/main.rs

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quest::api::create_router;
use quest::attachment::ImageAttachment;
use quest::client::repl::Repl;
use quest::client::{ChatClient, ChatSession};
use quest::config::CONFIG;
use quest::http::create_shared_client;
use quest::prompt::UserProfile;
use quest::state::AppState;

#[derive(Parser)]
#[command(name = "quest", version, about = "Artifact contextualization chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "QUEST_HOST")]
        host: Option<String>,
        #[arg(short, long, env = "QUEST_PORT")]
        port: Option<u16>,
    },
    /// Interactive chat against a running server
    Chat {
        #[arg(long, env = "QUEST_SERVER", default_value = "http://localhost:3000")]
        server: String,
        /// Images to attach before the first question
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
        #[arg(long, requires = "background")]
        region: Option<String>,
        #[arg(long, requires = "region")]
        background: Option<String>,
    },
    /// Ask a single question about one or more images
    Ask {
        #[arg(long, env = "QUEST_SERVER", default_value = "http://localhost:3000")]
        server: String,
        #[arg(short, long = "image", required = true)]
        images: Vec<PathBuf>,
        #[arg(long, requires = "background")]
        region: Option<String>,
        #[arg(long, requires = "region")]
        background: Option<String>,
        /// Question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Find indexed artworks similar to an image
    Search {
        #[arg(long, env = "QUEST_SERVER", default_value = "http://localhost:3000")]
        server: String,
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&CONFIG.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { host, port } => serve(host, port).await,
        Commands::Chat {
            server,
            images,
            region,
            background,
        } => {
            let session = build_session(&images, profile(region, background)).await?;
            let client = ChatClient::new(create_shared_client(CONFIG.connect_timeout()), server);
            Repl::new(client, session)?.run().await
        }
        Commands::Ask {
            server,
            images,
            region,
            background,
            text,
        } => {
            let mut session = build_session(&images, profile(region, background)).await?;
            let client = ChatClient::new(create_shared_client(CONFIG.connect_timeout()), server);
            client
                .send(&mut session, &text.join(" "), |token| {
                    print!("{token}");
                    let _ = std::io::stdout().flush();
                })
                .await
                .context("Chat request failed")?;
            println!();
            Ok(())
        }
        Commands::Search { server, image } => {
            let attachment = ImageAttachment::from_path(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let client = ChatClient::new(create_shared_client(CONFIG.connect_timeout()), server);
            let results = client
                .search(attachment.payload())
                .await
                .context("Image search failed")?;

            if results.is_empty() {
                println!("No similar artworks found.");
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. {} ({})",
                    i + 1,
                    result.text.display_title(),
                    result.match_label()
                );
                if let Some(author) = &result.text.author {
                    println!("   {author}");
                }
            }
            Ok(())
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = CONFIG.clone();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    info!("Starting quest server");
    info!("Model: {}", config.model);
    info!("Context service: {}", config.context_url);

    let state = AppState::from_config(&config).context("Failed to initialize application state")?;
    let app = create_router(state, &config);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!("Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn profile(region: Option<String>, background: Option<String>) -> Option<UserProfile> {
    match (region, background) {
        (Some(region), Some(background)) => Some(UserProfile::new(region, background)),
        _ => None,
    }
}

async fn build_session(images: &[PathBuf], profile: Option<UserProfile>) -> Result<ChatSession> {
    let mut session = ChatSession::new();
    session.set_profile(profile);
    for path in images {
        session
            .attach_file(path)
            .await
            .with_context(|| format!("Failed to attach {}", path.display()))?;
    }
    Ok(session)
}
