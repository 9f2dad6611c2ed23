use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod api;
mod app;
mod config;
mod handler;
mod session;
mod tui;
mod ui;

use api::BackendClient;
use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(about = "Terminal client for a PDF question-answering backend")]
struct Cli {
    /// Backend base URL (overrides PDFQA_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the uploaded documents
    List,
    /// Upload a PDF and print its document id
    Upload {
        /// Path to a .pdf file
        path: PathBuf,
    },
    /// Ask a question about an uploaded document
    Ask {
        /// Document id from `upload` or `list`
        file_id: String,
        /// Your question
        question: String,
    },
    /// Delete an uploaded document
    Delete {
        /// Document id to delete
        file_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let client = BackendClient::new(&config.resolve_api_url(cli.api_url.clone()));

    match cli.command {
        None => run_tui(client).await?,
        Some(Commands::List) => list_documents(&client).await?,
        Some(Commands::Upload { path }) => upload_document(&client, &path).await?,
        Some(Commands::Ask { file_id, question }) => {
            ask_question(&client, &file_id, &question).await?
        }
        Some(Commands::Delete { file_id }) => delete_document(&client, &file_id).await?,
    }

    Ok(())
}

async fn run_tui(client: BackendClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(client);

    let result = run_event_loop(&mut terminal, &mut app).await;
    tui::restore()?;
    result
}

async fn run_event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        }
    }

    Ok(())
}

async fn list_documents(client: &BackendClient) -> Result<()> {
    let documents = client.list_files().await?;

    if documents.is_empty() {
        println!("{}", "No documents uploaded yet".yellow());
        return Ok(());
    }

    println!("\n{}", "📚 Uploaded documents".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    for doc in &documents {
        let date = doc.upload_date.as_deref().unwrap_or("-");
        println!("  • {}  {}  {}", doc.name.bold(), doc.id.green(), date.dimmed());
    }

    println!("\n{} document(s)", documents.len().to_string().bold());
    Ok(())
}

async fn upload_document(client: &BackendClient, path: &Path) -> Result<()> {
    if let Err(message) = app::validate_upload(path) {
        anyhow::bail!(message);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    println!("📤 Uploading {}...", file_name.bold().cyan());
    let bytes = tokio::fs::read(path).await?;

    match client.upload(&file_name, bytes).await {
        Ok(id) => {
            println!("{}", "PDF uploaded successfully".green());
            println!("Document id: {}", id.bold());
        }
        Err(e) => {
            println!("{}: {}", "Upload failed".red(), e);
        }
    }

    Ok(())
}

async fn ask_question(client: &BackendClient, file_id: &str, question: &str) -> Result<()> {
    println!("🤖 Asking about document {}...\n", file_id.bold().magenta());

    match client.ask(file_id, question).await {
        Ok(answer) => {
            println!("{}", "Answer:".bold().green());
            println!("{}", answer);
        }
        Err(e) => {
            println!("{}: {}", "Error fetching the answer".red(), e);
            println!("Check that the backend is running and the document id exists");
        }
    }

    Ok(())
}

async fn delete_document(client: &BackendClient, file_id: &str) -> Result<()> {
    match client.delete_file(file_id).await {
        Ok(()) => println!("{}", "File deleted successfully".green()),
        Err(e) => println!("{}: {}", "Delete failed".red(), e),
    }
    Ok(())
}
