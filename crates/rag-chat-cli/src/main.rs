use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use rag_conversation::config::Settings;
use rag_conversation::models::chat::{AnswerResponse, ReferenceDocument};
use rag_conversation::services::conversation::ActiveConversation;
use rag_conversation::services::{AskService, ConversationManager, LlmService};
use rag_conversation::utils::{init_logger, LogTarget};

mod commands;

use commands::{format_history, parse_command, print_help, ChatCommand};

#[derive(Parser, Debug)]
#[command(
    name = "rag-chat",
    version,
    about = "Multi-turn question answering over your documents"
)]
struct Args {
    /// Settings file (defaults to RAG_CONFIG or config/settings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start in (or create) this conversation id
    #[arg(long)]
    session: Option<String>,

    /// Continue a conversation saved with `save`
    #[arg(long)]
    load: Option<PathBuf>,

    /// Number of past exchanges used as context (1-10)
    #[arg(long)]
    context_window: Option<usize>,

    /// Text file used as a reference document (repeatable)
    #[arg(long = "document")]
    documents: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // File-only logging so the prompt stays readable
    let mut logging = settings.logging.clone();
    if logging.directory.is_none() {
        logging.directory = Some("logs".to_string());
    }
    let _guard = init_logger(&logging, LogTarget::FileOnly, "rag-chat")?;

    let manager = Arc::new(ConversationManager::new(&settings.conversation));
    let mut active = ActiveConversation::start(manager.clone(), args.session.as_deref())?;

    if let Some(path) = &args.load {
        active.load(path)?;
        println!("📂 Loaded conversation from {}", path.display());
    }
    if let Some(n) = args.context_window {
        active.set_context_window(n)?;
    }

    let documents = read_documents(&args.documents)?;
    let llm = Arc::new(LlmService::new(settings.llm.clone())?);
    let ask_service = AskService::new(manager, llm);

    info!(
        "Chat started: session={}, documents={}",
        active.session_id(),
        documents.len()
    );
    print_banner(&active, documents.len())?;

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("\n❓ You: ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                let command = match parse_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match command {
                    ChatCommand::Exit => break,
                    ChatCommand::Help => print_help(),
                    ChatCommand::History => {
                        println!("\n📜 Conversation {}", active.session_id());
                        print!("{}", format_history(&active.history()?));
                    }
                    ChatCommand::Clear => {
                        let session_id = active.clear()?;
                        println!("🗑️  Conversation cleared, new session {}", session_id);
                    }
                    ChatCommand::Save(path) => match active.save(path.as_deref()) {
                        Ok(saved) => println!("💾 Saved to {}", saved.display()),
                        Err(e) => println!("❌ Save failed: {}", e),
                    },
                    ChatCommand::Load(path) => match active.load(&path) {
                        Ok(session_id) => println!("📂 Loaded conversation {}", session_id),
                        Err(e) => println!("❌ Load failed: {}", e),
                    },
                    ChatCommand::Window(n) => match active.set_context_window(n) {
                        Ok(()) => println!("🔧 Context window set to {}", n),
                        Err(e) => println!("❌ {}", e),
                    },
                    ChatCommand::Question(question) => {
                        match ask_service
                            .ask(Some(active.session_id()), &question, &documents)
                            .await
                        {
                            Ok(response) => print_answer(&response),
                            Err(e) => {
                                warn!("Question failed: {}", e);
                                println!("❌ {}", e);
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    info!("Chat ended: session={}", active.session_id());
    println!("👋 Bye");
    Ok(())
}

fn read_documents(paths: &[PathBuf]) -> Result<Vec<ReferenceDocument>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read document {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            Ok(ReferenceDocument {
                filename,
                content,
                doc_id: None,
            })
        })
        .collect()
}

fn print_banner(active: &ActiveConversation, document_count: usize) -> Result<()> {
    println!("💬 RAG chat, session {}", active.session_id());
    println!(
        "   {} reference document(s), context window {}",
        document_count,
        active.context_window()?
    );
    println!("   Type 'help' for commands, 'exit' to leave.");
    Ok(())
}

fn print_answer(response: &AnswerResponse) {
    if response.enhanced_question != response.question {
        println!("🔗 Follow-up: {}", response.enhanced_question);
    }
    println!("\n🤖 {}", response.answer);

    if !response.sources.is_empty() {
        println!("\n📚 Sources:");
        for source in &response.sources {
            println!("   - {}", source.filename);
        }
    }
}
