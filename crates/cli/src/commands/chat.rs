//! `jobsuite chat`: Interactive or single-message chat mode.

use super::runtime::Runtime;
use jobsuite_agent::Outcome;
use jobsuite_config::AppConfig;
use jobsuite_core::session::SessionId;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.decision.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    JOBSUITE_API_KEY   (generic)");
        eprintln!("    OPENAI_API_KEY     (OpenAI)");
        eprintln!("    GOOGLE_API_KEY     (Gemini, with provider = \"gemini\")");
        eprintln!();
        eprintln!("  Or add api_key to {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let runtime = Runtime::open(config).await?;
    let indexed = runtime.index.count().await?;
    let chat = runtime.chat_service();
    let session_id = session.map(|s| SessionId::from(&s)).unwrap_or_default();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = chat.query(&session_id, &msg).await;
        eprint!("\r              \r");
        println!("{}", response.text);
        if response.outcome == Outcome::Failed {
            return Err("query failed".into());
        }
        return Ok(());
    }

    println!();
    println!("  jobsuite: Interactive Mode");
    println!();
    println!("  Provider:  {}", runtime.config.decision.provider);
    println!("  Model:     {}", runtime.config.decision.model);
    println!("  Tools:     query_structured, search_semantic");
    println!("  Index:     {indexed} job descriptions");
    println!("  Session:   {session_id}");
    if indexed == 0 {
        println!();
        println!("  The index is empty. Run `jobsuite sync` for semantic search results.");
    }
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let sessions = chat.sessions().clone();
    let eviction = tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            sessions.evict_idle().await;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt == "exit" || prompt == "quit" {
            break;
        }

        eprint!("  ...");
        let response = chat.query(&session_id, prompt).await;
        eprint!("\r     \r");
        println!();
        let prefix = match response.outcome {
            Outcome::Answered => "  Assistant > ",
            Outcome::BudgetExceeded => "  [Budget] ",
            Outcome::Failed => "  [Error] ",
        };
        for line in response.text.lines() {
            println!("{prefix}{line}");
        }
        println!();
    }

    eviction.abort();
    chat.sessions().close(&session_id).await;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
