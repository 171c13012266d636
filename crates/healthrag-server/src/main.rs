//! HealthRAG — grounded health-question answering server.

use std::path::PathBuf;
use std::sync::Arc;

use healthrag_chat::ProviderRegistry;
use healthrag_core::RagSettings;
use healthrag_runtime::RagOrchestrator;
use healthrag_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> PathBuf {
    std::env::var("HEALTHRAG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("healthrag.json"))
}

fn print_help() {
    println!("HealthRAG — grounded health-question answering");
    println!();
    println!("Usage: healthrag [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the HTTP server");
    println!("  ask <question>           Answer one question and print its sources");
    println!("  check                    Validate providers and the vector collection");
    println!("  init                     Write current settings to the config file");
    println!("  help                     Show this help message");
    println!();
    println!("Settings are read from $HEALTHRAG_CONFIG (default: healthrag.json),");
    println!("then from the environment (.env is loaded first).");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    if matches!(command, Some("--help" | "-h" | "help")) {
        print_help();
        return Ok(());
    }

    let config_path = resolve_config_path();
    if command == Some("init") {
        RagSettings::init(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to write settings: {}", e))?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let settings = RagSettings::load(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
    info!(
        "Loading config... active provider: {}",
        settings.active_provider.to_uppercase()
    );

    match command {
        None => serve(settings).await,
        Some("ask") => {
            let question = args[2..].join(" ");
            if question.trim().is_empty() {
                eprintln!("Usage: healthrag ask <question>");
                std::process::exit(1);
            }
            let orchestrator = RagOrchestrator::connect(&settings).await?;
            let result = orchestrator.ask(&question, &[]).await?;
            println!("{}", result.answer_text);
            if !result.unique_sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &result.unique_sources {
                    println!("  - {}", source);
                }
            }
            Ok(())
        }
        Some("check" | "--check") => {
            check(&settings).await;
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'healthrag help' for usage.", other);
            std::process::exit(1);
        }
    }
}

/// Exit 2 on a configuration problem, 1 when a dependency is unavailable.
async fn check(settings: &RagSettings) {
    match ProviderRegistry::from_settings(settings) {
        Ok(registry) => {
            for id in registry.identifiers() {
                let state = match registry.resolve(id) {
                    Ok(p) if p.has_credential() => "credential set",
                    _ => "no credential",
                };
                println!("  provider {:<12} {}", id, state);
            }
        }
        Err(e) => {
            eprintln!("FAILED (configuration): {}", e);
            std::process::exit(2);
        }
    }

    match RagOrchestrator::connect(settings).await {
        Ok(orchestrator) => {
            let status = orchestrator.status();
            println!(
                "OK: {} ({}), refiner {} ({}), collection '{}' with {} chunks, k={}",
                status.llm_provider,
                status.llm_model,
                status.refiner_provider,
                status.refiner_model,
                status.collection,
                status.chunk_count,
                status.top_k
            );
        }
        Err(e) if e.is_fatal_config() => {
            eprintln!("FAILED (configuration): {}", e);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("FAILED (unavailable): {}", e);
            std::process::exit(1);
        }
    }
}

async fn serve(settings: RagSettings) -> anyhow::Result<()> {
    let orchestrator = RagOrchestrator::connect(&settings)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start RAG pipeline: {}", e))?;

    let state = Arc::new(AppState::new(orchestrator));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HealthRAG server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
