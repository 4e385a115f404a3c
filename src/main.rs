//! SQL Server restore-chain planner
//!
//! Resolves, validates and scripts point-in-time restores from backup history

// restorechain/src/main.rs
mod catalog;
mod chain;
mod config;
mod errors;
mod restore;

use anyhow::{Context, Result};
use config::{AppConfig, OperationConfig, config_path_from_env, load_restore_config_from_json};
use restore::RestoreOutcome;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Main entry point for the restore-chain tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run_app().await {
        Ok(true) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("❌ Restore chain rejected; do not execute this restore.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<bool> {
    let config_path = config_path_from_env();
    let mut app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    let restore_config = load_restore_config_from_json(&app_config.raw_json_config)
        .context("Failed to load restore configuration from JSON")?;
    println!(
        "Source: {}, Target: {}, Point in time: {}",
        restore_config.source_database,
        restore_config.target_database,
        restore_config
            .target_time
            .map_or_else(|| "latest".to_string(), |t| t.to_string())
    );

    app_config.operation = Some(match choice.as_str() {
        "1" | "plan" => {
            println!("🔎 Resolving restore chain...");
            OperationConfig::Plan(restore_config)
        }
        "2" | "validate" => {
            println!("🧪 Resolving and validating restore chain...");
            OperationConfig::Validate(restore_config)
        }
        "3" | "script" => {
            println!("📝 Generating restore script...");
            OperationConfig::Script(restore_config)
        }
        _ => {
            println!("❌ Invalid choice. Please enter '1' (plan), '2' (validate), or '3' (script).");
            anyhow::bail!("Invalid operation choice");
        }
    });

    let outcome = restore::run_restore_flow(&app_config)
        .await
        .context("Restore planning failed")?;
    print_outcome(&app_config, &outcome);
    Ok(outcome.succeeded())
}

fn print_outcome(app_config: &AppConfig, outcome: &RestoreOutcome) {
    println!("Plan: {}", outcome.plan.summary());
    if let Some(generation) = outcome.plan.generation() {
        println!("Catalog generation: {}", generation);
    }
    for member in outcome.plan.members() {
        println!(
            "   {:<4} {} [{} -> {}]",
            member.kind.to_string(),
            member.media_id,
            member.start_time,
            member.finish_time
        );
    }
    for note in outcome.plan.notes() {
        println!("ℹ️  {}", note);
    }

    if let Some(verdict) = &outcome.verdict {
        let marker = if verdict.is_ok() { "✓" } else { "⚠️" };
        println!("{} {}", marker, verdict);
    }

    if let Some(script) = &outcome.script {
        let written_to = app_config
            .operation
            .as_ref()
            .and_then(|op| op.restore_config().script_output_path.as_ref());
        match written_to {
            Some(path) => println!("✓ Restore script ({} operations) written to {}", outcome.operations.len(), path.display()),
            None => println!("\n{}", script),
        }
    }
}

/// Prompts user to select an operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Show restore plan (or type 'plan')");
    println!("2. Validate restore chain (or type 'validate')");
    println!("3. Generate restore script (or type 'script')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
