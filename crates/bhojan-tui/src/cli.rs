use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::warn;

use bhojan_core::{
    run_turn, AnalysisResult, ChatCompletionsClient, Conversation, HistoryStore, RiskLevel,
    TesseractOcr,
};

#[derive(Parser)]
#[command(name = "bhojan")]
#[command(version)]
#[command(about = "Infer what a food product is for from its ingredients, then flag what doesn't fit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model provider: groq, openai or ollama
    #[arg(long, global = true, env = "BHOJAN_PROVIDER")]
    pub provider: Option<String>,

    /// Model name (defaults to the provider's default)
    #[arg(long, global = true, env = "BHOJAN_MODEL")]
    pub model: Option<String>,

    /// History file location
    #[arg(long, global = true, env = "BHOJAN_HISTORY_FILE")]
    pub history_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one ingredient list or label photo and print the result
    Analyze {
        /// Comma-separated ingredients
        text: Option<String>,
        /// Photo of an ingredient label (its text replaces TEXT)
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Show or clear past analyses
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved analyses, newest first
    List,
    /// Delete every saved analysis
    Clear,
}

pub async fn analyze(
    client: &ChatCompletionsClient,
    history: &mut HistoryStore,
    text: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let mut conversation = Conversation::new();
    let Some(turn) = conversation.submit(text.as_deref().unwrap_or(""), image) else {
        bail!("nothing to analyze: pass ingredient text or --image");
    };

    println!(
        "{}",
        format!("Analyzing with {} ({})...", client.provider().display_name(), client.model()).dimmed()
    );

    let outcome = run_turn(&TesseractOcr::default(), client, turn).await;

    match outcome.analysis() {
        Some(analysis) if analysis.inferred_intent.is_some() => print_analysis(analysis),
        _ => println!("{}", outcome.message.content.yellow()),
    }

    if let Some(item) = conversation.complete(outcome) {
        if let Err(e) = history.push(item) {
            warn!("could not save history: {:#}", e);
        }
    }

    Ok(())
}

fn print_analysis(analysis: &AnalysisResult) {
    let Some(intent) = &analysis.inferred_intent else {
        return;
    };

    println!();
    println!(
        "{} {}  {}",
        intent.kind().icon(),
        intent.label.replace('_', " ").to_uppercase().bold().cyan(),
        format!("{}% confidence", intent.confidence_percent()).dimmed()
    );
    for reason in &intent.reasoning {
        println!("  · {}", reason.dimmed());
    }

    if !analysis.overall_assessment.is_empty() {
        println!("\n{}", analysis.overall_assessment.italic());
    }

    println!("\n{}", "Alignment conflicts".bold().underline());
    if analysis.primary_conflicts.is_empty() {
        println!("  {}", "No conflicts detected".green());
    }
    for conflict in &analysis.primary_conflicts {
        let badge = format!("[{}]", conflict.risk());
        let badge = match conflict.risk() {
            RiskLevel::High => badge.red().bold(),
            RiskLevel::Medium => badge.yellow().bold(),
            RiskLevel::Low => badge.green().bold(),
            RiskLevel::Unknown => badge.normal(),
        };
        println!("  {} {}", badge, conflict.ingredient.bold());
        println!("    {}", conflict.why_it_matters.dimmed());
    }

    println!("\n{}", "Tradeoffs".bold().underline());
    if analysis.secondary_tradeoffs.is_empty() {
        println!("  {}", "No notable tradeoffs".dimmed());
    }
    for tradeoff in &analysis.secondary_tradeoffs {
        println!("  {}: {}", tradeoff.ingredient.bold(), tradeoff.explanation.dimmed());
    }

    println!();
    if analysis.uncertainty_notes.is_empty() {
        println!("{}", format!("✓ {}", analysis.uncertainty_status()).green());
    } else {
        println!("{}", format!("⚠ {}", analysis.uncertainty_status()).yellow());
        for note in &analysis.uncertainty_notes {
            println!("  • {}", note.dimmed());
        }
    }
}

pub fn list_history(history: &HistoryStore) {
    if history.is_empty() {
        println!("{}", "No past scans yet".dimmed());
        return;
    }

    println!("{}", format!("📜 {} saved analyses", history.len()).bold().blue());
    for item in history.items() {
        let when = item.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        println!("\n{} {}", when.to_string().dimmed(), item.summary.bold());
        if !item.overall_assessment.is_empty() {
            println!("   {}", item.overall_assessment);
        }
    }
}

pub fn clear_history(history: &mut HistoryStore) -> Result<()> {
    let count = history.len();
    history.clear()?;
    println!("{}", format!("Cleared {} entries from {}", count, history.path().display()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_with_image() {
        let cli = Cli::try_parse_from(["bhojan", "analyze", "--image", "label.jpg"]).unwrap();
        match cli.command {
            Some(Commands::Analyze { text, image }) => {
                assert!(text.is_none());
                assert_eq!(image, Some(PathBuf::from("label.jpg")));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bhojan", "history", "list", "--provider", "ollama", "--history-file", "/tmp/h.json",
        ])
        .unwrap();
        assert_eq!(cli.provider.as_deref(), Some("ollama"));
        assert_eq!(cli.history_file, Some(PathBuf::from("/tmp/h.json")));
        assert!(matches!(
            cli.command,
            Some(Commands::History { action: HistoryAction::List })
        ));
    }

    #[test]
    fn test_no_subcommand_starts_tui() {
        let cli = Cli::try_parse_from(["bhojan"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[tokio::test]
    async fn test_blank_analyze_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HistoryStore::open(dir.path().join("history.json"));
        let client = ChatCompletionsClient::new(
            bhojan_core::Provider::Ollama,
            "http://127.0.0.1:9",
            "llama3.2",
            None,
        );

        let result = analyze(&client, &mut history, Some("  ".to_string()), None).await;

        assert!(result.is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear_history_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HistoryStore::open(dir.path().join("history.json"));
        history
            .push(bhojan_core::HistoryItem::new("fat_loss".to_string(), "Lean.".to_string(), vec![]))
            .unwrap();

        clear_history(&mut history).unwrap();

        assert!(history.is_empty());
        assert!(HistoryStore::open(dir.path().join("history.json")).is_empty());
    }
}
