use crate::analysis::{Decision, QcScore};
use crate::cli::commands::*;
use crate::config::{self, MerqaConfig};
use crate::error::{MerqaError, Result};
use crate::oracle;
use crate::records::evaluation::RecordEvaluation;
use crate::records::pipeline::{self, PipelineOptions};
use crate::records::store::{self, ArtifactStore};
use crate::records::{find_record, scan_records};
use crate::storage::database::Database;
use std::path::PathBuf;

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Records => handle_records().await,
        Commands::Process {
            id,
            force,
            skip_transcription,
        } => handle_process(&id, force, skip_transcription).await,
        Commands::Score { id } => handle_score(&id).await,
        Commands::Decide { id, all } => handle_decide(id, all).await,
        Commands::Show { id } => handle_show(id).await,
        Commands::Runs { limit } => handle_runs(limit).await,
        Commands::Config { action } => handle_config(action).await,
    }
}

fn load_context() -> Result<(MerqaConfig, PathBuf)> {
    let cfg = config::loader::load_config_with_env()?;
    let root = config::loader::records_dir(&cfg)?;
    Ok((cfg, root))
}

fn store_for(cfg: &MerqaConfig, root: &std::path::Path, id: &str) -> ArtifactStore {
    ArtifactStore::new(root, &cfg.records.processed_dir_name, id)
}

async fn handle_records() -> Result<()> {
    let (cfg, root) = load_context()?;
    let records = scan_records(&root)?;

    if records.is_empty() {
        println!("No records found in {}", root.display());
        return Ok(());
    }

    let db_path = config::loader::database_path(&cfg)?;
    let db = if db_path.exists() {
        Some(Database::open(&db_path)?)
    } else {
        None
    };

    println!(
        "{:<24} {:<6} {:<10} {:<14} {:<8}",
        "ID", "Calls", "Processed", "Decision", "Score"
    );
    println!("{}", "-".repeat(66));

    for record in records.values() {
        let store = store_for(&cfg, &root, &record.id);
        let processed = store.is_processed();
        let decision = store
            .read_json::<Decision>(store::FINAL_DECISION)
            .map(|d| d.triage().as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        let score = match store.read_json::<QcScore>(store::QC_SCORE) {
            Some(s) => Some(s.total_score),
            None => match &db {
                Some(db) => db
                    .latest_completed_run(&record.id)?
                    .and_then(|run| run.total_score),
                None => None,
            },
        }
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<24} {:<6} {:<10} {:<14} {:<8}",
            truncate(&record.id, 22),
            record.calls.len(),
            if processed { "yes" } else { "no" },
            decision,
            score
        );
    }

    Ok(())
}

async fn handle_process(id: &str, force: bool, skip_transcription: bool) -> Result<()> {
    let (cfg, root) = load_context()?;
    let record = find_record(&root, id)?;
    let analyzer = oracle::analyzer_from_config(&cfg.analyzer)
        .map_err(|e| MerqaError::Analyzer(format!("{:#}", e)))?;

    let db = Database::open(config::loader::database_path(&cfg)?)?;
    let stale_after = chrono::Duration::minutes(cfg.storage.stale_run_minutes);
    let run = db.begin_run(id, force, stale_after)?;

    println!(
        "Processing {} ({} call(s), run {})",
        record.id,
        record.calls.len(),
        run.id
    );

    let store = store_for(&cfg, &root, id);
    let options = PipelineOptions {
        force,
        skip_transcription,
    };

    match pipeline::process_record(&cfg, analyzer, &record, &store, options).await {
        Ok(outcome) => {
            db.complete_run(&run.id, outcome.score.total_score, outcome.score.category.as_str())?;
            println!(
                "\nQC score: {}/{} ({:.2}%) - {}",
                outcome.score.total_score,
                outcome.score.max_score,
                outcome.score.percentage,
                outcome.score.category
            );
            println!(
                "Decision: {} ({} issue(s))",
                outcome.decision.triage().as_str(),
                outcome.decision.issue_count()
            );
            println!("Artifacts: {}", store.dir().display());
            if let Some(finished) = db.get_run(&run.id)?.and_then(|r| r.finished_at) {
                println!(
                    "Finished in {}s",
                    (finished - run.started_at).num_seconds()
                );
            }
            Ok(())
        }
        Err(e) => {
            db.fail_run(&run.id, &e.to_string())?;
            Err(e)
        }
    }
}

async fn handle_score(id: &str) -> Result<()> {
    let (cfg, root) = load_context()?;
    let evaluation = RecordEvaluation::load(&store_for(&cfg, &root, id))?;
    println!("{}", serde_json::to_string_pretty(&evaluation.score)?);
    Ok(())
}

async fn handle_decide(id: Option<String>, all: bool) -> Result<()> {
    let (cfg, root) = load_context()?;

    if !all {
        let id = id.ok_or_else(|| MerqaError::Config("Specify a record ID or --all".to_string()))?;
        let store = store_for(&cfg, &root, &id);
        let evaluation = RecordEvaluation::load(&store)?;
        evaluation.save(&store)?;
        println!("{}", serde_json::to_string_pretty(&evaluation.decision)?);
        return Ok(());
    }

    let mut decided = 0;
    for record in scan_records(&root)?.values() {
        let store = store_for(&cfg, &root, &record.id);
        if !store.is_processed() {
            println!("{}: not processed, skipping", record.id);
            continue;
        }
        match RecordEvaluation::load(&store).and_then(|e| e.save(&store).map(|_| e)) {
            Ok(evaluation) => {
                decided += 1;
                println!(
                    "{}: {} ({} issue(s))",
                    record.id,
                    evaluation.decision.triage().as_str(),
                    evaluation.decision.issue_count()
                );
            }
            Err(e) => eprintln!("{}: failed: {}", record.id, e),
        }
    }
    println!("\nfinal_decision.json written for {} record(s)", decided);
    Ok(())
}

fn select_record_interactive(cfg: &MerqaConfig, root: &std::path::Path) -> Result<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let processed: Vec<String> = scan_records(root)?
        .into_keys()
        .filter(|id| store_for(cfg, root, id).is_processed())
        .collect();

    if processed.is_empty() {
        return Err(MerqaError::Config("No processed records found".to_string()));
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a record")
        .items(&processed)
        .default(0)
        .interact()
        .map_err(|e| MerqaError::Config(format!("Selection cancelled: {}", e)))?;

    Ok(processed[selection].clone())
}

async fn handle_show(id: Option<String>) -> Result<()> {
    let (cfg, root) = load_context()?;

    let record_id = match id {
        Some(id) => id,
        None => select_record_interactive(&cfg, &root)?,
    };

    let evaluation = RecordEvaluation::load(&store_for(&cfg, &root, &record_id))?;
    print_dashboard(&evaluation);
    Ok(())
}

fn print_dashboard(evaluation: &RecordEvaluation) {
    let meta = &evaluation.qa.meta;
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let top = &evaluation.top_metrics;
    let speakers = &evaluation.speakers;
    let score = &evaluation.score;

    println!("\n{}", "=".repeat(60));
    println!("  Record {} - QC Summary", evaluation.record_id);
    println!("{}", "=".repeat(60));
    println!();
    println!("Customer:  {}", or_dash(evaluation.qa.customer_name()));
    println!("Doctor:    {}", or_dash(meta.doctor_name.clone()));
    println!("Insurer:   {}", or_dash(meta.insurance_company.clone()));
    println!("Date:      {}", or_dash(meta.date.clone()));
    println!("Duration:  {}", or_dash(top.duration.clone()));
    println!();
    println!(
        "Accuracy: {:.2}%   Questions asked: {}/{}",
        top.accuracy, top.questions_asked, top.total_questions
    );
    println!(
        "Missed: {}  Incorrect: {}  Paraphrased: {}  Clubbed: {}  Critical: {}",
        top.questions_missed,
        top.documentation_errors,
        top.paraphrased_responses,
        top.clubbed_questions,
        top.critical_errors
    );
    println!(
        "Speaking time: agent {:.1}% / customer {:.1}% / dead air {:.1}%",
        speakers.agent_pct, speakers.customer_pct, speakers.dead_air_pct
    );
    println!(
        "Words per minute: doctor {:.1} / customer {:.1}",
        evaluation.speaking_rate.doctor_wpm, evaluation.speaking_rate.customer_wpm
    );

    println!(
        "\nQC score: {}/{} ({:.2}%) - {}",
        score.total_score, score.max_score, score.percentage, score.category
    );
    for (dimension, points) in score.breakdown.entries() {
        println!("  {:<24} {:>3}", dimension, points);
    }

    println!("\nDecision: {}", evaluation.decision.triage().as_str());
    for (bucket, issues) in evaluation.decision.buckets() {
        if issues.is_empty() {
            continue;
        }
        println!("  {}", bucket);
        for issue in issues {
            println!("    - {}", issue.issue);
        }
    }
    println!();
}

async fn handle_runs(limit: usize) -> Result<()> {
    let cfg = config::loader::load_config_with_env()?;
    let db_path = config::loader::database_path(&cfg)?;

    if !db_path.exists() {
        println!("No records processed yet.");
        return Ok(());
    }

    let db = Database::open(&db_path)?;
    let runs = db.list_runs(limit)?;

    if runs.is_empty() {
        println!("No records processed yet.");
        return Ok(());
    }

    println!(
        "{:<20} {:<18} {:<11} {:<8} {:<14}",
        "Started", "Record", "Status", "Score", "Category"
    );
    println!("{}", "-".repeat(75));

    for run in runs {
        println!(
            "{:<20} {:<18} {:<11} {:<8} {:<14}",
            run.started_at.format("%Y-%m-%d %H:%M"),
            truncate(&run.record_id, 16),
            run.status,
            run.total_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            run.category.as_deref().unwrap_or("-")
        );
        if let Some(error) = &run.error {
            println!("    {}", truncate(error, 70));
        }
    }

    Ok(())
}

async fn handle_config(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let mut cfg = config::loader::load_config()?;
            if cfg.analyzer.api_key.is_some() {
                cfg.analyzer.api_key = Some("********".to_string());
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigCommands::Path => {
            println!("{}", config::loader::config_path()?.display());
        }
        ConfigCommands::Init => {
            let cfg = config::loader::load_config()?;
            config::loader::ensure_directories(&cfg)?;
            println!(
                "Configuration initialized at: {}",
                config::loader::config_path()?.display()
            );
            println!("\nDefault settings:");
            println!("  Records directory: {}", config::loader::records_dir(&cfg)?.display());
            println!("  Database: {}", config::loader::database_path(&cfg)?.display());
            println!("  Analyzer: {} ({})", cfg.analyzer.provider, cfg.analyzer.model);
            println!(
                "  Chunking: {}s chunks, up to {} in parallel",
                cfg.transcription.chunk_seconds, cfg.transcription.max_parallel_chunks
            );
        }
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
