use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, OutputFormat};
use ytsum::pipeline::{Pipeline, RunOutcome};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("logs")
}

fn build_after_help(config: &ytsum::config::Config) -> String {
    let key_line = match config.gemini_api_key() {
        Ok(_) => "  \x1b[32m✅\x1b[0m gemini_api_key    configured".to_string(),
        Err(_) => "  \x1b[31m❌\x1b[0m gemini_api_key    (not set — required for summaries)".to_string(),
    };
    let token_line = match config.youtube_access_token() {
        Some(_) => "  \x1b[32m✅\x1b[0m youtube token     configured".to_string(),
        None => "  \x1b[33m➖\x1b[0m youtube token     (optional — enables the captions API)".to_string(),
    };

    let config_path = ytsum::config::config_path();
    let log_path = log_dir().join("ytsum.log");

    format!(
        "\nCREDENTIALS:\n{key_line}\n{token_line}\n\nConfig file: {}\nLogs are written to: {}",
        config_path.display(),
        log_path.display()
    )
}

/// Retry a pipeline run with exponential backoff
async fn run_with_retry(pipeline: &mut Pipeline, url: &str, max_attempts: u32) -> Result<RunOutcome> {
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match pipeline.run(url).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                if attempt + 1 < max_attempts {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    debug!("Attempt {} failed: {e}, retrying in {delay:?}", attempt + 1);
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap())
}

fn print_history() {
    let records = ytsum::history::load();
    if records.is_empty() {
        println!("履歴はありません");
        return;
    }
    for record in &records {
        println!(
            "{}  {}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.video_id,
            record.title
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    // Load config file (non-fatal if missing/invalid)
    let mut config = ytsum::config::Config::load().unwrap_or_default();

    let after_help = build_after_help(&config);
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // CLI flags take priority over config defaults
    if let Some(ref lang) = cli.lang {
        config.preferred_lang = Some(lang.clone());
    }
    if let Some(ref model) = cli.model {
        config.model = Some(model.clone());
    }

    if cli.verbose {
        let config_path = ytsum::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    if cli.history {
        print_history();
        return Ok(());
    }

    // Collect URLs: from arg or stdin
    let urls = if let Some(ref url) = cli.url {
        vec![url.clone()]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if urls.is_empty() {
        bail!("no URL or video ID provided\n\nUsage: ytsum <URL>\n       echo <URL> | ytsum");
    }

    let client = reqwest::Client::new();
    let mut pipeline = Pipeline::new(client, config);

    for url_input in &urls {
        let url_input = url_input.trim().to_string();
        if url_input.is_empty() {
            continue;
        }

        if ytsum::extract_video_id(&url_input).is_none() {
            bail!(
                "could not extract video ID from: {url_input}\n\nSupported formats:\n  \
                 https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  \
                 https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  \
                 <11-character video ID>"
            );
        }

        let record = match run_with_retry(&mut pipeline, &url_input, 3).await? {
            RunOutcome::Completed(record) => record,
            RunOutcome::AlreadyRunning { video_id } => {
                eprintln!("別の要約 ({video_id}) を処理中です。完了後にもう一度お試しください");
                continue;
            }
        };

        if cli.verbose {
            eprintln!(
                "Video: {} ({})\nGenerated: {}",
                record.title, record.video_id, record.timestamp
            );
        }

        let parsed = ytsum::parse::parse_summary(&record.summary_text);
        let rendered = match cli.format {
            OutputFormat::Text => ytsum::output::render_text(&record, &parsed),
            OutputFormat::Json => ytsum::output::render_json(&record, &parsed),
        };

        if let Some(ref path) = cli.output {
            std::fs::write(path, &rendered)?;
            if cli.verbose {
                eprintln!("Output written to: {}", path.display());
            }
        } else {
            println!("{rendered}");
        }
    }

    Ok(())
}
