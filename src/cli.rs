use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "ytsum", about = "YouTube video summarizer", version)]
pub struct Cli {
    /// YouTube video URL or video ID (reads from stdin if omitted)
    pub url: Option<String>,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Preferred caption language
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Generation model
    #[arg(long)]
    pub model: Option<String>,

    /// List recent summaries and exit
    #[arg(long)]
    pub history: bool,

    /// Show extraction details
    #[arg(short, long)]
    pub verbose: bool,
}
