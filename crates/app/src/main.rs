//! exam-sim: timed CAPM-style practice exams in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod interactive;
mod render;
mod settings;

#[derive(Parser)]
#[command(name = "exam-sim", version, about = "Timed practice exams with domain scoring")]
struct Cli {
    /// Exam config TOML file
    #[arg(long, global = true, env = "EXAM_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database URL or path
    #[arg(long, global = true, env = "EXAM_DB_URL", default_value = "sqlite://exam.sqlite3")]
    db: String,

    /// User id for saved exams and trends (generated when omitted)
    #[arg(long, global = true, env = "EXAM_USER_ID")]
    user: Option<String>,

    /// Question bank JSON file (built-in bank when omitted)
    #[arg(long, global = true)]
    bank: Option<PathBuf>,

    /// Seed for question generation and exam assembly
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a full-length exam (discards any saved exam)
    Exam {
        /// Print every missed question with its explanation afterwards
        #[arg(long)]
        review: bool,
    },

    /// Practice a single domain
    Practice {
        /// fundamentals, predictive, agile or business-analysis
        #[arg(long)]
        domain: String,

        /// Number of questions
        #[arg(long, default_value = "10")]
        count: u32,

        #[arg(long)]
        review: bool,
    },

    /// Continue a saved full-length exam
    Resume {
        #[arg(long)]
        review: bool,
    },

    /// Show recent attempts and per-domain totals
    Trends,

    /// Inspect the question bank
    Bank {
        #[command(subcommand)]
        action: BankAction,
    },
}

#[derive(Subcommand)]
enum BankAction {
    /// Check the bank against the exam config
    Validate,

    /// Write the bank as JSON
    Export {
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = settings::Settings::resolve(
        cli.config.as_deref(),
        &cli.db,
        cli.user.as_deref(),
        cli.bank.as_deref(),
        cli.seed,
    )?;

    match cli.command {
        Commands::Exam { review } => commands::exam(settings, review).await,
        Commands::Practice {
            domain,
            count,
            review,
        } => commands::practice(settings, &domain, count, review).await,
        Commands::Resume { review } => commands::resume(settings, review).await,
        Commands::Trends => commands::trends(settings).await,
        Commands::Bank { action } => match action {
            BankAction::Validate => commands::bank_validate(&settings),
            BankAction::Export { out } => commands::bank_export(&settings, &out),
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(settings::directive("exam=info"))
                .add_directive(settings::directive("services=info"))
                .add_directive(settings::directive("storage=warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(2);
    }
}
