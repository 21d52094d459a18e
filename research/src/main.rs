mod prompt;
mod record;
mod report;
mod research;

use agent::callbacks::TranscriptLogger;
use agent::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// Ask a model to research a topic and print a structured summary.
#[derive(Parser, Debug)]
#[command(name = "research", version)]
struct Cli {
    /// The research topic or question.
    topic: String,

    /// Chat completion model to use.
    #[arg(long, default_value = "gpt-4o")]
    model: String,

    /// Let the model search the web while answering.
    #[arg(long)]
    web_search: bool,

    /// Ask the model again this many times when its answer cannot be parsed.
    #[arg(long, default_value_t = 0)]
    retries: usize,

    /// Save the result as a text file in this directory.
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Write the conversation with the model to this file.
    #[arg(long, value_name = "FILE")]
    transcript: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // a missing .env is fine, the key may already be in the environment
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(Error::Config(format!("could not load .env: {}", err)));
    }

    init_tracing(cli.quiet, cli.verbose)?;

    let mut researcher = research::Researcher::new(agent::llm::OpenAI::new(cli.model))?
        .web_search(cli.web_search)
        .retries(cli.retries);

    if let Some(path) = &cli.transcript {
        let file = std::fs::File::create(path)?;
        researcher = researcher.transcript(TranscriptLogger::new(&cli.topic, file)?);
    }

    let record = match researcher.run(&cli.topic).await {
        Ok(record) => record,
        Err(Error::Parse(err)) => {
            eprintln!("Error parsing response: {}", err);
            eprintln!("Raw output:\n{}", err.raw());
            std::process::exit(1);
        }
        Err(err) => return Err(err),
    };

    print!("{}", report::render(&record));

    if let Some(dir) = &cli.save {
        let path = report::save_to_file(dir, &record, &chrono::Local::now())?;
        println!("\nSaved to file: {}", path.display());
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RESEARCH_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| {
            Error::Config(format!("failed to initialize tracing subscriber: {}", err))
        })
}
