//! Command-line interface for stock-predictor
//!
//! # Usage
//!
//! ```bash
//! export GEMINI_API_KEY="..."
//!
//! stock-predictor predict AAPL
//! stock-predictor --provider openai --model gpt-4o-mini predict MSFT --json
//! stock-predictor generate TSLA          # series only, no network
//! stock-predictor interactive
//! ```

mod render;

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use predictor_core::session::DEFAULT_TICKER;
use predictor_core::{
    PredictionSession, Predictor, PredictorConfig, ProgressEvent, ProviderKind, SeriesGenerator,
    SessionState, normalize_ticker,
};
use predictor_utils::LogFormat;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "stock-predictor")]
#[command(about = "Synthetic price forecasts with AI market sentiment", long_about = None)]
struct Args {
    /// Sentiment provider (gemini or openai)
    #[arg(long, global = true, env = "PREDICTOR_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Model identifier passed to the provider
    #[arg(long, global = true, env = "PREDICTOR_MODEL")]
    model: Option<String>,

    /// Override the provider base URL
    #[arg(long, global = true, env = "PREDICTOR_API_BASE")]
    api_base: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a series and fetch AI sentiment for a ticker
    Predict {
        /// Stock ticker
        #[arg(default_value = DEFAULT_TICKER)]
        ticker: String,

        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,

        /// Skip the staged progress pauses
        #[arg(long)]
        fast: bool,
    },

    /// Generate the synthetic series only (no network access)
    Generate {
        /// Stock ticker
        #[arg(default_value = DEFAULT_TICKER)]
        ticker: String,

        /// Print the series as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read tickers from stdin and predict each
    Interactive {
        /// Skip the staged progress pauses
        #[arg(long)]
        fast: bool,
    },
}

impl Args {
    fn predictor_config(&self, fast: bool) -> anyhow::Result<PredictorConfig> {
        let mut builder = PredictorConfig::builder();
        if let Some(provider) = self.provider {
            builder = builder.provider(provider);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(base) = &self.api_base {
            builder = builder.api_base(base.clone());
        }
        if fast {
            builder = builder.no_stage_delay();
        }
        Ok(builder.build()?)
    }
}

fn print_progress(event: &ProgressEvent) {
    eprintln!("[{}/{}] {}", event.step, event.total, event.message);
}

async fn run_predict(args: &Args, ticker: &str, json: bool, fast: bool) -> anyhow::Result<()> {
    let predictor = Predictor::from_config(args.predictor_config(fast)?)?;

    let reporter = print_progress;
    let prediction = predictor.predict(ticker, Some(&reporter)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        println!("{}", render::prediction(&prediction));
    }
    Ok(())
}

fn run_generate(ticker: &str, json: bool) -> anyhow::Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let series = SeriesGenerator::new().generate(&ticker);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        println!("{}", render::series(&ticker, &series));
    }
    Ok(())
}

async fn run_interactive(args: &Args, fast: bool) -> anyhow::Result<()> {
    let predictor = Predictor::from_config(args.predictor_config(fast)?)?;
    let session = Mutex::new(PredictionSession::default());

    println!("Enter a stock ticker (blank repeats the last one, 'exit' quits).");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let last = lock(&session).ticker().to_string();
        print!("ticker [{last}]> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();
        if matches!(input, "exit" | "quit") {
            break;
        }
        let ticker = if input.is_empty() { last } else { input.to_uppercase() };

        let id = lock(&session).begin(ticker.clone());
        let reporter = |event: &ProgressEvent| {
            if lock(&session).progress(id, event.message.clone()) {
                print_progress(event);
            }
        };

        let outcome = predictor.predict(&ticker, Some(&reporter)).await;
        let mut guard = lock(&session);
        guard.finish(id, outcome);

        match guard.state() {
            SessionState::Ready { prediction } => println!("{}\n", render::prediction(prediction)),
            SessionState::Failed { message } => eprintln!("Error: {message}\n"),
            SessionState::Idle | SessionState::Loading { .. } => {}
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn lock(session: &Mutex<PredictionSession>) -> std::sync::MutexGuard<'_, PredictionSession> {
    session
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app_config = predictor_utils::Config::from_env();
    let log_format = args.log_format.unwrap_or(app_config.log_format);
    predictor_utils::init_tracing(log_format, Some("warn,predictor_core=info"));

    debug!(environment = %app_config.environment, "Starting {}", app_config.app_name);

    match &args.command {
        Command::Predict { ticker, json, fast } => run_predict(&args, ticker, *json, *fast).await,
        Command::Generate { ticker, json } => run_generate(ticker, *json),
        Command::Interactive { fast } => run_interactive(&args, *fast).await,
    }
}
