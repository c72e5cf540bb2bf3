//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - dispatches parsed CLI commands
//! - runs the ingest/fit pipeline
//! - prints reports
//! - drives the chat loop

use std::io::{BufRead, Write};

use tracing::info;

use crate::chat::{Assistant, ChatClient, ChatContext};
use crate::cli::{ChatArgs, Command, FitArgs, ModelArgs, ShowArgs, SummaryArgs};
use crate::error::AppError;
use crate::fit::{FitOptions, Fitter};
use crate::io::ingest::load_csv;

pub mod pipeline;
pub mod session;

pub use session::Session;

/// Execute one parsed command.
pub fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Fit(args) => handle_fit(args),
        Command::Summary(args) => handle_summary(args),
        Command::Show(args) => handle_show(args),
        Command::Chat(args) => handle_chat(args),
        Command::Health => handle_health(),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = args.to_config();
    let run = pipeline::run_fit(&config)?;
    let source = pipeline::source_name(&config.csv_path);

    print!("{}", crate::report::format_ingest(&run.ingest, &source));
    println!("{}", crate::report::format_fit(&run.fit));

    if let Some(path) = &config.export_csv {
        println!("Exported fitted rows to {}", path.display());
    }
    if let Some(path) = &config.export_json {
        println!("Exported fit report to {}", path.display());
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let ingest = load_csv(&args.csv)?;
    print!("{}", crate::report::format_ingest(&ingest, &pipeline::source_name(&args.csv)));

    let mut session = Session::new();
    session.load(ingest);
    if args.fitted {
        session.run_fit(&Fitter::new(), &fit_options(&args.model))?;
    }

    if let Some(summary) = session.summary() {
        print!("{}", crate::report::format_summary(&summary));
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::fit_file::read_fit_json(&args.fit)?;
    print!("{}", crate::report::format_report_file(&report));
    Ok(())
}

fn handle_health() -> Result<(), AppError> {
    let client = ChatClient::from_env();
    let health = client.health()?;
    println!(
        "Relay {}: status={} model={}",
        client.config().health_url,
        health.status,
        health.model
    );
    Ok(())
}

fn handle_chat(args: ChatArgs) -> Result<(), AppError> {
    let mut session = Session::new();
    session.load(load_csv(&args.csv)?);

    // A failed fit still leaves the raw rows available as context.
    if let Err(e) = session.run_fit(&Fitter::new(), &fit_options(&args.model)) {
        eprintln!("Fit unavailable: {e}");
    }
    let summary = session.summary();
    let context = ChatContext {
        rows: session.ingest().map(|i| i.rows.as_slice()),
        fit: session.fit(),
        summary: summary.as_ref(),
    };

    let mut assistant = Assistant::new(ChatClient::from_env());
    info!(session = %assistant.session_id(), "chat session started");

    if let Some(message) = &args.message {
        let reply = assistant.ask(message, context);
        println!("{}", reply.text);
        return Ok(());
    }

    println!("Ask about the data (/new starts a new conversation, /quit exits).");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let Some(line) = lines.next() else { break };
        let line = line.map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?;
        let text = line.trim();

        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                let id = assistant.new_session();
                println!("Started a new conversation ({id}).");
            }
            _ => {
                let reply = assistant.ask(text, context);
                println!("{}\n", reply.text);
            }
        }
    }
    Ok(())
}

fn fit_options(args: &ModelArgs) -> FitOptions {
    FitOptions {
        model: args.model,
        weibull_shape: args.weibull_shape,
        seed: args.seed,
    }
}
