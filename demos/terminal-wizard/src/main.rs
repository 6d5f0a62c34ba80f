//! Line-oriented terminal front end for the prompt wizard.
//!
//! Plain text replaces the current field. Commands start with `:`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use wizard_adapters::HyperTransport;
use wizard_config::WizardConfig;
use wizard_kernel::{
    Document, GenerateOutcome, GenerationError, SessionError, Transition, WizardSession,
};
use wizard_primitives::Secret;

const HELP: &str = "commands: :next  :prev  :toggle N  :refresh  :key SECRET  :doc  :quit";

#[derive(Parser)]
#[command(name = "terminal-wizard")]
#[command(about = "Build an AI prompt one question at a time")]
struct Args {
    /// TOML configuration file; defaults apply when it is missing
    #[arg(long, default_value = "prompt-wizard.toml")]
    config: PathBuf,

    /// Provider id overriding the configuration (openrouter, openai, gemini)
    #[arg(long)]
    provider: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = WizardConfig::load(&args.config)?;
    if let Some(provider) = args.provider {
        config.provider = provider;
        config.validate()?;
    }
    wizard_telemetry::init_tracing(&config.log_filter)?;

    let transport = Arc::new(HyperTransport::new(config.http_timeout()));
    let mut session = WizardSession::open(&config, transport).await?;
    info!(session = %session.id(), provider = %config.provider, "terminal wizard started");

    println!("{HELP}");
    show_step(&session);

    let mut pending: Option<Document> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            ":quit" => break,
            ":next" => match session.next() {
                Ok(Some(Transition::Moved { prefetch, .. })) => {
                    show_step(&session);
                    if let Some(prefetch) = prefetch {
                        report(prefetch.join().await.map_err(SessionError::from));
                        show_suggestions(&session);
                    }
                }
                Ok(Some(Transition::Complete(document))) => {
                    synthesize(&mut session, &document).await;
                    pending = Some(document);
                }
                Ok(None) => {}
                Err(err) => println!("! {err}"),
            },
            ":prev" => {
                if session.prev() == Some(true) {
                    show_step(&session);
                }
            }
            ":toggle" => match rest.trim().parse::<usize>() {
                Ok(number) if number > 0 => match session.toggle(number - 1) {
                    Ok(Some(value)) => println!("= {value}"),
                    Ok(None) => {}
                    Err(err) => println!("! {err}"),
                },
                _ => println!("! usage: :toggle N"),
            },
            ":refresh" => {
                if let Some(outcome) = session.refresh_suggestions().await.transpose() {
                    report(outcome);
                    show_suggestions(&session);
                }
            }
            ":key" => match session.store_credential(Secret::new(rest)).await {
                Ok(()) => {
                    println!("key saved");
                    if let Some(document) = &pending {
                        synthesize(&mut session, document).await;
                    }
                }
                Err(err) => println!("! {err}"),
            },
            ":doc" => println!("{}", session.sequencer().document()),
            ":help" => println!("{HELP}"),
            "" => {}
            _ if command.starts_with(':') => println!("! unknown command; {HELP}"),
            _ => {
                let field = session.sequencer().current_step().field().clone();
                if let Err(err) = session.sequencer_mut().set_field_value(&field, line) {
                    println!("! {err}");
                }
            }
        }
    }

    session.close();
    Ok(())
}

async fn synthesize(session: &mut WizardSession, document: &Document) {
    match session.synthesize(document).await {
        Ok(Some(artifact)) => {
            println!("\n{}\n", artifact.text());
            info!(provider = artifact.provider(), sections = artifact.sections().len(), "prompt ready");
        }
        Ok(None) => {}
        Err(SessionError::Generation(GenerationError::CredentialRequired { provider })) => {
            let hint = session
                .gateway()
                .descriptor(&provider)
                .map(|descriptor| {
                    format!("{} ({})", descriptor.key_placeholder(), descriptor.key_instructions_url())
                })
                .unwrap_or_default();
            println!("an API key for {provider} is needed: :key {hint}");
        }
        Err(err) => println!("! {err}"),
    }
}

fn report(outcome: Result<GenerateOutcome, SessionError>) {
    match outcome {
        Ok(GenerateOutcome::Fallback { notice }) => println!("~ {notice}"),
        Ok(GenerateOutcome::CredentialRequired { provider }) => {
            println!("suggestions need an API key for {provider}: :key SECRET");
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "suggestions failed"),
    }
}

fn show_step(session: &WizardSession) {
    let sequencer = session.sequencer();
    let step = sequencer.current_step();
    let progress = sequencer.progress();
    println!(
        "\n[{}/{}] {}\n{}",
        progress.position + 1,
        progress.total,
        step.title(),
        step.description()
    );
    if let Some(hint) = step.hint() {
        println!("hint: {hint}");
    }
    let value = sequencer.field_value(step.field());
    if !value.is_empty() {
        println!("= {value}");
    }
    println!("(:next for \"{}\")", progress.next_label);
}

fn show_suggestions(session: &WizardSession) {
    let sequencer = session.sequencer();
    let field = sequencer.current_step().field();
    for (n, item) in sequencer.engine().items(field).iter().enumerate() {
        let mark = if item.is_selected() { 'x' } else { ' ' };
        println!("  {}. [{mark}] {}", n + 1, item.text());
    }
}
