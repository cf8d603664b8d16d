//! Interactive prompt loop

use anyhow::{Context, Result};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use t2c_agent::{
    AgentDriver, AgentError, AgenticEvent, AutoApprove, ChatClient, Confirmer, StdinConfirmer,
};
use t2c_core::{resolve_api_key, Config};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Render one event the way it appears in the transcript
fn render_event(event: &AgenticEvent) -> String {
    match event {
        AgenticEvent::ToolCall { name, input, .. } => format!("Invoking: {} with {}", name, input),
        AgenticEvent::ToolResult {
            content, is_error, ..
        } => {
            if *is_error {
                format!("Error: {}", content)
            } else {
                content.clone()
            }
        }
        AgenticEvent::TextResponse { text } => text.clone(),
    }
}

/// Print `Prompt: ` and read one line; `None` at end of input
async fn read_prompt() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "Prompt: ")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    })
    .await?
    .context("Failed to read from stdin")
}

/// Forward every Ctrl-C for the life of the process
fn listen_for_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// What happened while waiting at the prompt
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Closed,
    Interrupted,
}

async fn next_input<F>(read: F, interrupts: &mut mpsc::UnboundedReceiver<()>) -> Result<Input>
where
    F: Future<Output = Result<Option<String>>>,
{
    tokio::select! {
        line = read => Ok(match line? {
            Some(line) => Input::Line(line),
            None => Input::Closed,
        }),
        Some(()) = interrupts.recv() => Ok(Input::Interrupted),
    }
}

/// Drive a turn to completion, printing events as they arrive and cancelling on Ctrl-C
async fn watch_turn<F>(
    turn: F,
    events: &mut mpsc::UnboundedReceiver<AgenticEvent>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
    cancel: &CancellationToken,
) -> F::Output
where
    F: Future,
{
    tokio::pin!(turn);
    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            Some(event) = events.recv() => println!("{}", render_event(&event)),
            Some(()) = interrupts.recv() => cancel.cancel(),
        }
    };

    while let Ok(event) = events.try_recv() {
        println!("{}", render_event(&event));
    }
    // A Ctrl-C that raced the end of the turn must not end the session
    while interrupts.try_recv().is_ok() {}

    result
}

/// Run the prompt loop until stdin closes or Ctrl-C is pressed at the prompt
pub async fn run(config: Config) -> Result<()> {
    let project_root = config
        .project_root
        .clone()
        .context("Configuration has no project root")?;
    let api_key = resolve_api_key(&project_root)?;

    let client = Arc::new(ChatClient::from_config(api_key, &config.agent));
    let confirmer: Arc<dyn Confirmer> = if config.shell.require_confirmation {
        Arc::new(StdinConfirmer)
    } else {
        Arc::new(AutoApprove)
    };

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut driver = AgentDriver::from_config(&config, client, confirmer).with_event_sender(tx);
    let mut interrupts = listen_for_interrupts();

    tracing::info!(
        workspace = %config.workspace_root().display(),
        model = %config.agent.model,
        "ready; Ctrl-C cancels a running request or quits at the prompt"
    );

    loop {
        let line = match next_input(read_prompt(), &mut interrupts).await? {
            Input::Line(line) => line,
            Input::Closed => break,
            Input::Interrupted => {
                println!();
                // The stdin reader thread cannot be interrupted, so do not wait for it
                std::process::exit(130);
            }
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let result = watch_turn(
            driver.run_turn(prompt, &cancel),
            &mut events,
            &mut interrupts,
            &cancel,
        )
        .await;

        match result {
            Ok(outcome) => {
                tracing::debug!("Turn finished after {} model calls", outcome.iterations)
            }
            Err(AgentError::Cancelled) => println!("Cancelled."),
            Err(e) => {
                tracing::error!("Agent error: {:?}", e);
                println!("Error: {}", e);
            }
        }
    }

    println!();
    Ok(())
}
