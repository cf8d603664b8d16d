//! Human confirmation gate for shell commands

use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Decides whether a batch of shell commands may run
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Return `true` to run `commands`
    async fn confirm(&self, commands: &[String]) -> bool;
}

/// Approves everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _commands: &[String]) -> bool {
        true
    }
}

/// Refuses everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl Confirmer for DenyAll {
    async fn confirm(&self, _commands: &[String]) -> bool {
        false
    }
}

/// Asks on the terminal and waits for `y` or `yes`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, commands: &[String]) -> bool {
        let commands = commands.to_vec();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "Executing command:")?;
            for command in &commands {
                writeln!(stdout, "  {}", command)?;
            }
            write!(stdout, "Proceed with command execution? (y/n): ")?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Confirmation prompt task failed: {}", e);
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_confirmers() {
        let commands = vec!["ls".to_string()];
        assert!(AutoApprove.confirm(&commands).await);
        assert!(!DenyAll.confirm(&commands).await);
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }
}
