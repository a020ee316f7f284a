use std::io::{self, BufRead, Write};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::PurgeError;

/// Answer the operator has to type to start a purge.
pub const CONFIRMATION_TOKEN: &str = "oui";

/// Pause between confirmation and the first delete.
pub const PRE_RUN_DELAY: Duration = Duration::from_secs(3);

/// Source of the operator's answer to the confirmation prompt.
#[async_trait]
pub trait ConfirmationProvider: Send {
    async fn read_answer(&mut self) -> io::Result<String>;
}

/// Reads the answer as one line from standard input.
pub struct StdinConfirmation;

fn prompt_and_read_line(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<String> {
    write!(output, "Type '{}' to continue: ", CONFIRMATION_TOKEN)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}

#[async_trait]
impl ConfirmationProvider for StdinConfirmation {
    async fn read_answer(&mut self) -> io::Result<String> {
        // Stdin blocks, keep it off the runtime workers
        tokio::task::spawn_blocking(|| {
            prompt_and_read_line(&mut io::stdin().lock(), &mut io::stdout())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Declined,
}

pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().to_lowercase() == CONFIRMATION_TOKEN
}

pub struct ConfirmationGate<P> {
    provider: P,
    force: bool,
    delay: Duration,
}

impl<P: ConfirmationProvider> ConfirmationGate<P> {
    pub fn new(provider: P, force: bool) -> Self {
        ConfirmationGate {
            provider,
            force,
            delay: PRE_RUN_DELAY,
        }
    }

    /// Warns about what is going to be destroyed and waits for the operator.
    ///
    /// With `force` set nothing is read and there is no pause.
    pub async fn confirm(
        &mut self,
        collections: &[String],
        stores: &[String],
    ) -> Result<GateDecision, PurgeError> {
        if self.force {
            info!("confirmation skipped by --force");
            return Ok(GateDecision::Proceed);
        }

        println!("WARNING: this permanently deletes every document in:");
        for collection in collections {
            println!("  - {}", collection);
        }
        for store in stores {
            println!("and everything stored in {}", store);
        }
        println!("This action cannot be undone.");

        let answer = self.provider.read_answer().await?;
        if !is_confirmation(&answer) {
            println!("Aborted, nothing was deleted.");
            return Ok(GateDecision::Declined);
        }

        println!(
            "Starting in {} seconds, press Ctrl-C to abort...",
            self.delay.as_secs()
        );
        tokio::time::sleep(self.delay).await;
        Ok(GateDecision::Proceed)
    }
}
