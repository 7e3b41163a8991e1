use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use crate::port::Sleeper;

const BRAILLE_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Real waits on the tokio timer, optionally with a spinner for the
/// longer ones (backoff, grace and settle periods).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper {
    spinner: bool,
}

impl TokioSleeper {
    pub fn with_spinner() -> Self {
        Self { spinner: true }
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !self.spinner || duration < Duration::from_secs(1) {
            tokio::time::sleep(duration).await;
            return;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(BRAILLE_SPINNER)
            .template("  {spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("waiting {}s", duration.as_secs()));
        pb.enable_steady_tick(Duration::from_millis(80));
        tokio::time::sleep(duration).await;
        pb.finish_and_clear();
    }
}
