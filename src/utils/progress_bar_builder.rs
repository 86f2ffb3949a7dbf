use crate::api::{ProgressCallback, ProgressEvent};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct ProgressBarBuilder {
    style_template: &'static str,
    message: String,
    tick: Option<Duration>,
}

impl ProgressBarBuilder {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            style_template: "{spinner:.green} [{elapsed_precise}] {msg}",
            message: message.into(),
            tick: None,
        }
    }

    pub(crate) fn with_tick(mut self, interval: Duration) -> Self {
        self.tick = Some(interval);
        self
    }

    pub(crate) fn build(self) -> Result<ProgressBar> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template(self.style_template)?);
        pb.set_message(self.message);

        if let Some(interval) = self.tick {
            pb.enable_steady_tick(interval);
        }

        Ok(pb)
    }
}

/// Mirrors pipeline progress events onto a spinner.
pub(crate) fn spinner_callback(pb: ProgressBar) -> ProgressCallback {
    Arc::new(move |event| match event {
        ProgressEvent::Started { task } => pb.set_message(format!("Running msianalyzer {task}...")),
        ProgressEvent::Message { message, .. } => pb.println(format!("  $ {message}")),
        ProgressEvent::Completed { task } => pb.println(format!("  {task} finished")),
        ProgressEvent::Error { task, error } => pb.println(format!("  {task} failed: {error}")),
    })
}
