use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use url::Url;

use super::prelude::*;
use super::report;
use crate::config::ProbeSettings;

/// Build the HTTP client shared by all workers of a run.
/// The request timeout covers the whole request, connect and response.
pub fn build_client(settings: &ProbeSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.as_str())
        .build()
}

/// Issue one HEAD request and classify the result.
pub async fn head_once(client: &Client, url: Url) -> Classification {
    match client.head(url.clone()).send().await {
        Ok(resp) => Classification::from_status(resp.status().as_u16()),
        Err(e) if e.is_timeout() => {
            log::debug!("HEAD {url} timed out");
            Classification::Failure(FailureKind::Timeout)
        }
        Err(e) => {
            let reason = report(&e);
            log::debug!("HEAD {url} failed: {reason}");
            Classification::Failure(FailureKind::Transport(reason))
        }
    }
}

/// Probes a single target, one attempt after the other.
pub struct Prober {
    target_index: usize,
    url: String,
    repeat_count: u32,
    start_delay: Duration,
    client: Client,
    counters: Arc<TaskCounters>,
    outcomes: UnboundedSender<AttemptOutcome>,
}

impl Prober {
    pub fn new(
        target_index: usize,
        url: impl Into<String>,
        repeat_count: u32,
        client: Client,
        counters: Arc<TaskCounters>,
        outcomes: UnboundedSender<AttemptOutcome>,
    ) -> Self {
        Self {
            target_index,
            url: url.into(),
            repeat_count,
            start_delay: Duration::ZERO,
            client,
            counters,
            outcomes,
        }
    }

    /// Wait this long before the first attempt.
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    /// Run all attempts sequentially and return the final tally.
    ///
    /// A malformed URL fails every attempt without touching the network.
    /// Outcomes are sent best-effort: once the orchestrator stops collecting,
    /// the receiver is gone and the send result is ignored.
    pub async fn run_attempts(self) -> TargetTally {
        if !self.start_delay.is_zero() {
            sleep(self.start_delay).await;
        }

        let parsed = Url::parse(&self.url).map_err(|e| e.to_string());

        for attempt in 0..self.repeat_count {
            let start = Instant::now();
            let classification = match &parsed {
                Ok(url) => head_once(&self.client, url.clone()).await,
                Err(e) => Classification::Failure(FailureKind::InvalidUrl(e.clone())),
            };
            let http_time = start.elapsed().as_secs_f64();

            self.counters.record(classification.is_success());
            let _ = self.outcomes.send(AttemptOutcome {
                target_index: self.target_index,
                url: self.url.clone(),
                attempt,
                classification,
                http_time,
            });
        }

        TargetTally {
            finished: true,
            ..self.counters.snapshot(&self.url)
        }
    }
}
