use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};

use crate::config::ProbeSettings;
use crate::error::ConfigError;
use crate::http_probe::prelude::*;
use crate::report::OutcomeSink;

pub mod summary;

pub use summary::{RunStatus, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    TimedOut,
}

/// Fans out one [`Prober`] per target and merges their tallies.
///
/// Only the task driving [`Orchestrator::run`] touches the summary; workers
/// report through their own counters, the join handle and the outcome channel.
pub struct Orchestrator {
    settings: ProbeSettings,
    sink: Option<Box<dyn OutcomeSink>>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            sink: None,
            state: RunState::Idle,
        }
    }

    /// Forward attempt outcomes to `sink` when running verbose.
    pub fn with_sink(mut self, sink: Box<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub async fn run(&mut self, targets: &[String]) -> Result<RunSummary, ConfigError> {
        if self.state != RunState::Idle {
            self.transition(RunState::Idle);
        }
        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        self.settings.validate()?;
        let client = build_client(&self.settings)?;

        let started_at = Utc::now();
        let start = Instant::now();
        log::info!("Run started at {}", started_at.to_rfc3339());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        let mut counters = Vec::with_capacity(targets.len());

        for (index, url) in targets.iter().enumerate() {
            let task_counters = Arc::new(TaskCounters::new());
            counters.push(task_counters.clone());

            let prober = Prober::new(
                index,
                url.clone(),
                self.settings.repeat_count,
                client.clone(),
                task_counters,
                tx.clone(),
            )
            .with_start_delay(launch_offset(self.settings.stagger, index));

            workers.spawn(async move { (index, prober.run_attempts().await) });
        }
        drop(tx);
        self.transition(RunState::Running);

        // A deadline past the end of the clock means no deadline.
        let deadline = self
            .settings
            .global_deadline
            .and_then(|d| start.checked_add(d));
        let mut last_activity = Instant::now();
        let mut tallies: Vec<Option<TargetTally>> = vec![None; targets.len()];

        let status = loop {
            let idle_deadline = self.settings.idle_timeout.and_then(|d| {
                idle_anchor(
                    last_activity,
                    start,
                    self.settings.stagger,
                    targets.len(),
                    Instant::now(),
                )?
                .checked_add(d)
            });

            tokio::select! {
                biased;

                joined = workers.join_next() => match joined {
                    Some(Ok((index, tally))) => {
                        log::debug!(
                            "{} finished: success {}, failure {}",
                            tally.url, tally.success, tally.failure
                        );
                        tallies[index] = Some(tally);
                    }
                    Some(Err(e)) => log::error!("Probe worker failed: {e}"),
                    None => {
                        while let Ok(outcome) = rx.try_recv() {
                            self.forward(&outcome);
                        }
                        break RunStatus::Completed;
                    }
                },
                Some(outcome) = rx.recv() => {
                    last_activity = Instant::now();
                    self.forward(&outcome);
                }
                _ = wait_until(deadline) => {
                    log::warn!("Run deadline expired after {:?}", start.elapsed());
                    break RunStatus::TimedOut;
                }
                _ = wait_until(idle_deadline) => {
                    log::warn!("No attempt finished for {:?}, stopping", last_activity.elapsed());
                    break RunStatus::TimedOut;
                }
            }
        };

        // Attempts completed so far count; whatever is still in flight does not.
        let tallies: Vec<TargetTally> = tallies
            .into_iter()
            .zip(targets.iter().zip(counters.iter()))
            .map(|(tally, (url, counters))| tally.unwrap_or_else(|| counters.snapshot(url)))
            .collect();
        workers.abort_all();

        self.transition(match status {
            RunStatus::Completed => RunState::Completed,
            RunStatus::TimedOut => RunState::TimedOut,
        });

        Ok(RunSummary::from_tallies(
            started_at,
            start.elapsed(),
            status,
            tallies,
        ))
    }

    fn forward(&mut self, outcome: &AttemptOutcome) {
        if !self.settings.verbose {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.attempt(outcome);
        }
    }
}

/// Delay before worker `index` starts, saturating for huge staggers.
fn launch_offset(stagger: Duration, index: usize) -> Duration {
    u32::try_from(index)
        .ok()
        .and_then(|index| stagger.checked_mul(index))
        .unwrap_or(Duration::MAX)
}

/// Instant the idle timeout counts from: the last outcome, or the start of
/// the next staggered worker if that lies later. `None` when that worker
/// starts beyond the end of the clock.
fn idle_anchor(
    last_activity: Instant,
    start: Instant,
    stagger: Duration,
    workers: usize,
    now: Instant,
) -> Option<Instant> {
    if stagger.is_zero() {
        return Some(last_activity);
    }
    let next = now.saturating_duration_since(start).as_nanos() / stagger.as_nanos() + 1;
    if next >= workers as u128 {
        return Some(last_activity);
    }
    let next_launch = usize::try_from(next)
        .ok()
        .and_then(|next| start.checked_add(launch_offset(stagger, next)))?;
    Some(last_activity.max(next_launch))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Mutex;

    use axum::{Router, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    use super::*;
    use crate::test_support::serve;

    async fn fixture() -> SocketAddr {
        let router = Router::new()
            .route("/ok", get(|| async { StatusCode::OK }))
            .route("/bad", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/delayed",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    StatusCode::OK
                }),
            )
            .route(
                "/hang",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    StatusCode::OK
                }),
            );
        serve(router).await
    }

    fn settings(repeat_count: u32) -> ProbeSettings {
        ProbeSettings {
            repeat_count,
            request_timeout: Duration::from_secs(1),
            ..ProbeSettings::default()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<AttemptOutcome>>>);

    impl OutcomeSink for Recorder {
        fn attempt(&mut self, outcome: &AttemptOutcome) {
            self.0.lock().unwrap().push(outcome.clone());
        }
    }

    #[tokio::test]
    async fn empty_target_list_is_rejected() {
        let mut orchestrator = Orchestrator::new(settings(3));
        let result = orchestrator.run(&[]).await;
        assert!(matches!(result, Err(ConfigError::NoTargets)));
        assert_eq!(orchestrator.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_probing() {
        let mut orchestrator = Orchestrator::new(settings(0));
        let result = orchestrator.run(&["http://127.0.0.1:1/".to_string()]).await;
        assert!(matches!(result, Err(ConfigError::InvalidSetting(_))));
        assert_eq!(orchestrator.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ok_and_bad_targets_are_counted_separately() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/bad")];

        let mut orchestrator = Orchestrator::new(settings(3));
        let summary = orchestrator.run(&targets).await.unwrap();

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(orchestrator.state(), RunState::Completed);
        assert_eq!(summary.success, 3);
        assert_eq!(summary.failure, 3);
        assert_eq!(summary.attempts(), targets.len() as u64 * 3);
        assert_eq!(summary.targets[0].url, targets[0]);
        assert_eq!((summary.targets[0].success, summary.targets[0].failure), (3, 0));
        assert_eq!((summary.targets[1].success, summary.targets[1].failure), (0, 3));
        assert!(summary.targets.iter().all(|t| t.finished));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unreachable_and_malformed_targets_do_not_abort_the_run() {
        let addr = fixture().await;
        let closed = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let targets = vec![
            format!("http://{addr}/ok"),
            format!("http://{closed}/"),
            "::not a url::".to_string(),
        ];

        let summary = Orchestrator::new(settings(2)).run(&targets).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failure, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn targets_are_probed_in_parallel() {
        let addr = fixture().await;
        let targets: Vec<String> = (0..4).map(|_| format!("http://{addr}/delayed")).collect();

        let summary = Orchestrator::new(settings(2)).run(&targets).await.unwrap();
        assert_eq!(summary.success, 8);
        // Sequential probing would take 4 * 2 * 200ms.
        assert!(summary.elapsed >= Duration::from_millis(400));
        assert!(summary.elapsed < Duration::from_millis(1200));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn global_deadline_yields_partial_summary() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/hang")];
        let settings = ProbeSettings {
            repeat_count: 3,
            request_timeout: Duration::from_secs(1),
            global_deadline: Some(Duration::from_millis(500)),
            ..ProbeSettings::default()
        };

        let mut orchestrator = Orchestrator::new(settings);
        let summary = orchestrator.run(&targets).await.unwrap();

        assert_eq!(summary.status, RunStatus::TimedOut);
        assert_eq!(orchestrator.state(), RunState::TimedOut);
        assert!(summary.is_partial());
        assert!(summary.attempts() < 6);
        assert_eq!(summary.targets[0].success, 3);
        assert_eq!(summary.targets[1].attempts(), 0);
        assert!(!summary.targets[1].finished);
        assert!(summary.elapsed < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn idle_timeout_stops_a_stalled_run() {
        let addr = fixture().await;
        let settings = ProbeSettings {
            repeat_count: 2,
            request_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_millis(300)),
            ..ProbeSettings::default()
        };

        let summary = Orchestrator::new(settings)
            .run(&[format!("http://{addr}/hang")])
            .await
            .unwrap();
        assert_eq!(summary.status, RunStatus::TimedOut);
        assert_eq!(summary.attempts(), 0);
        assert!(summary.elapsed < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn verbose_run_forwards_every_attempt_in_order() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/bad")];
        let recorder = Recorder::default();
        let settings = ProbeSettings {
            verbose: true,
            ..settings(3)
        };

        let summary = Orchestrator::new(settings)
            .with_sink(Box::new(recorder.clone()))
            .run(&targets)
            .await
            .unwrap();

        let outcomes = recorder.0.lock().unwrap();
        assert_eq!(outcomes.len() as u64, summary.attempts());
        for index in 0..targets.len() {
            let attempts: Vec<u32> = outcomes
                .iter()
                .filter(|o| o.target_index == index)
                .map(|o| o.attempt)
                .collect();
            assert_eq!(attempts, vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn quiet_run_does_not_forward_attempts() {
        let addr = fixture().await;
        let recorder = Recorder::default();

        Orchestrator::new(settings(2))
            .with_sink(Box::new(recorder.clone()))
            .run(&[format!("http://{addr}/ok")])
            .await
            .unwrap();

        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stagger_delays_later_targets() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/ok")];
        let settings = ProbeSettings {
            stagger: Duration::from_millis(150),
            ..settings(1)
        };

        let summary = Orchestrator::new(settings).run(&targets).await.unwrap();
        assert_eq!(summary.success, 2);
        assert!(summary.elapsed >= Duration::from_millis(150));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn repeated_runs_yield_identical_counts() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/bad")];

        let mut orchestrator = Orchestrator::new(settings(4));
        let first = orchestrator.run(&targets).await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Completed);
        let second = orchestrator.run(&targets).await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Completed);

        assert_eq!((first.success, first.failure), (second.success, second.failure));
        assert_eq!(first.targets, second.targets);
    }

    #[tokio::test]
    async fn rejected_rerun_returns_to_idle() {
        let addr = fixture().await;
        let mut orchestrator = Orchestrator::new(settings(1));
        orchestrator.run(&[format!("http://{addr}/ok")]).await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Completed);

        let result = orchestrator.run(&[]).await;
        assert!(matches!(result, Err(ConfigError::NoTargets)));
        assert_eq!(orchestrator.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unbounded_timers_do_not_overflow() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/bad")];
        let settings = ProbeSettings {
            global_deadline: Some(Duration::from_secs(u64::MAX)),
            idle_timeout: Some(Duration::from_secs(u64::MAX)),
            ..settings(2)
        };

        let summary = Orchestrator::new(settings).run(&targets).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.attempts(), 4);
    }

    #[tokio::test]
    async fn huge_stagger_only_delays_later_targets() {
        let addr = fixture().await;
        let targets = vec![format!("http://{addr}/ok"), format!("http://{addr}/ok")];
        let settings = ProbeSettings {
            stagger: Duration::from_secs(u64::MAX),
            global_deadline: Some(Duration::from_millis(300)),
            idle_timeout: Some(Duration::from_millis(100)),
            ..settings(1)
        };

        let summary = Orchestrator::new(settings).run(&targets).await.unwrap();
        assert_eq!(summary.status, RunStatus::TimedOut);
        assert_eq!(summary.targets[0].success, 1);
        assert_eq!(summary.targets[1].attempts(), 0);
    }

    #[test]
    fn launch_offset_saturates() {
        assert_eq!(launch_offset(Duration::from_millis(100), 3), Duration::from_millis(300));
        assert_eq!(launch_offset(Duration::from_secs(u64::MAX), 2), Duration::MAX);
        assert_eq!(launch_offset(Duration::from_secs(u64::MAX), 0), Duration::ZERO);
    }

    #[test]
    fn idle_anchor_waits_for_pending_launches() {
        let start = Instant::now();
        let stagger = Duration::from_secs(2);
        let last = start + Duration::from_millis(40);

        assert_eq!(
            idle_anchor(last, start, Duration::ZERO, 3, start + Duration::from_millis(50)),
            Some(last)
        );
        assert_eq!(
            idle_anchor(last, start, stagger, 3, start + Duration::from_millis(50)),
            Some(start + Duration::from_secs(2))
        );
        let late = start + Duration::from_millis(4100);
        assert_eq!(idle_anchor(late, start, stagger, 3, late), Some(late));
        assert_eq!(
            idle_anchor(last, start, Duration::from_secs(u64::MAX), 3, last),
            None
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn idle_timeout_spans_stagger_gaps() {
        let addr = fixture().await;
        let targets: Vec<String> = (0..3).map(|_| format!("http://{addr}/ok")).collect();
        let settings = ProbeSettings {
            stagger: Duration::from_millis(400),
            idle_timeout: Some(Duration::from_millis(200)),
            ..settings(1)
        };

        let summary = Orchestrator::new(settings).run(&targets).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.success, 3);
        assert!(summary.elapsed >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_workers_win_over_an_expired_deadline() {
        let targets = vec!["::not a url::".to_string(), "::also not::".to_string()];
        let settings = ProbeSettings {
            global_deadline: Some(Duration::from_millis(1)),
            ..settings(1)
        };
        let mut orchestrator = Orchestrator::new(settings);

        // The clock jumps past the deadline while the workers complete, so
        // both are ready when the run looks again.
        let (summary, ()) = tokio::join!(orchestrator.run(&targets), async {
            tokio::time::advance(Duration::from_millis(5)).await;
        });

        let summary = summary.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.failure, 2);
    }
}
