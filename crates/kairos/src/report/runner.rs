//! Concurrent report execution: one blocking worker per body, a per-body
//! timeout, and a deadline for the whole request.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};

use crate::chart::NatalChart;
use crate::ephemeris::{CancellablePositions, CelestialBody, PositionSource};
use crate::report::builder::{ReportConfig, TransitReport};
use crate::report::types::BodyOutcome;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerLimits {
    pub per_body_timeout: Duration,
    /// Bodies still running when this elapses are reported as failed.
    pub deadline: Option<Duration>,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            per_body_timeout: Duration::from_secs(30),
            deadline: None,
        }
    }
}

pub struct ReportRunner<P> {
    source: Arc<P>,
    natal: Arc<NatalChart>,
    config: ReportConfig,
    limits: RunnerLimits,
}

impl<P> ReportRunner<P>
where
    P: PositionSource + Send + Sync + 'static,
{
    pub fn new(source: Arc<P>, natal: Arc<NatalChart>, config: ReportConfig) -> Self {
        Self {
            source,
            natal,
            config,
            limits: RunnerLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RunnerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs every body concurrently and returns whatever finished. Workers
    /// share the provider and chart read-only; each memoizes its own samples.
    /// A worker that times out or outlives the deadline is cancelled and
    /// stops at its next sample.
    pub async fn run(
        &self,
        bodies: &[CelestialBody],
        now: DateTime<Utc>,
        horizon_days: f64,
    ) -> BTreeMap<CelestialBody, BodyOutcome> {
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        let mut cancel_flags = Vec::with_capacity(bodies.len());

        for &body in bodies {
            let source = Arc::clone(&self.source);
            let natal = Arc::clone(&self.natal);
            let config = self.config;
            let per_body = self.limits.per_body_timeout;
            let cancel = Arc::new(AtomicBool::new(false));
            cancel_flags.push(Arc::clone(&cancel));
            tasks.spawn(async move {
                let worker_cancel = Arc::clone(&cancel);
                let worker = tokio::task::spawn_blocking(move || {
                    let source = CancellablePositions::new(source.as_ref(), worker_cancel);
                    TransitReport::new(&source, natal.as_ref(), config).body_outcome(body, now, horizon_days)
                });
                let outcome = match timeout(per_body, worker).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => BodyOutcome::Failed {
                        error: format!("worker failed: {}", e),
                    },
                    Err(_) => {
                        cancel.store(true, Ordering::Relaxed);
                        BodyOutcome::Failed {
                            error: format!("timed out after {:?}", per_body),
                        }
                    }
                };
                (body, outcome)
            });
        }

        let mut results = BTreeMap::new();
        let deadline = self.limits.deadline.map(|d| started + d);
        loop {
            let next = match deadline {
                Some(at) => match timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        log::warn!(
                            "Deadline reached with {} of {} bodies finished",
                            results.len(),
                            bodies.len()
                        );
                        tasks.abort_all();
                        for flag in &cancel_flags {
                            flag.store(true, Ordering::Relaxed);
                        }
                        break;
                    }
                },
                None => tasks.join_next().await,
            };
            match next {
                Some(Ok((body, outcome))) => {
                    results.insert(body, outcome);
                }
                Some(Err(e)) => log::error!("Report task failed: {}", e),
                None => break,
            }
        }

        for &body in bodies {
            results.entry(body).or_insert_with(|| BodyOutcome::Failed {
                error: "deadline exceeded".to_string(),
            });
        }
        log::info!(
            "Report finished in {:?}: {} complete, {} failed",
            started.elapsed(),
            results.values().filter(|o| o.is_complete()).count(),
            results.values().filter(|o| !o.is_complete()).count()
        );
        results
    }
}
