//! The tick scheduler (spec.md §4.6): fires each of the nine ticks on its
//! own interval, self-excluding via [`TickStatusBoard`] so a tick never
//! overlaps itself, and draining in-flight fires on shutdown up to a hard
//! timeout. Grounded on `mqk-daemon::state::spawn_heartbeat`'s
//! `tokio::time::interval` loop, generalized from one timer to nine and
//! given a cooperative shutdown path the teacher's heartbeat didn't need.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::context::TickContext;
use crate::status::TickStatusBoard;
use crate::{agent_decision, balances, chat, discovery, executor, payout_rules, price, poll, scheduler};

/// Owns every tick loop for one process. `status()` is what `dw-daemon`'s
/// `GET /api/status` reads.
pub struct TickScheduler {
    ctx: Arc<TickContext>,
    status: Arc<TickStatusBoard>,
}

impl TickScheduler {
    pub fn new(ctx: Arc<TickContext>) -> Self {
        TickScheduler {
            ctx,
            status: Arc::new(TickStatusBoard::new()),
        }
    }

    pub fn status(&self) -> Arc<TickStatusBoard> {
        self.status.clone()
    }

    /// Spawns all nine tick loops and blocks until `shutdown` is signaled,
    /// then waits up to `ctx.config.shutdown_drain_timeout` for in-flight
    /// fires to finish before returning.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let intervals = self.ctx.config.intervals.clone();
        let drain_timeout = self.ctx.config.shutdown_drain_timeout;

        let handles = vec![
            self.spawn_tick("discovery", intervals.discovery, shutdown.clone(), discovery::run),
            self.spawn_tick("poll", intervals.poll, shutdown.clone(), poll::run),
            self.spawn_tick("executor", intervals.executor, shutdown.clone(), executor::run),
            self.spawn_tick("chat", intervals.chat, shutdown.clone(), chat::run),
            self.spawn_tick("balances", intervals.balances, shutdown.clone(), balances::run),
            self.spawn_tick("scheduler", intervals.scheduler, shutdown.clone(), scheduler::run),
            self.spawn_tick("price", intervals.price, shutdown.clone(), price::run),
            self.spawn_tick("agent_decision", intervals.agent_decision, shutdown.clone(), agent_decision::run),
            self.spawn_tick("payout_rules", intervals.payout_rules, shutdown.clone(), payout_rules::run),
        ];

        for handle in handles {
            if tokio::time::timeout(drain_timeout, handle).await.is_err() {
                tracing::warn!("a tick loop did not drain within the shutdown timeout");
            }
        }
    }

    fn spawn_tick<F, Fut>(
        &self,
        name: &'static str,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        tick_fn: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Arc<TickContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        let status = self.status.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !status.try_start(name).await {
                            // Self-exclusion (spec.md §4.6): previous fire still running.
                            continue;
                        }
                        let error = tick_fn(ctx.clone()).await.err().map(|e| e.to_string());
                        if let Some(msg) = &error {
                            tracing::warn!(tick = name, error = %msg, "tick fire returned an error");
                        }
                        status.finish(name, error).await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}
