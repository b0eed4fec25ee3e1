//! Background loop returning expired leases to the queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use exprflow_scheduler::Scheduler;

const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically reclaim leases older than the scheduler's TTL until
/// `shutdown` flips to `true`. A zero `interval` is raised to one millisecond.
pub async fn run_lease_reaper(
    scheduler: Arc<Scheduler>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let Some(ttl) = scheduler.config().lease_ttl else {
        info!("lease TTL disabled, reaper not started");
        return;
    };
    let interval = interval.max(MIN_REAP_INTERVAL);
    info!(?ttl, ?interval, "lease reaper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match scheduler.reclaim_expired_leases(Utc::now()) {
                    Ok(reclaimed) if !reclaimed.is_empty() => {
                        warn!(tasks = ?reclaimed, "requeued tasks with expired leases");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "lease reclamation failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("lease reaper stopped");
}

#[cfg(test)]
mod tests {
    use exprflow_core::TaskStatus;
    use exprflow_scheduler::SchedulerConfig;

    use super::*;

    #[tokio::test]
    async fn reaper_requeues_abandoned_lease() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::default().with_lease_ttl(Duration::from_millis(20)),
        ));
        scheduler.submit("1 + 1").unwrap();
        let task = scheduler.lease_pending("vanished").unwrap().unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_lease_reaper(
            Arc::clone(&scheduler),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let task = scheduler.get_task(task.id).unwrap();
        assert!(task.retries >= 1);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn zero_interval_does_not_kill_the_reaper() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::default().with_lease_ttl(Duration::from_millis(20)),
        ));
        scheduler.submit("1 + 1").unwrap();
        let task = scheduler.lease_pending("vanished").unwrap().unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_lease_reaper(Arc::clone(&scheduler), Duration::ZERO, rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(scheduler.get_task(task.id).unwrap().retries >= 1);
    }

    #[tokio::test]
    async fn reaper_exits_without_ttl() {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
        let (_tx, rx) = watch::channel(false);
        tokio::time::timeout(
            Duration::from_secs(1),
            run_lease_reaper(scheduler, Duration::from_millis(10), rx),
        )
        .await
        .unwrap();
    }
}
