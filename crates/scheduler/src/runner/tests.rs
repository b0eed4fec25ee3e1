use std::time::Duration;

use chrono::Utc;

use exprflow_core::config::OperationTimes;
use exprflow_core::{JobStatus, Operator, TaskStatus};

use crate::error::SchedulerError;
use crate::parser::SyntaxError;
use crate::runner::Scheduler;
use crate::types::SchedulerConfig;

fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::default().with_operation_times(OperationTimes::uniform(0)))
}

/// Lease and complete tasks until the queue is empty, computing locally.
fn drain(scheduler: &Scheduler) -> usize {
    let mut completed = 0;
    while let Some(task) = scheduler.lease_pending("drain").unwrap() {
        let value = task.operator.apply(task.arg1, task.arg2).unwrap();
        scheduler.complete(task.id, value).unwrap();
        completed += 1;
    }
    completed
}

#[test]
fn job_ids_increase_from_one() {
    let s = scheduler();
    assert_eq!(s.submit("1 + 1").unwrap().id, 1);
    assert_eq!(s.submit("2 + 2").unwrap().id, 2);
    let ids: Vec<_> = s.jobs().unwrap().iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn syntax_error_creates_nothing() {
    let s = scheduler();
    let err = s.submit("2 + + 3").unwrap_err();
    assert!(matches!(err, SchedulerError::Syntax(SyntaxError::ExpectedOperand { .. })));
    assert!(s.jobs().unwrap().is_empty());
    assert_eq!(s.metrics().unwrap().jobs_submitted, 0);
}

#[test]
fn stored_expression_is_trimmed() {
    let s = scheduler();
    let submitted = s.submit("  1 + 2\n").unwrap();
    assert_eq!(submitted.expression, "1 + 2");
    assert_eq!(s.job(submitted.id).unwrap().expression, "1 + 2");
}

#[test]
fn literal_finishes_immediately() {
    let s = scheduler();
    let submitted = s.submit("5").unwrap();
    assert_eq!(submitted.status, JobStatus::Done);

    let job = s.job(submitted.id).unwrap();
    assert_eq!(job.result, Some(5.0));
    assert!(job.steps.is_empty());
    assert!(job.finished_at.is_some());
    assert!(!s.has_pending(submitted.id).unwrap());
    assert!(s.lease_pending("a").unwrap().is_none());
}

#[test]
fn only_multiplication_is_ready_first() {
    let s = scheduler();
    s.submit("2 + 2 * 2").unwrap();

    let task = s.lease_pending("a").unwrap().unwrap();
    assert_eq!(task.operator, Operator::Mul);
    assert_eq!((task.arg1, task.arg2), (2.0, 2.0));
    assert!(!task.is_final);
    assert!(s.lease_pending("a").unwrap().is_none());
}

#[test]
fn independent_products_are_emitted_together() {
    let s = scheduler();
    s.submit("2 * 3 + 4 * 5").unwrap();

    let first = s.lease_pending("a").unwrap().unwrap();
    let second = s.lease_pending("b").unwrap().unwrap();
    assert_eq!((first.operator, first.arg1, first.arg2), (Operator::Mul, 2.0, 3.0));
    assert_eq!((second.operator, second.arg1, second.arg2), (Operator::Mul, 4.0, 5.0));
    assert!(s.lease_pending("c").unwrap().is_none());

    // The sum waits for both products.
    s.complete(second.id, 20.0).unwrap();
    assert!(s.lease_pending("c").unwrap().is_none());
    s.complete(first.id, 6.0).unwrap();

    let sum = s.lease_pending("c").unwrap().unwrap();
    assert_eq!((sum.operator, sum.arg1, sum.arg2), (Operator::Add, 6.0, 20.0));
    assert!(sum.is_final);
}

#[test]
fn end_to_end_nested_expression() {
    let s = scheduler();
    let id = s.submit("2 * (3 + 4)").unwrap().id;
    assert_eq!(s.job(id).unwrap().status, JobStatus::Pending);

    let add = s.lease_pending("a").unwrap().unwrap();
    assert_eq!(add.operator, Operator::Add);
    assert_eq!(s.job(id).unwrap().status, JobStatus::InProgress);
    assert!(s.has_pending(id).unwrap());

    s.complete(add.id, 7.0).unwrap();
    assert!(s.has_pending(id).unwrap());

    let mul = s.lease_pending("a").unwrap().unwrap();
    assert_eq!((mul.operator, mul.arg1, mul.arg2), (Operator::Mul, 2.0, 7.0));
    assert!(mul.is_final);
    s.complete(mul.id, 14.0).unwrap();

    let job = s.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result, Some(14.0));
    assert_eq!(job.steps, vec!["3.00 + 4.00 = 7.00", "2.00 * 7.00 = 14.00"]);
    assert!(!s.has_pending(id).unwrap());
}

#[test]
fn distributed_result_matches_local_evaluation() {
    let s = scheduler();
    let input = "(1 + 2) * (3 - 4) / 5 + 6 * 7 - 8";
    let expected = crate::parser::parse(input).unwrap().evaluate().unwrap();

    let id = s.submit(input).unwrap().id;
    assert_eq!(drain(&s), 7);

    let job = s.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result, Some(expected));
    assert_eq!(job.steps.len(), 7);
}

#[test]
fn interleaved_jobs_stay_independent() {
    let s = scheduler();
    let a = s.submit("1 + 2 * 3").unwrap().id;
    let b = s.submit("(4 - 1) / 3").unwrap().id;
    drain(&s);

    assert_eq!(s.job(a).unwrap().result, Some(7.0));
    assert_eq!(s.job(b).unwrap().result, Some(1.0));
}

#[test]
fn fail_requeues_with_retry() {
    let s = scheduler();
    s.submit("1 + 1").unwrap();

    let task = s.lease_pending("a").unwrap().unwrap();
    let failed = s.fail(task.id).unwrap();
    assert_eq!(failed.status, TaskStatus::Pending);
    assert_eq!(failed.retries, 1);

    let again = s.lease_pending("b").unwrap().unwrap();
    assert_eq!(again.id, task.id);
    assert_eq!(again.retries, 1);
    assert_eq!(again.leased_by.as_deref(), Some("b"));
}

#[test]
fn invalid_transitions_are_rejected() {
    let s = scheduler();
    s.submit("1 + 1").unwrap();

    assert_eq!(s.complete(42, 1.0), Err(SchedulerError::TaskNotFound(42)));
    assert_eq!(
        s.complete(1, 2.0),
        Err(SchedulerError::StateConflict { task_id: 1, status: TaskStatus::Pending })
    );
    assert_eq!(
        s.fail(1),
        Err(SchedulerError::StateConflict { task_id: 1, status: TaskStatus::Pending })
    );

    s.lease_pending("a").unwrap();
    s.complete(1, 2.0).unwrap();
    assert_eq!(
        s.complete(1, 2.0),
        Err(SchedulerError::StateConflict { task_id: 1, status: TaskStatus::Done })
    );
    assert_eq!(s.get_task(1).unwrap().result, Some(2.0));
}

#[test]
fn unknown_job() {
    let s = scheduler();
    assert_eq!(s.job(9), Err(SchedulerError::JobNotFound(9)));
    assert_eq!(s.has_pending(9), Err(SchedulerError::JobNotFound(9)));
}

#[test]
fn retry_ceiling_fails_the_job() {
    let s = Scheduler::new(SchedulerConfig::default().with_max_retries(1));
    let id = s.submit("1 + 2 * 3").unwrap().id;

    let task = s.lease_pending("a").unwrap().unwrap();
    s.fail(task.id).unwrap();
    let task = s.lease_pending("a").unwrap().unwrap();
    let err = s.fail(task.id).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::RetryLimitExceeded { task_id: task.id, job_id: id, max_retries: 1 }
    );

    let job = s.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.result, None);
    assert!(job.finished_at.is_some());
    assert!(!s.has_pending(id).unwrap());
    assert!(s.lease_pending("a").unwrap().is_none());
    assert_eq!(s.metrics().unwrap().jobs_failed, 1);
}

#[test]
fn zero_retry_ceiling_fails_on_first_failure() {
    let s = Scheduler::new(SchedulerConfig::default().with_max_retries(0));
    s.submit("1 + 1").unwrap();
    let task = s.lease_pending("a").unwrap().unwrap();
    assert!(matches!(s.fail(task.id), Err(SchedulerError::RetryLimitExceeded { .. })));
}

#[test]
fn expired_leases_are_reclaimed() {
    let s = Scheduler::new(SchedulerConfig::default().with_lease_ttl(Duration::from_secs(10)));
    s.submit("1 + 1").unwrap();
    let task = s.lease_pending("crashed").unwrap().unwrap();

    assert!(s.reclaim_expired_leases(Utc::now()).unwrap().is_empty());

    let later = Utc::now() + chrono::Duration::seconds(20);
    assert_eq!(s.reclaim_expired_leases(later).unwrap(), vec![task.id]);

    let requeued = s.get_task(task.id).unwrap();
    assert_eq!(requeued.status, TaskStatus::Pending);
    assert_eq!(requeued.retries, 1);
    assert_eq!(s.metrics().unwrap().leases_reclaimed, 1);

    // The late agent can no longer report.
    assert!(matches!(s.complete(task.id, 2.0), Err(SchedulerError::StateConflict { .. })));
}

#[test]
fn reclaim_skips_tasks_discarded_by_a_failed_job() {
    let s = Scheduler::new(
        SchedulerConfig::default()
            .with_max_retries(0)
            .with_lease_ttl(Duration::from_secs(1)),
    );
    let first = s.submit("(1 + 1) * (2 + 2)").unwrap().id;
    let second = s.submit("3 + 3").unwrap().id;
    let a = s.lease_pending("a").unwrap().unwrap();
    let b = s.lease_pending("a").unwrap().unwrap();
    let c = s.lease_pending("a").unwrap().unwrap();
    assert_eq!((a.job_id, b.job_id, c.job_id), (first, first, second));

    let later = Utc::now() + chrono::Duration::seconds(60);
    let reclaimed = s.reclaim_expired_leases(later).unwrap();
    assert_eq!(reclaimed, vec![a.id, c.id]);

    assert_eq!(s.job(first).unwrap().status, JobStatus::Failed);
    assert_eq!(s.job(second).unwrap().status, JobStatus::Failed);
    assert_eq!(s.get_task(b.id), Err(SchedulerError::TaskNotFound(b.id)));
    let metrics = s.metrics().unwrap();
    assert_eq!(metrics.leases_reclaimed, 2);
    assert_eq!(metrics.jobs_failed, 2);
}

#[test]
fn reclaim_without_ttl_is_a_no_op() {
    let s = scheduler();
    s.submit("1 + 1").unwrap();
    s.lease_pending("a").unwrap();
    let far = Utc::now() + chrono::Duration::days(1);
    assert!(s.reclaim_expired_leases(far).unwrap().is_empty());
}

#[test]
fn operation_times_follow_operator() {
    let times = OperationTimes {
        addition_ms: 10,
        subtraction_ms: 20,
        multiplication_ms: 30,
        division_ms: 40,
    };
    let s = Scheduler::new(SchedulerConfig::default().with_operation_times(times));
    s.submit("8 / 2").unwrap();
    let task = s.lease_pending("a").unwrap().unwrap();
    assert_eq!(task.operation_time_ms, 40);
    assert_eq!(task.info().operation_time, 40);
    assert_eq!(task.info().operation, "/");
}

#[test]
fn metrics_track_lifecycle() {
    let s = scheduler();
    s.submit("1 + 2 * 3").unwrap();
    s.submit("4").unwrap();

    let task = s.lease_pending("a").unwrap().unwrap();
    s.fail(task.id).unwrap();
    drain(&s);

    let m = s.metrics().unwrap();
    assert_eq!(m.jobs_submitted, 2);
    assert_eq!(m.jobs_done, 2);
    assert_eq!(m.tasks_emitted, 2);
    assert_eq!(m.tasks_completed, 2);
    assert_eq!(m.task_failures, 1);
    assert_eq!(m.tasks.done, 2);
    assert_eq!(m.tasks.pending + m.tasks.in_progress, 0);
}
