use chrono::{Duration, Utc};

use crate::core::agents::StepName;
use crate::core::jobs::{FINAL_BRIEFING_KEY, Job, JobStatus, JobStoreError, JobUpdate, can_transition};

#[test]
fn run_transitions_are_allowed() {
    let path = [
        (JobStatus::Started, JobStatus::Running),
        (JobStatus::Running, JobStatus::Running),
        (JobStatus::Running, JobStatus::Completed),
    ];
    for (from, to) in path {
        assert!(
            can_transition(from, to),
            "expected transition {:?} -> {:?} to be allowed",
            from,
            to
        );
    }
}

#[test]
fn terminal_states_are_final() {
    let terminal = [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled];
    let all = [
        JobStatus::Started,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];
    for from in terminal {
        for to in all {
            assert!(
                !can_transition(from, to),
                "terminal {:?} must not move to {:?}",
                from,
                to
            );
        }
    }
}

#[test]
fn cancel_and_fail_are_allowed_from_active_states() {
    for from in [JobStatus::Started, JobStatus::Running] {
        assert!(can_transition(from, JobStatus::Cancelled));
        assert!(can_transition(from, JobStatus::Failed));
    }
    assert!(!can_transition(JobStatus::Started, JobStatus::Completed));
}

#[test]
fn steps_and_final_briefing_are_recorded() {
    let now = Utc::now();
    let mut job = Job::new("job-1", 2, vec!["calendar".into(), "coordinator".into()], now);
    assert_eq!(job.status, JobStatus::Running);

    job.apply(JobUpdate::StartStep(StepName::Calendar), now).unwrap();
    assert_eq!(job.progress.current_step, Some(StepName::Calendar));

    job.apply(
        JobUpdate::CompleteStep {
            step: StepName::Calendar,
            output: "cal".into(),
            fallback_reason: Some("LLM invoker not configured".into()),
        },
        now,
    )
    .unwrap();
    job.apply(
        JobUpdate::CompleteStep {
            step: StepName::Coordinator,
            output: "brief".into(),
            fallback_reason: None,
        },
        now,
    )
    .unwrap();
    job.apply(
        JobUpdate::Complete {
            final_briefing: Some("brief".into()),
        },
        now,
    )
    .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress.current_step, None);
    assert_eq!(
        job.progress.completed_steps,
        vec![StepName::Calendar, StepName::Coordinator]
    );
    assert_eq!(job.results[FINAL_BRIEFING_KEY], job.results["coordinator"]);
    assert_eq!(job.fallbacks.len(), 1);
    assert!(job.fallbacks.contains_key("calendar"));
}

#[test]
fn rejected_updates_leave_the_record_unchanged() {
    let now = Utc::now();
    let mut job = Job::new("job-2", 4, Vec::new(), now);
    job.apply(JobUpdate::Fail { error: "boom".into() }, now).unwrap();
    let before = job.clone();

    let err = job
        .apply(JobUpdate::StartStep(StepName::Calendar), now)
        .unwrap_err();
    assert_eq!(
        err,
        JobStoreError::InvalidTransition {
            from: JobStatus::Failed,
            to: JobStatus::Running
        }
    );
    assert_eq!(job, before);
}

#[test]
fn updated_at_never_moves_backwards() {
    let now = Utc::now();
    let mut job = Job::new("job-3", 1, Vec::new(), now);
    job.apply(JobUpdate::StartStep(StepName::Calendar), now - Duration::seconds(5))
        .unwrap();
    assert_eq!(job.updated_at, now);
    assert!(job.updated_at >= job.created_at);
}
