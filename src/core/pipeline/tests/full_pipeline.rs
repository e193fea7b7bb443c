use std::sync::Arc;

use super::{FailingAgent, live_pipeline, offline_pipeline, pipeline_with};
use crate::core::agents::tests::ScriptedInvoker;
use crate::core::agents::{AgentOutput, StepName};
use crate::core::jobs::{FINAL_BRIEFING_KEY, JobStatus, JobStoreError};
use crate::core::pipeline::{MeetingPrepRequest, full_plan};
use crate::core::service::AgentRoster;

#[test]
fn plan_lengths_follow_flags() {
    assert_eq!(full_plan(true, false).len(), 5);
    assert_eq!(full_plan(false, false).len(), 4);
    assert_eq!(full_plan(true, true).len(), 6);
    assert_eq!(
        full_plan(false, true),
        vec![
            StepName::Calendar,
            StepName::PeopleResearch,
            StepName::TechnicalContext,
            StepName::AgendaBuilder,
            StepName::Coordinator,
        ]
    );
}

#[tokio::test]
async fn offline_run_completes_on_fallbacks() {
    let pipeline = offline_pipeline();
    let job = pipeline
        .run_full("job-a", MeetingPrepRequest::default())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress.current_step, None);
    assert_eq!(job.progress.total_steps, 5);
    assert_eq!(job.progress.completed_steps, full_plan(true, false));
    assert!(job.error.is_none());
    assert_eq!(job.results.len(), 6);
    assert_eq!(job.results[FINAL_BRIEFING_KEY], job.results["coordinator"]);
    assert_eq!(job.fallbacks.len(), 5);
    assert!(
        job.fallbacks
            .values()
            .all(|reason| reason == "LLM invoker not configured")
    );
    assert!(job.updated_at >= job.created_at);
}

#[tokio::test]
async fn fallback_output_is_deterministic() {
    let pipeline = offline_pipeline();
    let first = pipeline
        .run_full("one", MeetingPrepRequest::default())
        .await
        .unwrap();
    let second = pipeline
        .run_full("two", MeetingPrepRequest::default())
        .await
        .unwrap();
    assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn without_slack_runs_four_steps() {
    let pipeline = offline_pipeline();
    let request = MeetingPrepRequest {
        include_slack: Some(false),
        ..MeetingPrepRequest::default()
    };
    let job = pipeline.run_full("job-b", request).await.unwrap();
    assert_eq!(job.progress.total_steps, 4);
    assert_eq!(job.progress.completed_steps.len(), 4);
    assert!(!job.results.contains_key("slack_context"));
}

#[tokio::test]
async fn null_flags_use_defaults() {
    let request: MeetingPrepRequest =
        serde_json::from_value(serde_json::json!({"include_slack": null, "include_agenda": null}))
            .unwrap();
    let job = offline_pipeline().run_full("job-null", request).await.unwrap();
    assert_eq!(job.progress.completed_steps, full_plan(true, false));
}

#[tokio::test]
async fn agenda_feeds_the_coordinator() {
    let pipeline = offline_pipeline();
    let request = MeetingPrepRequest {
        include_agenda: Some(true),
        focus_mode: Some("blockers".into()),
        ..MeetingPrepRequest::default()
    };
    let job = pipeline.run_full("job-c", request).await.unwrap();
    assert_eq!(job.progress.completed_steps.len(), 6);

    let AgentOutput::Structured(agenda) = &job.results["agenda_builder"] else {
        panic!("agenda should be structured");
    };
    assert_eq!(agenda["focus_mode"], "blockers");
    assert_eq!(agenda["meeting_title"], "Ledger Sync Architecture Review");

    let briefing = job.results[FINAL_BRIEFING_KEY].as_text().unwrap();
    assert!(briefing.contains("## Proposed Agenda"));
    assert!(briefing.contains("Critical Blockers Review"));
}

#[tokio::test]
async fn failing_step_keeps_only_earlier_steps() {
    let roster =
        AgentRoster::new(None).with_agent(Arc::new(FailingAgent(StepName::TechnicalContext)));
    let pipeline = pipeline_with(roster, None, None);

    let job = pipeline
        .run_full("job-d", MeetingPrepRequest::default())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("upstream payload was not an object"));
    assert_eq!(
        job.progress.completed_steps,
        vec![StepName::Calendar, StepName::PeopleResearch]
    );
    assert_eq!(job.progress.current_step, None);
    assert_eq!(
        job.results.keys().collect::<Vec<_>>(),
        vec!["calendar", "people_research"]
    );
}

#[tokio::test]
async fn live_invoker_records_no_fallbacks() {
    let invoker = Arc::new(ScriptedInvoker::replying("# Live briefing"));
    let pipeline = live_pipeline(invoker.clone());
    let job = pipeline
        .run_full("job-e", MeetingPrepRequest::default())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.fallbacks.is_empty());
    assert_eq!(job.results[FINAL_BRIEFING_KEY], AgentOutput::from("# Live briefing"));
    assert_eq!(invoker.prompts.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn failed_invocations_fall_back_and_still_complete() {
    let invoker = Arc::new(ScriptedInvoker::failing("quota exceeded"));
    let pipeline = live_pipeline(invoker);
    let job = pipeline
        .run_full("job-f", MeetingPrepRequest::default())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.fallbacks["coordinator"], "invocation failed: quota exceeded");
}

#[tokio::test]
async fn duplicate_job_ids_are_rejected() {
    let pipeline = offline_pipeline();
    pipeline
        .run_full("dup", MeetingPrepRequest::default())
        .await
        .unwrap();
    let err = pipeline
        .run_full("dup", MeetingPrepRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err, JobStoreError::AlreadyExists("dup".into()));
}

#[tokio::test]
async fn concurrent_jobs_are_independent() {
    let roster =
        AgentRoster::new(None).with_agent(Arc::new(FailingAgent(StepName::SlackContext)));
    let pipeline = pipeline_with(roster, None, None);

    let mut handles = Vec::new();
    for i in 0..6 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let request = MeetingPrepRequest {
                include_slack: Some(i % 2 == 0),
                ..MeetingPrepRequest::default()
            };
            pipeline.run_full(&format!("job-{}", i), request).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let job = handle.await.unwrap().unwrap();
        if i % 2 == 0 {
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.progress.completed_steps.len(), 3);
        } else {
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.progress.completed_steps.len(), 4);
        }
    }
    assert_eq!(pipeline.jobs().list().await.len(), 6);
}

#[tokio::test]
async fn spawned_job_is_visible_immediately() {
    let pipeline = offline_pipeline();
    let job = pipeline
        .spawn_full(MeetingPrepRequest::default())
        .await
        .unwrap();
    assert_eq!(uuid::Uuid::parse_str(&job.job_id).unwrap().get_version_num(), 4);

    let fetched = pipeline.jobs().get(&job.job_id).await.unwrap();
    assert_eq!(fetched.job_id, job.job_id);

    let done = super::wait_for_terminal(&pipeline, &job.job_id).await;
    assert_eq!(done.status, JobStatus::Completed);
}
