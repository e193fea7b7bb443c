use anyhow::{Result, bail};
use console::style;

use super::RunArgs;
use super::serve::build_state;
use crate::core::config::AppConfig;
use crate::core::jobs::{FINAL_BRIEFING_KEY, JobStatus};
use crate::core::pipeline::MeetingPrepRequest;
use crate::core::terminal;
use crate::logging::{self, LogTarget};

pub(crate) async fn run(args: RunArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    logging::init(&config.log_level, LogTarget::Stderr);

    let state = build_state(config);
    if !state.agents.llm_available() {
        terminal::print_warn("Credentials incomplete; agents will return fallback data.");
    }

    let request = MeetingPrepRequest {
        meeting_context: args.meeting_context,
        include_slack: Some(args.include_slack),
        include_agenda: Some(args.include_agenda),
        focus_mode: args.focus_mode,
        ..MeetingPrepRequest::default()
    };
    let job_id = uuid::Uuid::new_v4().to_string();
    terminal::print_step(&format!("Preparing meeting (job {})", job_id));

    let job = state.pipeline.run_full(&job_id, request).await?;

    for step in &job.progress.completed_steps {
        match job.fallbacks.get(step.as_str()) {
            Some(reason) => terminal::print_warn(&format!("{}: fallback ({})", step, reason)),
            None => terminal::print_success(&format!("{}: done", step)),
        }
    }

    if job.status != JobStatus::Completed {
        bail!(
            "Job {} ended as {}: {}",
            job.job_id,
            job.status,
            job.error.as_deref().unwrap_or("no error recorded")
        );
    }

    match job.results.get(FINAL_BRIEFING_KEY) {
        Some(briefing) => {
            println!();
            println!("{}", briefing.render());
        }
        None => terminal::print_info("No briefing was produced."),
    }
    println!(
        "\n {} {}/{} steps",
        style("Completed").green().bold(),
        job.progress.completed_steps.len(),
        job.progress.total_steps
    );
    Ok(())
}
