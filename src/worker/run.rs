use super::*;

impl Pipeline {
    /// Runs the program, or its test suite, and records the terminal status
    pub(super) async fn run(&self, job: &JobMessage) -> JobStatus {
        self.results.set_status(job.job_id, JobStatus::Executing);

        let phase = if job.unit_test { Phase::Test } else { Phase::Run };
        let plan = match builder::build(phase, plan_inputs(job)) {
            Ok(Some(plan)) => plan,
            Ok(None) => return self.fail_run(job, format!("no {phase} command configured")),
            Err(e) => {
                log::warn!("Cannot build {phase} command for job {}: {e}", job.job_id);
                return self.fail_run(job, e.to_string());
            }
        };

        log::debug!("Starting {phase} of job {}", job.job_id);
        match self.execute(plan, self.limits.run_timeout()).await {
            Ok(output) if output.success() => {
                self.results.set_run_output(job.job_id, output.stdout);
                self.results.set_status(job.job_id, JobStatus::Finished);
                JobStatus::Finished
            }
            Ok(output) => self.fail_run(job, output.combined()),
            Err(e) => {
                log::error!("Failed to start {phase} of job {}: {e:#}", job.job_id);
                self.fail_run(job, format!("{e:#}"))
            }
        }
    }

    fn fail_run(&self, job: &JobMessage, output: String) -> JobStatus {
        self.results.set_run_output(job.job_id, output);
        self.results.set_status(job.job_id, JobStatus::Error);
        JobStatus::Error
    }
}
