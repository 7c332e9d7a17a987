use super::*;

impl Pipeline {
    /// Compiles the job when its SDK needs it. Returns whether the job may
    /// go on to run.
    pub(super) async fn compile(&self, job: &JobMessage) -> bool {
        // `go test` builds the package itself
        if job.unit_test && job.language.sdk == Sdk::Go {
            return true;
        }

        let plan = match builder::build(Phase::Compile, plan_inputs(job)) {
            Ok(Some(plan)) => plan,
            Ok(None) => return true,
            Err(e) => {
                log::warn!("Cannot build compile command for job {}: {e}", job.job_id);
                self.fail_compile(job, e.to_string());
                return false;
            }
        };

        log::debug!("Compiling job {}", job.job_id);
        match self.execute(plan, self.limits.compile_timeout()).await {
            Ok(output) if output.success() => {
                self.results.set_compile_output(job.job_id, output.combined());
                true
            }
            Ok(output) => {
                log::info!("Job {} failed to compile", job.job_id);
                self.fail_compile(job, output.combined());
                false
            }
            Err(e) => {
                log::error!("Failed to run compiler for job {}: {e:#}", job.job_id);
                self.fail_compile(job, format!("{e:#}"));
                false
            }
        }
    }

    /// The output goes in first, so a poller that sees `Error` finds it
    fn fail_compile(&self, job: &JobMessage, output: String) {
        self.results.set_compile_output(job.job_id, output);
        self.results.set_status(job.job_id, JobStatus::Error);
    }
}
