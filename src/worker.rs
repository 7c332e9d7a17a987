mod compile;
mod run;
mod validate;

pub use validate::{check_source, is_unit_test, prepare_java_source};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::builder::{self, CommandPlan, Phase, PlanInputs};
use crate::config::LimitsConfig;
use crate::executor::{ProcessExecutor, ProcessOutput};
use crate::queue::{JobMessage, JobQueue};
use crate::results::{JobResults, JobStatus, Sdk};
use crate::workspace::Workspaces;

/// Drives one job through validate, compile and run, publishing every
/// observable transition to the result cache.
///
/// Per job the writes happen in this order, and pollers may see any prefix:
/// compile output, then `Executing`, then run output, then the terminal
/// status. A job that fails before running ends with `Error` right after its
/// compile output (or directly, when validation fails).
pub struct Pipeline {
    results: Arc<JobResults>,
    workspaces: Arc<Workspaces>,
    executor: Arc<dyn ProcessExecutor>,
    limits: LimitsConfig,
}

impl Pipeline {
    pub fn new(
        results: Arc<JobResults>,
        workspaces: Arc<Workspaces>,
        executor: Arc<dyn ProcessExecutor>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            results,
            workspaces,
            executor,
            limits,
        }
    }

    /// Runs `job` to a terminal state and removes its workspace
    pub async fn process(&self, job: &JobMessage) -> JobStatus {
        let status = self.execute_phases(job).await;
        log::info!("Job {} ended with status {status:?}", job.job_id);

        self.cleanup(job);
        status
    }

    async fn execute_phases(&self, job: &JobMessage) -> JobStatus {
        if let Err(e) = self.validate(job) {
            log::warn!("Job {} failed validation: {e:#}", job.job_id);
            self.results.set_status(job.job_id, JobStatus::Error);
            return JobStatus::Error;
        }

        if !self.compile(job).await {
            return JobStatus::Error;
        }

        self.run(job).await
    }

    /// Best effort; failures never touch the job's status
    fn cleanup(&self, job: &JobMessage) {
        if let Err(e) = self.workspaces.delete_executable(&job.paths) {
            log::warn!("Failed to delete executable of job {}: {e:#}", job.job_id);
        }
        if let Err(e) = self.workspaces.delete(&job.paths) {
            log::warn!("Failed to delete workspace of job {}: {e:#}", job.job_id);
        }
    }

    /// Runs `plan` on the blocking pool
    async fn execute(&self, plan: CommandPlan, limit: Duration) -> anyhow::Result<ProcessOutput> {
        let executor = Arc::clone(&self.executor);
        tokio::task::spawn_blocking(move || executor.execute(&plan, limit)).await?
    }
}

fn plan_inputs(job: &JobMessage) -> PlanInputs<'_> {
    PlanInputs {
        paths: &job.paths,
        language: &job.language,
        pipeline_options: &job.pipeline_options,
    }
}

pub async fn worker(
    id: u8,
    pipeline: Arc<Pipeline>,
    queue: Arc<JobQueue>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    log::info!("Worker {id} initialized");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Worker {id} received shutdown signal, stopping");
                break;
            }

            job = queue.pop() => {
                log::info!("Worker {id} got job {} ({}) from queue", job.job_id, job.language.sdk);
                pipeline.process(&job).await;
            }
        };
    }

    log::info!("Worker {id} has shut down gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::cache::{CacheMiss, ResultCache};
    use crate::config::{CommandConfig, LanguageConfig, LogConfigTemplate};
    use crate::results::JobId;

    /// Replays canned outputs and records the plans it was given
    struct ScriptedExecutor {
        outputs: Mutex<VecDeque<anyhow::Result<ProcessOutput>>>,
        plans: Mutex<Vec<CommandPlan>>,
    }

    impl ScriptedExecutor {
        fn new(outputs: Vec<anyhow::Result<ProcessOutput>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                plans: Mutex::new(Vec::new()),
            })
        }

        fn phases(&self) -> Vec<Phase> {
            self.plans.lock().iter().map(|p| p.phase).collect()
        }
    }

    impl ProcessExecutor for ScriptedExecutor {
        fn execute(&self, plan: &CommandPlan, _limit: Duration) -> anyhow::Result<ProcessOutput> {
            self.plans.lock().push(plan.clone());
            self.outputs
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ok("")))
        }
    }

    fn ok(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    fn failed(stderr: &str) -> ProcessOutput {
        ProcessOutput {
            stderr: stderr.to_string(),
            exit_code: Some(1),
            ..Default::default()
        }
    }

    fn language(sdk: Sdk, extension: &str, compiled: bool) -> LanguageConfig {
        let cmd = |command: &str| CommandConfig {
            command: command.to_string(),
            args: Vec::new(),
        };
        LanguageConfig {
            sdk,
            file_extension: extension.to_string(),
            compile: compiled.then(|| cmd("compiler")),
            run: cmd("runner"),
            test: Some(cmd("tester")),
            classpath: Vec::new(),
            project_dir: None,
            log_config: LogConfigTemplate::default(),
        }
    }

    struct Fixture {
        _root: TempDir,
        workspaces: Arc<Workspaces>,
        results: Arc<JobResults>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempdir().unwrap();
            let workspaces = Arc::new(Workspaces::new(root.path()));
            let cache = ResultCache::new(64, Duration::from_secs(60)).unwrap();
            Self {
                _root: root,
                workspaces,
                results: Arc::new(JobResults::new(cache)),
            }
        }

        fn pipeline(&self, executor: Arc<dyn ProcessExecutor>) -> Pipeline {
            self.pipeline_with_limits(executor, LimitsConfig::default())
        }

        fn pipeline_with_limits(
            &self,
            executor: Arc<dyn ProcessExecutor>,
            limits: LimitsConfig,
        ) -> Pipeline {
            Pipeline::new(self.results.clone(), self.workspaces.clone(), executor, limits)
        }

        fn job(&self, language: LanguageConfig, code: &str) -> JobMessage {
            let job_id = JobId::new();
            let unit_test = is_unit_test(language.sdk, code);
            let paths = self.workspaces.prepare(job_id, &language, unit_test).unwrap();
            self.workspaces.write_source(&paths, code).unwrap();
            JobMessage {
                job_id,
                language,
                paths,
                pipeline_options: String::new(),
                unit_test,
            }
        }
    }

    #[tokio::test]
    async fn test_interpreted_job_finishes_without_compile_output() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![Ok(ok("hello\n"))]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(language(Sdk::Python, "py", false), "print('hello')\n");

        let status = pipeline.process(&job).await;

        assert_eq!(status, JobStatus::Finished);
        assert_eq!(fixture.results.status(job.job_id), Ok(JobStatus::Finished));
        assert_eq!(fixture.results.run_output(job.job_id), Ok("hello\n".to_string()));
        assert_eq!(
            fixture.results.compile_output(job.job_id),
            Err(CacheMiss::NotFound)
        );
        assert_eq!(executor.phases(), vec![Phase::Run]);
        assert!(!job.paths.base_dir.exists());
    }

    #[tokio::test]
    async fn test_compile_failure_stops_before_run() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![Ok(failed("error: ';' expected\n"))]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(
            language(Sdk::Java, "java", true),
            "public class Main { void broken( }",
        );

        let status = pipeline.process(&job).await;

        assert_eq!(status, JobStatus::Error);
        assert_eq!(fixture.results.status(job.job_id), Ok(JobStatus::Error));
        assert_eq!(
            fixture.results.compile_output(job.job_id),
            Ok("error: ';' expected\n".to_string())
        );
        assert_eq!(fixture.results.run_output(job.job_id), Err(CacheMiss::NotFound));
        assert_eq!(executor.phases(), vec![Phase::Compile]);
        assert!(!job.paths.base_dir.exists());
    }

    #[tokio::test]
    async fn test_validation_failure_writes_only_status() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(language(Sdk::Java, "java", true), "System.out.println(1);");

        let status = pipeline.process(&job).await;

        assert_eq!(status, JobStatus::Error);
        assert_eq!(fixture.results.status(job.job_id), Ok(JobStatus::Error));
        assert_eq!(
            fixture.results.compile_output(job.job_id),
            Err(CacheMiss::NotFound)
        );
        assert_eq!(fixture.results.run_output(job.job_id), Err(CacheMiss::NotFound));
        assert!(executor.phases().is_empty());
        assert!(!job.paths.base_dir.exists());
    }

    #[tokio::test]
    async fn test_run_failure_records_error_output() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![
            Ok(ok("")),
            Ok(failed("panic: runtime error\n")),
        ]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(
            language(Sdk::Go, "go", true),
            "package main\nfunc main() { panic(1) }\n",
        );

        let status = pipeline.process(&job).await;

        assert_eq!(status, JobStatus::Error);
        assert_eq!(fixture.results.compile_output(job.job_id), Ok(String::new()));
        assert_eq!(
            fixture.results.run_output(job.job_id),
            Ok("panic: runtime error\n".to_string())
        );
        assert_eq!(executor.phases(), vec![Phase::Compile, Phase::Run]);
        assert!(!job.paths.base_dir.exists());
    }

    #[tokio::test]
    async fn test_unspawnable_process_is_a_phase_failure() {
        let fixture = Fixture::new();
        let executor =
            ScriptedExecutor::new(vec![Err(anyhow::anyhow!("No such file or directory"))]);
        let pipeline = fixture.pipeline(executor);
        let job = fixture.job(language(Sdk::Python, "py", false), "print(1)\n");

        assert_eq!(pipeline.process(&job).await, JobStatus::Error);
        let output = fixture.results.run_output(job.job_id).unwrap();
        assert!(output.contains("No such file or directory"));
        assert!(!job.paths.base_dir.exists());
    }

    /// Records the job's cached status at the moment each process starts
    struct StatusWatcher {
        results: Arc<JobResults>,
        job_id: Mutex<Option<JobId>>,
        seen: Mutex<Vec<(Phase, Result<JobStatus, CacheMiss>)>>,
    }

    impl ProcessExecutor for StatusWatcher {
        fn execute(&self, plan: &CommandPlan, _limit: Duration) -> anyhow::Result<ProcessOutput> {
            let job_id = *self.job_id.lock();
            let job_id = job_id.expect("job id is set before processing");
            self.seen.lock().push((plan.phase, self.results.status(job_id)));
            Ok(ok("hello\n"))
        }
    }

    #[tokio::test]
    async fn test_executing_is_visible_only_while_running() {
        let fixture = Fixture::new();
        let watcher = Arc::new(StatusWatcher {
            results: fixture.results.clone(),
            job_id: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = fixture.pipeline(watcher.clone());
        let job = fixture.job(
            language(Sdk::Go, "go", true),
            "package main\nfunc main() { println(\"hello\") }\n",
        );
        *watcher.job_id.lock() = Some(job.job_id);

        assert_eq!(pipeline.process(&job).await, JobStatus::Finished);

        assert_eq!(
            *watcher.seen.lock(),
            vec![
                (Phase::Compile, Err(CacheMiss::NotFound)),
                (Phase::Run, Ok(JobStatus::Executing)),
            ]
        );
        assert_eq!(fixture.results.status(job.job_id), Ok(JobStatus::Finished));
    }

    fn timed_out(phase: Phase) -> ProcessOutput {
        ProcessOutput {
            stderr: format!("{phase} timed out after 1s"),
            timed_out: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_timeouts_are_phase_failures() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![Ok(timed_out(Phase::Compile))]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(language(Sdk::Go, "go", true), "package main\n");

        assert_eq!(pipeline.process(&job).await, JobStatus::Error);
        assert_eq!(
            fixture.results.compile_output(job.job_id),
            Ok("compile timed out after 1s".to_string())
        );
        assert_eq!(fixture.results.run_output(job.job_id), Err(CacheMiss::NotFound));

        let executor = ScriptedExecutor::new(vec![Ok(timed_out(Phase::Run))]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(language(Sdk::Python, "py", false), "while True: pass\n");

        assert_eq!(pipeline.process(&job).await, JobStatus::Error);
        assert_eq!(fixture.results.status(job.job_id), Ok(JobStatus::Error));
        assert_eq!(
            fixture.results.run_output(job.job_id),
            Ok("run timed out after 1s".to_string())
        );
        assert!(!job.paths.base_dir.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_limit_kills_local_process() {
        let fixture = Fixture::new();
        let mut sleeper = language(Sdk::Python, "py", false);
        sleeper.run = CommandConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 10".to_string()],
        };
        let limits = LimitsConfig {
            compile_timeout_secs: 1,
            run_timeout_secs: 1,
        };
        let pipeline =
            fixture.pipeline_with_limits(Arc::new(crate::executor::LocalExecutor), limits);
        let job = fixture.job(sleeper, "print(1)\n");

        let status = tokio::time::timeout(Duration::from_secs(8), pipeline.process(&job))
            .await
            .expect("the run limit should end the job");

        assert_eq!(status, JobStatus::Error);
        let output = fixture.results.run_output(job.job_id).unwrap();
        assert!(output.contains("timed out"), "{output}");
    }

    #[tokio::test]
    async fn test_unit_tests_use_the_test_phase() {
        let fixture = Fixture::new();
        let executor = ScriptedExecutor::new(vec![Ok(ok("1 passed\n"))]);
        let pipeline = fixture.pipeline(executor.clone());
        let job = fixture.job(
            language(Sdk::Python, "py", false),
            "import unittest\n\nclass T(unittest.TestCase):\n    pass\n",
        );

        assert_eq!(pipeline.process(&job).await, JobStatus::Finished);
        assert_eq!(executor.phases(), vec![Phase::Test]);
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancellation() {
        let fixture = Fixture::new();
        let pipeline = Arc::new(fixture.pipeline(ScriptedExecutor::new(vec![])));
        let queue = Arc::new(JobQueue::new());
        let token = CancellationToken::new();

        let handle = tokio::spawn(worker(1, pipeline, queue, token.clone()));
        token.cancel();

        assert!(handle.await.unwrap().is_ok());
    }
}
