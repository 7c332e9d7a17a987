mod plan;
mod sdk;

pub use plan::{CommandPlan, CommandPlanBuilder};
pub use sdk::replace_log_placeholder;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::LanguageConfig;
use crate::results::Sdk;
use crate::workspace::WorkspacePaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Compile,
    Run,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compile => "compile",
            Self::Run => "run",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing {0}")]
    MissingAttribute(&'static str),
    #[error("no .{extension} file found in {}", dir.display())]
    NoSourceFile { dir: PathBuf, extension: String },
    #[error("expected one .{extension} file in {}, found {count}", dir.display())]
    AmbiguousSourceFile {
        dir: PathBuf,
        extension: String,
        count: usize,
    },
    #[error("cannot read {}: {source}", dir.display())]
    UnreadableFolder {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read {}: {source}", file.display())]
    UnreadableSource {
        file: PathBuf,
        source: std::io::Error,
    },
    #[error("no top-level object found in {}", file.display())]
    NoMainObject { file: PathBuf },
    #[error("{sdk} has no {phase} phase")]
    UnsupportedPhase { sdk: Sdk, phase: Phase },
}

/// Everything a plan is derived from
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs<'a> {
    pub paths: &'a WorkspacePaths,
    pub language: &'a LanguageConfig,
    pub pipeline_options: &'a str,
}

/// Builds the command plan of `phase` for the SDK of `inputs.language`.
///
/// `Ok(None)` means the phase has nothing to execute, as compiling an
/// interpreted SDK.
pub fn build(phase: Phase, inputs: PlanInputs<'_>) -> Result<Option<CommandPlan>, BuildError> {
    match phase {
        Phase::Compile => sdk::compiler(inputs),
        Phase::Run => sdk::runner(inputs).map(Some),
        Phase::Test => sdk::test_runner(inputs).map(Some),
    }
}
