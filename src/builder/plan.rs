use std::fs;
use std::path::{Path, PathBuf};

use super::{BuildError, Phase};

/// Fully resolved process invocation for one phase of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub phase: Phase,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// The file a phase operates on, either given directly or discovered when
/// the plan is built
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Name(String),
    SingleFileIn {
        dir: PathBuf,
        extension: String,
        stem_only: bool,
    },
}

/// Immutable builder for [`CommandPlan`]. Every setter consumes the builder
/// and returns the updated value; nothing is checked until [`build`].
///
/// Arguments are laid out as `args`, then the target file, then the
/// pipeline options.
///
/// [`build`]: CommandPlanBuilder::build
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CommandPlanBuilder {
    phase: Phase,
    program: Option<String>,
    working_dir: Option<PathBuf>,
    args: Vec<String>,
    target: Option<Target>,
    pipeline_options: Vec<String>,
    combine_args: bool,
}

impl CommandPlanBuilder {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            program: None,
            working_dir: None,
            args: Vec::new(),
            target: None,
            pipeline_options: Vec::new(),
            combine_args: false,
        }
    }

    pub fn program(self, program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
            ..self
        }
    }

    pub fn working_dir(self, dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..self
        }
    }

    /// Appends to the fixed arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn file_name(self, name: impl Into<String>) -> Self {
        Self {
            target: Some(Target::Name(name.into())),
            ..self
        }
    }

    /// Targets the full path of the only `*.extension` file in `dir`
    pub fn single_file_in(self, dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            target: Some(Target::SingleFileIn {
                dir: dir.into(),
                extension: extension.into(),
                stem_only: false,
            }),
            ..self
        }
    }

    /// Targets the name, without extension, of the only `*.extension` file
    /// in `dir`
    pub fn stem_of_single_file_in(
        self,
        dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            target: Some(Target::SingleFileIn {
                dir: dir.into(),
                extension: extension.into(),
                stem_only: true,
            }),
            ..self
        }
    }

    /// Whitespace separated options passed through to the pipeline
    pub fn pipeline_options(self, options: &str) -> Self {
        Self {
            pipeline_options: options.split_whitespace().map(str::to_string).collect(),
            ..self
        }
    }

    /// Folds all arguments into one space separated argument, as build tools
    /// expect their run sub-command in a single string
    pub fn combined_args(self) -> Self {
        Self {
            combine_args: true,
            ..self
        }
    }

    pub fn build(self) -> Result<CommandPlan, BuildError> {
        let program = self
            .program
            .filter(|p| !p.is_empty())
            .ok_or(BuildError::MissingAttribute("program"))?;
        let working_dir = self
            .working_dir
            .ok_or(BuildError::MissingAttribute("working directory"))?;

        let mut args = self.args;
        if let Some(target) = self.target {
            args.push(resolve_target(target)?);
        }
        args.extend(self.pipeline_options);

        if self.combine_args {
            args = vec![args.join(" ")];
        }

        Ok(CommandPlan {
            phase: self.phase,
            program,
            args,
            working_dir,
        })
    }
}

fn resolve_target(target: Target) -> Result<String, BuildError> {
    match target {
        Target::Name(name) => Ok(name),
        Target::SingleFileIn {
            dir,
            extension,
            stem_only,
        } => {
            let file = single_file_in(&dir, &extension)?;
            let resolved = if stem_only {
                file.file_stem().map(|s| s.to_string_lossy().into_owned())
            } else {
                Some(file.to_string_lossy().into_owned())
            };
            resolved.ok_or(BuildError::NoSourceFile { dir, extension })
        }
    }
}

/// Finds the one file with the given extension in `dir`.
///
/// Files whose name contains `$` are skipped: Java emits nested classes as
/// `Outer$Inner.class` next to the top-level class.
fn single_file_in(dir: &Path, extension: &str) -> Result<PathBuf, BuildError> {
    let entries = fs::read_dir(dir).map_err(|source| BuildError::UnreadableFolder {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| !name.to_string_lossy().contains('$'))
        })
        .collect();

    match candidates.len() {
        0 => Err(BuildError::NoSourceFile {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        count => Err(BuildError::AmbiguousSourceFile {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
            count,
        }),
    }
}
