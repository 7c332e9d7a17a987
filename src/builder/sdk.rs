use std::fs;
use std::path::Path;

use crate::config::{CommandConfig, LanguageConfig, LogConfigTemplate};
use crate::results::Sdk;

use super::{BuildError, CommandPlan, CommandPlanBuilder, Phase, PlanInputs};

const CLASS_EXTENSION: &str = "class";

fn classpath_separator() -> &'static str {
    if cfg!(windows) { ";" } else { ":" }
}

pub(super) fn compiler(inputs: PlanInputs<'_>) -> Result<Option<CommandPlan>, BuildError> {
    let PlanInputs {
        paths, language, ..
    } = inputs;

    if language.sdk == Sdk::Python {
        return Ok(None);
    }
    let compile = command(language.compile.as_ref(), "compile command")?;
    let builder = CommandPlanBuilder::new(Phase::Compile).program(&compile.command);

    let builder = match language.sdk {
        Sdk::Java => {
            let mut flags = vec![
                "-d".to_string(),
                paths.executable_dir.to_string_lossy().into_owned(),
            ];
            if !language.classpath.is_empty() {
                flags.push("-classpath".to_string());
                flags.push(language.classpath.join(classpath_separator()));
            }
            builder
                .working_dir(&paths.base_dir)
                .args(flags)
                .args(compile.args.iter().cloned())
                .single_file_in(&paths.source_dir, &language.file_extension)
        }
        Sdk::Go => builder
            .working_dir(&paths.base_dir)
            .args(compile.args.iter().cloned())
            .args(["-o".to_string(), path_arg(&paths.executable_file)])
            .file_name(path_arg(&paths.source_file)),
        Sdk::Scio => builder
            .working_dir(project_dir(language)?)
            .args(compile.args.iter().cloned()),
        Sdk::Python => unreachable!("handled above"),
    };

    builder.build().map(Some)
}

pub(super) fn runner(inputs: PlanInputs<'_>) -> Result<CommandPlan, BuildError> {
    let PlanInputs {
        paths,
        language,
        pipeline_options,
    } = inputs;
    let run = &language.run;

    match language.sdk {
        Sdk::Java => {
            let mut classpath = vec![path_arg(&paths.executable_dir)];
            classpath.extend(language.classpath.iter().cloned());
            let args = replace_log_placeholder(&run.args, &paths.base_dir, &language.log_config);

            CommandPlanBuilder::new(Phase::Run)
                .program(&run.command)
                .working_dir(&paths.base_dir)
                .args(["-cp".to_string(), classpath.join(classpath_separator())])
                .args(args)
                .stem_of_single_file_in(&paths.executable_dir, CLASS_EXTENSION)
                .pipeline_options(pipeline_options)
                .build()
        }
        // The compiled binary is the program itself
        Sdk::Go => CommandPlanBuilder::new(Phase::Run)
            .program(path_arg(&paths.executable_file))
            .working_dir(&paths.base_dir)
            .args(run.args.iter().cloned())
            .pipeline_options(pipeline_options)
            .build(),
        Sdk::Python => CommandPlanBuilder::new(Phase::Run)
            .program(&run.command)
            .working_dir(&paths.base_dir)
            .args(run.args.iter().cloned())
            .file_name(path_arg(&paths.source_file))
            .pipeline_options(pipeline_options)
            .build(),
        Sdk::Scio => CommandPlanBuilder::new(Phase::Run)
            .program(&run.command)
            .working_dir(project_dir(language)?)
            .args(run.args.iter().cloned())
            .file_name(scala_main_object(&paths.source_file)?)
            .pipeline_options(pipeline_options)
            .combined_args()
            .build(),
    }
}

pub(super) fn test_runner(inputs: PlanInputs<'_>) -> Result<CommandPlan, BuildError> {
    let PlanInputs {
        paths, language, ..
    } = inputs;

    if language.sdk == Sdk::Scio {
        return Err(BuildError::UnsupportedPhase {
            sdk: language.sdk,
            phase: Phase::Test,
        });
    }
    let test = command(language.test.as_ref(), "test command")?;
    let builder = CommandPlanBuilder::new(Phase::Test)
        .program(&test.command)
        .args(test.args.iter().cloned());

    let builder = match language.sdk {
        Sdk::Java => builder
            .working_dir(&paths.base_dir)
            .stem_of_single_file_in(&paths.executable_dir, CLASS_EXTENSION),
        Sdk::Go => builder
            .working_dir(&paths.source_dir)
            .file_name(path_arg(&paths.source_dir)),
        Sdk::Python => builder
            .working_dir(&paths.source_dir)
            .file_name(path_arg(&paths.source_file)),
        Sdk::Scio => unreachable!("handled above"),
    };

    builder.build()
}

/// Substitutes the logging configuration placeholder in `args` with the
/// configuration file inside `base_dir`. Arguments without the placeholder
/// are returned unchanged.
pub fn replace_log_placeholder(
    args: &[String],
    base_dir: &Path,
    template: &LogConfigTemplate,
) -> Vec<String> {
    let log_config_path = base_dir.join(&template.file_name);
    let log_config_path = log_config_path.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace(&template.placeholder, &log_config_path))
        .collect()
}

/// Fully qualified name of the first top-level `object` declared in
/// `source_file`, prefixed by its package clauses
fn scala_main_object(source_file: &Path) -> Result<String, BuildError> {
    let code = fs::read_to_string(source_file).map_err(|source| BuildError::UnreadableSource {
        file: source_file.to_path_buf(),
        source,
    })?;

    let mut packages = Vec::new();
    for line in code.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let mut words = line.split_whitespace();
        match words.next() {
            Some("package") => {
                if let Some(package) = words.next() {
                    packages.push(package.trim_end_matches(';'));
                }
            }
            Some("object") => {
                let name: String = words
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if name.is_empty() {
                    continue;
                }
                let mut qualified = packages.join(".");
                if !qualified.is_empty() {
                    qualified.push('.');
                }
                qualified.push_str(&name);
                return Ok(qualified);
            }
            _ => {}
        }
    }

    Err(BuildError::NoMainObject {
        file: source_file.to_path_buf(),
    })
}

fn command<'a>(
    command: Option<&'a CommandConfig>,
    attribute: &'static str,
) -> Result<&'a CommandConfig, BuildError> {
    command.ok_or(BuildError::MissingAttribute(attribute))
}

fn project_dir(language: &LanguageConfig) -> Result<&Path, BuildError> {
    language
        .project_dir
        .as_deref()
        .ok_or(BuildError::MissingAttribute("project directory"))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
