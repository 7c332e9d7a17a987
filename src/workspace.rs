use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::config::LanguageConfig;
use crate::results::{JobId, Sdk};

const SOURCE_FOLDER: &str = "src";
const EXECUTABLE_FOLDER: &str = "bin";
const SCIO_SOURCE_ROOT: &str = "src/main/scala";

/// Filesystem locations of one job. Every job owns its own base folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
    pub source_file: PathBuf,
    pub executable_dir: PathBuf,
    /// Compiled artifact for SDKs that produce one file, the source file
    /// for interpreted ones
    pub executable_file: PathBuf,
}

/// Creates and deletes per-job folders below a root directory
#[derive(Debug, Clone)]
pub struct Workspaces {
    root: PathBuf,
}

impl Workspaces {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspaces below the platform cache directory
    pub fn in_cache_dir() -> Result<Self> {
        use directories::ProjectDirs;

        let proj_dirs = ProjectDirs::from("", "", "playground")
            .ok_or_else(|| anyhow!("Unable to find user directory"))?;
        Ok(Self::new(proj_dirs.cache_dir().join("workspaces")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the folders of `job_id` and returns their paths
    pub fn prepare(
        &self,
        job_id: JobId,
        language: &LanguageConfig,
        unit_test: bool,
    ) -> Result<WorkspacePaths> {
        // Class and package names may not start with a digit
        let file_stem = format!("job_{}", job_id.to_string().replace('-', "_"));
        let source_stem = if unit_test && language.sdk == Sdk::Go {
            format!("{file_stem}_test")
        } else {
            file_stem.clone()
        };

        // The build tool only compiles sources inside its own project
        let base_dir = match (language.sdk, &language.project_dir) {
            (Sdk::Scio, Some(project_dir)) => project_dir.join(SCIO_SOURCE_ROOT).join(&file_stem),
            _ => self.root.join(language.sdk.to_string()).join(job_id.to_string()),
        };
        let source_dir = base_dir.join(SOURCE_FOLDER);
        let executable_dir = base_dir.join(EXECUTABLE_FOLDER);

        let source_file = source_dir.join(format!("{source_stem}.{}", language.file_extension));
        let executable_file = match language.sdk {
            Sdk::Go => executable_dir.join(if cfg!(windows) {
                format!("{file_stem}.exe")
            } else {
                file_stem
            }),
            Sdk::Python => source_file.clone(),
            Sdk::Java | Sdk::Scio => executable_dir.clone(),
        };

        for dir in [&source_dir, &executable_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        Ok(WorkspacePaths {
            base_dir,
            source_dir,
            source_file,
            executable_dir,
            executable_file,
        })
    }

    pub fn write_source(&self, paths: &WorkspacePaths, code: &str) -> Result<()> {
        fs::write(&paths.source_file, code)
            .with_context(|| format!("Failed to write {}", paths.source_file.display()))
    }

    /// Removes the compiled artifact; missing artifacts are fine
    pub fn delete_executable(&self, paths: &WorkspacePaths) -> Result<()> {
        let artifact = &paths.executable_file;
        if artifact == &paths.source_file || !artifact.exists() {
            return Ok(());
        }
        if artifact.is_dir() {
            fs::remove_dir_all(artifact)
        } else {
            fs::remove_file(artifact)
        }
        .with_context(|| format!("Failed to delete {}", artifact.display()))
    }

    pub fn delete(&self, paths: &WorkspacePaths) -> Result<()> {
        if !paths.base_dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&paths.base_dir)
            .with_context(|| format!("Failed to delete {}", paths.base_dir.display()))
    }
}
