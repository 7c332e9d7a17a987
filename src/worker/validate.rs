use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};

use super::*;

impl Pipeline {
    /// Checks the stored source file and rewrites it where the toolchain
    /// needs it
    pub(super) fn validate(&self, job: &JobMessage) -> Result<()> {
        let source_file = &job.paths.source_file;
        let code = fs::read_to_string(source_file)
            .with_context(|| format!("Failed to read {}", source_file.display()))?;
        check_source(&job.language.file_extension, job.language.sdk, source_file, &code)?;

        if job.language.sdk == Sdk::Java {
            fs::write(source_file, prepare_java_source(&code))
                .with_context(|| format!("Failed to rewrite {}", source_file.display()))?;
        }
        Ok(())
    }
}

/// Rejects sources that can never build: wrong extension, blank files and
/// code missing the construct the SDK requires
pub fn check_source(extension: &str, sdk: Sdk, file: &Path, code: &str) -> Result<()> {
    match file.extension().and_then(|e| e.to_str()) {
        Some(actual) if actual == extension => {}
        _ => bail!("{} is not a .{extension} file", file.display()),
    }
    ensure!(!code.trim().is_empty(), "source file is empty");

    match sdk {
        Sdk::Java => ensure!(code.contains("class "), "no class declaration found"),
        Sdk::Go => ensure!(code.contains("package "), "no package clause found"),
        Sdk::Python | Sdk::Scio => {}
    }
    Ok(())
}

/// Whether `code` is a test suite rather than a program
pub fn is_unit_test(sdk: Sdk, code: &str) -> bool {
    match sdk {
        Sdk::Java => code.contains("@Test"),
        Sdk::Go => code.contains("\"testing\"") && code.contains("func Test"),
        Sdk::Python => {
            code.contains("import unittest")
                || code.contains("from unittest")
                || code.contains("import pytest")
        }
        Sdk::Scio => false,
    }
}

/// Makes the first class runnable from a file with a generated name and
/// drops the package declaration so no package folders are needed
pub fn prepare_java_source(code: &str) -> String {
    let mut prepared = String::with_capacity(code.len());
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("package ") && trimmed.trim_end().ends_with(';') {
            continue;
        }
        prepared.push_str(&line.replace("public class ", "class "));
        prepared.push('\n');
    }
    prepared
}
