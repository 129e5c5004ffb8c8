use crate::installer::InstallMapping;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Unknown option '{option}' for {formula}")]
    UnknownOption { formula: String, option: String },

    #[error("Invalid option flag '{0}' (expected --with-<name> or --without-<name>)")]
    InvalidOptionFlag(String),

    #[error("Missing required dependency: {0}")]
    MissingDependency(String),

    #[error("{formula} has no {mode} source")]
    UnsupportedMode { formula: String, mode: String },

    #[error("Formula not found: {name}{}", suggestion.as_ref().map(|s| format!(" (did you mean '{}'?)", s)).unwrap_or_default())]
    FormulaNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Invalid recipe: {0}")]
    Recipe(String),

    #[error("Step {step_index} failed: `{command}` ({}){}",
        exit_code.map(|c| format!("exit code {}", c)).unwrap_or_else(|| "no exit code".to_string()),
        if captured_output.trim().is_empty() { String::new() } else { format!("\n{}", captured_output.trim_end()) })]
    Execution {
        step_index: usize,
        command: String,
        exit_code: Option<i32>,
        captured_output: String,
    },

    #[error("Build cancelled before step {step_index}")]
    Cancelled { step_index: usize },

    #[error("Failed to install {mapping}: {cause}")]
    Install {
        mapping: Box<InstallMapping>,
        #[source]
        cause: std::io::Error,
    },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Platform query failed: {0}")]
    Platform(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_surfaces_output() {
        let err = BuildError::Execution {
            step_index: 3,
            command: "make install".to_string(),
            exit_code: Some(2),
            captured_output: "make: *** No rule to make target 'install'.\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Step 3"));
        assert!(msg.contains("`make install`"));
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("No rule to make target"));
    }

    #[test]
    fn test_formula_not_found_suggestion() {
        let err = BuildError::FormulaNotFound {
            name: "rdkti".to_string(),
            suggestion: Some("rdkit".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Formula not found: rdkti (did you mean 'rdkit'?)"
        );

        let err = BuildError::FormulaNotFound {
            name: "zzz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Formula not found: zzz");
    }
}
