//! Built-in formulae
//!
//! - **rdkit**: cheminformatics toolkit (CMake, optional Java/InChI/Avalon/PostgreSQL)
//! - **opsin**: chemical name parser (prebuilt jar, or Maven build from head)

pub mod opsin;
pub mod rdkit;

use crate::error::{BuildError, Result};
use crate::formula::Formula;

/// Every built-in formula, sorted by name
pub fn all() -> Vec<Formula> {
    vec![opsin::formula(), rdkit::formula()]
}

pub fn names() -> Vec<&'static str> {
    all().iter().map(|f| f.name).collect()
}

/// Look up a formula by name. Tap-qualified names are accepted.
pub fn find(name: &str) -> Result<Formula> {
    let short = name.rsplit('/').next().unwrap_or(name);

    if let Some(formula) = all().into_iter().find(|f| f.name == short) {
        return Ok(formula);
    }

    let suggestion = names()
        .into_iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(short, candidate)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string());

    Err(BuildError::FormulaNotFound {
        name: name.to_string(),
        suggestion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find("rdkit").unwrap().name, "rdkit");
        assert_eq!(find("mcs07/cheminformatics/opsin").unwrap().name, "opsin");
    }

    #[test]
    fn test_find_suggests() {
        match find("rdkti") {
            Err(BuildError::FormulaNotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("rdkit"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match find("openbabel") {
            Err(BuildError::FormulaNotFound { suggestion, .. }) => assert!(suggestion.is_none()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_names_sorted() {
        let names = names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
