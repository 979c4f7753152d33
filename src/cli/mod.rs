//! CLI module for fairdraw - command-line interface and subcommands.
//!
//! Rosters are read from JSON (`.json`) or YAML (anything else) files holding a list
//! of candidates.

pub mod commands;

pub use commands::Cli;

use eyre::{Context, Result};
use fairdraw::domain::Candidate;
use std::fs;
use std::path::Path;

/// Read a roster or prize list.
pub fn load_roster(path: &Path) -> Result<Vec<Candidate>> {
    let content = fs::read_to_string(path).context(format!("Failed to read roster {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let roster: Vec<Candidate> = if is_json {
        serde_json::from_str(&content).context(format!("Failed to parse roster {}", path.display()))?
    } else {
        serde_yaml::from_str(&content).context(format!("Failed to parse roster {}", path.display()))?
    };

    log::debug!("Loaded {} candidates from {}", roster.len(), path.display());
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_roster() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("class.json");
        fs::write(&path, r#"[{"id": "1", "name": "Ann", "group": "1", "gender": "F"}, {"id": "2", "name": "Bo", "exist": false}]"#).unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].group.as_deref(), Some("1"));
        assert!(roster[0].exists);
        assert!(!roster[1].exists);
    }

    #[test]
    fn test_load_yaml_roster() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prizes.yml");
        fs::write(&path, "- id: p1\n  name: Pen\n- id: p2\n  name: Book\n").unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(roster[1].name, "Book");
        assert_eq!(roster[1].group, None);
    }

    #[test]
    fn test_bad_roster_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_roster(&path).is_err());
    }
}
