//! Candidate records supplied by the roster or prize-pool collaborator.

use serde::{Deserialize, Serialize};

/// One entity in a pool: a student in a class roster or a prize in a lottery pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identifier from the roster
    pub id: String,

    /// Display name; also the key under which history is stored
    pub name: String,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    /// Soft-delete flag; `false` entries never take part in a draw
    #[serde(default = "default_exists", alias = "exist")]
    pub exists: bool,
}

fn default_exists() -> bool {
    true
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: None,
            gender: None,
            exists: true,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Key used for this candidate in history and exclusion records.
    ///
    /// History is keyed by name; rosters that leave the name blank fall back to the id.
    pub fn history_key(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let c = Candidate::new("7", "Lin").with_group("A").with_gender("F");
        assert_eq!(c.group.as_deref(), Some("A"));
        assert_eq!(c.gender.as_deref(), Some("F"));
        assert!(c.exists);
    }

    #[test]
    fn test_history_key_falls_back_to_id() {
        assert_eq!(Candidate::new("7", "Lin").history_key(), "Lin");
        assert_eq!(Candidate::new("7", "").history_key(), "7");
    }

    #[test]
    fn test_deserialize_legacy_exist_flag() {
        let c: Candidate = serde_json::from_str(r#"{"id":"1","name":"Zhao","exist":false}"#).unwrap();
        assert!(!c.exists);
        assert_eq!(c.group, None);
    }

    #[test]
    fn test_deserialize_defaults_exists() {
        let c: Candidate = serde_json::from_str(r#"{"id":"1","name":"Zhao","group":"2"}"#).unwrap();
        assert!(c.exists);
        assert_eq!(c.group.as_deref(), Some("2"));
    }
}
