use serde::{Deserialize, Serialize};

/// A course that notes are filed under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: String,
    /// Institution course code, e.g. `tma4140`.
    pub subject_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubjectInput {
    pub subject_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
