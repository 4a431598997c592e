use serde::{Deserialize, Serialize};

/// An entry in the shared tag catalog that authors pick note tags from.
///
/// `tag` may be namespaced as `category:name`; see [`super::Note::tag_names`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    pub tag: Option<String>,
}
