use std::fmt;

use serde::{Deserialize, Serialize};

/// Disposal category shown next to each detected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Recyclable,
    Waste,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Recyclable => "recyclable",
            Category::Waste => "waste",
            Category::Other => "other",
        }
    }

    /// Case-insensitive inverse of [`as_str`](Self::as_str).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recyclable" => Some(Category::Recyclable),
            "waste" => Some(Category::Waste),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Recyclable => "♻",
            Category::Waste => "🗑",
            Category::Other => "✔",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table, checked in order. The first row with a matching keyword
/// decides the category.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Recyclable,
        &["recycle", "recyclable", "plastic", "paper", "glass"],
    ),
    (Category::Waste, &["waste", "trash", "garbage"]),
];

/// Maps a classifier label to a category.
///
/// A category delivered by the backend always wins. Otherwise the label is
/// split into lowercase word tokens (on anything that is not alphanumeric)
/// and a keyword matches a token that starts with it, so `plastic_bottle`
/// and `Plastics` match `plastic` while `newspaper` does not match `paper`.
pub fn classify(label: &str, backend_hint: Option<Category>) -> Category {
    if let Some(category) = backend_hint {
        return category;
    }
    let lowered = label.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| tokens.iter().any(|token| token.starts_with(*keyword)))
        })
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
