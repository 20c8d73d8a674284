use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ArticleContent;

pub const MAX_TITLE_LEN: usize = 200;

/// Closed tag vocabulary; anything else is rejected at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Engineering,
    Products,
    Impact,
    Nonprofits,
}

impl Tag {
    pub fn parse(s: &str) -> Option<Tag> {
        match s {
            "engineering" => Some(Tag::Engineering),
            "products" => Some(Tag::Products),
            "impact" => Some(Tag::Impact),
            "nonprofits" => Some(Tag::Nonprofits),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    /// Set at creation, never changed by updates.
    pub published_date: DateTime<Utc>,
    /// Re-stamped on every update.
    pub last_edited: DateTime<Utc>,
    /// Ordered, duplicate-free, non-empty. Membership drives authorization.
    pub authors: Vec<Uuid>,
    /// Relative upload path, absolute URL, or the "no cover" sentinel.
    pub cover_picture_url: String,
    pub article_content: ArticleContent,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Please add a title".to_string());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Title cannot be more than {} characters", MAX_TITLE_LEN));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_vocabulary_is_closed() {
        assert_eq!(Tag::parse("impact"), Some(Tag::Impact));
        assert_eq!(Tag::parse("nonprofits"), Some(Tag::Nonprofits));
        assert_eq!(Tag::parse("sports"), None);
        assert_eq!(Tag::parse("Impact"), None);
    }

    #[test]
    fn title_bounds() {
        assert!(validate_title("A day in review").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }
}
