//! Input validation at the UI boundary.
//!
//! User input arrives as a [`QuoteDraft`]. The engine only accepts the
//! validated [`Quote`], which can be obtained solely through
//! [`QuoteDraft::validate`], so malformed input never reaches it.

use crate::{error::Result, Error, RecordId};
use serde::{Deserialize, Serialize};

/// Author used when the user leaves the field blank.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Raw user input for a new or edited quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDraft {
    /// Existing record id when editing, `None` when creating
    #[serde(default)]
    pub id: Option<RecordId>,
    pub text: String,
    #[serde(default)]
    pub author: String,
    pub category: String,
}

impl QuoteDraft {
    /// Draft for a new quote.
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            text: text.into(),
            author: author.into(),
            category: category.into(),
        }
    }

    /// Target an existing record.
    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check required fields and normalize whitespace.
    pub fn validate(self) -> Result<Quote> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(Error::Validation("quote text is required".into()));
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(Error::Validation("category is required".into()));
        }

        let author = match self.author.trim() {
            "" => DEFAULT_AUTHOR,
            author => author,
        };

        let id = match self.id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::Validation("record id must not be blank".into()))
            }
            id => id,
        };

        Ok(Quote {
            id,
            text: text.to_string(),
            author: author.to_string(),
            category: category.to_string(),
        })
    }
}

/// A validated quote, ready for [`SyncEngine::upsert_local`](crate::SyncEngine::upsert_local).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    id: Option<RecordId>,
    text: String,
    author: String,
    category: String,
}

impl Quote {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_draft() {
        let quote = QuoteDraft::new("  Be yourself.  ", "Wilde", " Life ")
            .validate()
            .unwrap();

        assert_eq!(quote.id(), None);
        assert_eq!(quote.text(), "Be yourself.");
        assert_eq!(quote.author(), "Wilde");
        assert_eq!(quote.category(), "Life");
    }

    #[test]
    fn missing_text() {
        let err = QuoteDraft::new("   ", "Wilde", "Life").validate().unwrap_err();
        assert_eq!(err, Error::Validation("quote text is required".into()));
    }

    #[test]
    fn missing_category() {
        let err = QuoteDraft::new("Be yourself.", "Wilde", "")
            .validate()
            .unwrap_err();
        assert_eq!(err, Error::Validation("category is required".into()));
    }

    #[test]
    fn blank_author_gets_default() {
        let quote = QuoteDraft::new("Be yourself.", "", "Life")
            .validate()
            .unwrap();
        assert_eq!(quote.author(), DEFAULT_AUTHOR);
    }

    #[test]
    fn blank_id_rejected() {
        let err = QuoteDraft::new("Be yourself.", "Wilde", "Life")
            .with_id(" ")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn draft_from_json() {
        let json = r#"{"text": "Hi", "category": "Greeting"}"#;
        let draft: QuoteDraft = serde_json::from_str(json).unwrap();
        let quote = draft.validate().unwrap();
        assert_eq!(quote.author(), DEFAULT_AUTHOR);
    }
}
