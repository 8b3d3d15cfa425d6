use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The single persisted document. Fields missing from the backing file
/// load as zero or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: now(),
            edited_at: None,
        }
    }
}

/// Current time at the millisecond precision the document stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamps are written as `2024-03-01T10:00:00.000Z`.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => {
                    serializer.serialize_some(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

impl Document {
    pub fn like(&mut self) -> u64 {
        self.likes = self.likes.saturating_add(1);
        self.likes
    }

    pub fn dislike(&mut self) -> u64 {
        self.dislikes = self.dislikes.saturating_add(1);
        self.dislikes
    }

    pub fn push_comment(&mut self, text: String) -> &Comment {
        self.comments.push(Comment::new(text));
        &self.comments[self.comments.len() - 1]
    }

    /// Removes the comment at `index`; later comments shift down by one.
    pub fn remove_comment(&mut self, index: usize) -> Result<Comment, ValidationError> {
        if index >= self.comments.len() {
            return Err(ValidationError::InvalidIndex);
        }
        Ok(self.comments.remove(index))
    }

    pub fn edit_comment(&mut self, index: usize, text: String) -> Result<&Comment, ValidationError> {
        let comment = self
            .comments
            .get_mut(index)
            .ok_or(ValidationError::InvalidIndex)?;
        comment.text = text;
        // An edit always lands after the creation it refers to.
        let earliest = comment.created_at + Duration::milliseconds(1);
        comment.edited_at = Some(now().max(earliest));
        Ok(comment)
    }
}

/// Trims comment text, rejecting strings that are empty afterwards.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let document: Document = serde_json::from_value(json!({ "likes": 4 })).unwrap();
        assert_eq!(document.likes, 4);
        assert_eq!(document.dislikes, 0);
        assert!(document.comments.is_empty());
    }

    #[test]
    fn comment_uses_camel_case_and_omits_unset_edit() {
        let comment = Comment::new("hello");
        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["text"], "hello");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("editedAt").is_none());
    }

    #[test]
    fn reads_timestamps_written_with_millisecond_precision() {
        let document: Document = serde_json::from_value(json!({
            "likes": 1,
            "dislikes": 2,
            "comments": [
                { "text": "first", "createdAt": "2024-03-01T10:00:00.000Z" },
                {
                    "text": "second",
                    "createdAt": "2024-03-01T10:00:01.000Z",
                    "editedAt": "2024-03-02T08:30:00.250Z"
                }
            ]
        }))
        .unwrap();
        assert_eq!(document.comments.len(), 2);
        assert!(document.comments[0].edited_at.is_none());
        assert!(document.comments[1].edited_at.is_some());
    }

    #[test]
    fn timestamps_keep_millisecond_format() {
        let raw = json!({
            "text": "kept",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "editedAt": "2024-03-02T08:30:00.250Z"
        });
        let comment: Comment = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&comment).unwrap(), raw);
    }

    #[test]
    fn edit_lands_after_creation_even_within_the_same_millisecond() {
        let mut document = Document::default();
        document.push_comment("draft".into());
        document.comments[0].created_at = Utc::now() + Duration::seconds(60);
        let edited = document.edit_comment(0, "final".into()).unwrap();
        assert!(edited.edited_at.unwrap() > edited.created_at);
    }

    #[test]
    fn remove_shifts_later_comments() {
        let mut document = Document::default();
        document.push_comment("a".into());
        document.push_comment("b".into());
        document.push_comment("c".into());
        let removed = document.remove_comment(1).unwrap();
        assert_eq!(removed.text, "b");
        let texts: Vec<_> = document.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["a", "c"]);
        assert_eq!(document.remove_comment(2), Err(ValidationError::InvalidIndex));
    }

    #[test]
    fn counters_saturate() {
        let mut document = Document {
            likes: u64::MAX,
            ..Document::default()
        };
        assert_eq!(document.like(), u64::MAX);
        assert_eq!(document.dislike(), 1);
    }

    #[test]
    fn normalize_text_trims_and_rejects_blank() {
        assert_eq!(normalize_text("  hi \n"), Some("hi".to_string()));
        assert_eq!(normalize_text(""), None);
        assert_eq!(normalize_text(" \t "), None);
    }
}
