use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Display name the seed data uses for comments written on this device.
pub const LOCAL_AUTHOR_LABEL: &str = "Current User";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    Local,
    Remote { display_name: String },
}

impl Author {
    pub fn is_local(&self) -> bool {
        matches!(self, Author::Local)
    }

    pub fn display_name(&self) -> &str {
        match self {
            Author::Local => LOCAL_AUTHOR_LABEL,
            Author::Remote { display_name } => display_name,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub author: Author,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// A comment authored on this device, stamped with a fresh id and the current time.
    pub fn local(parent_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: parent_id.to_string(),
            author: Author::Local,
            text: text.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub hug_count: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// The first bracketed tag in the title, e.g. `25F` for `"[25F] headache"`.
    pub fn age_tag(&self) -> Option<&str> {
        let (start, end) = bracket_span(&self.title)?;
        Some(&self.title[start + 1..end])
    }

    pub fn display_title(&self) -> String {
        let stripped = match bracket_span(&self.title) {
            Some((start, end)) => format!("{}{}", &self.title[..start], &self.title[end + 1..]),
            None => self.title.clone(),
        };
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            "Untitled".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}

fn bracket_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('[')?;
    let end = start + text[start..].find(']')?;
    Some((start, end))
}

/// Fallback id for a record that arrives without one.
pub fn fallback_id(index: usize) -> String {
    format!("fallback-id-{}", index)
}

/// Ids in the seed dataset can be strings or numbers.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_id(self) -> Option<String> {
        let id = match self {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        };
        if id.trim().is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct RawComment {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub parent_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<String>,
}

/// A post record as it appears in the seed dataset. Only `title` is expected;
/// everything else may be missing or null. A field of the wrong type is read
/// as missing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RawPost {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub num_hugs: Option<u32>,
    #[serde(default)]
    pub comments: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub patient_description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub assessment: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<String>,
}

// Any JSON value is accepted; one that does not fit `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl RawPost {
    /// Build a post, assigning `fallback-id-{index}` when the record has no id.
    pub fn into_post(self, index: usize) -> Post {
        let id = self
            .id
            .and_then(RawId::into_id)
            .unwrap_or_else(|| fallback_id(index));
        let comments = self
            .comments
            .map(|value| raw_comments(value, &id))
            .unwrap_or_default();

        Post {
            title: self.title.unwrap_or_default(),
            description: self.patient_description.unwrap_or_default(),
            assessment: self.assessment.unwrap_or_default(),
            hug_count: self.num_hugs.unwrap_or(0),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            comments,
            id,
        }
    }
}

/// Normalize a slice of raw records whose first element sits at `offset` in the source.
pub fn normalize(raw: Vec<RawPost>, offset: usize) -> Vec<Post> {
    raw.into_iter()
        .enumerate()
        .map(|(i, record)| record.into_post(offset + i))
        .collect()
}

// Comments arrive either as an object keyed by arbitrary ids or as an array.
// Entries that do not decode are skipped.
fn raw_comments(value: serde_json::Value, post_id: &str) -> Vec<Comment> {
    let entries: Vec<serde_json::Value> = match value {
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        serde_json::Value::Array(items) => items,
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<RawComment>(entry) {
            Ok(raw) => Some(raw.into_comment(post_id, i)),
            Err(e) => {
                log::warn!("Skipping malformed comment {} on post {}: {}", i, post_id, e);
                None
            }
        })
        .collect()
}

impl RawComment {
    fn into_comment(self, post_id: &str, index: usize) -> Comment {
        let author = match self.display_name {
            Some(name) if name == LOCAL_AUTHOR_LABEL => Author::Local,
            Some(name) => Author::Remote { display_name: name },
            None => Author::Remote { display_name: "Anonymous".to_string() },
        };
        Comment {
            id: self
                .id
                .and_then(RawId::into_id)
                .unwrap_or_else(|| format!("{}-comment-{}", post_id, index)),
            parent_id: self
                .parent_id
                .and_then(RawId::into_id)
                .unwrap_or_else(|| post_id.to_string()),
            author,
            text: self.text.unwrap_or_default(),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Accepts RFC 3339 and the space-separated `YYYY-MM-DD HH:MM:SS` form (read as UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
