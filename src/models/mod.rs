use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The three kinds of playable catalog content.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Lesson,
    Drill,
    Sparring,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [
        ContentType::Lesson,
        ContentType::Drill,
        ContentType::Sparring,
    ];

    /// Stable single-byte tag used as the key prefix in the catalog type index.
    pub fn tag(&self) -> u8 {
        match self {
            ContentType::Lesson => 1,
            ContentType::Drill => 2,
            ContentType::Sparring => 3,
        }
    }

    /// Per-type seed salt so the three daily picks never land on the same index
    /// for the same date.
    pub fn seed_salt(&self) -> u32 {
        self.tag() as u32
    }

    pub fn from_tag(tag: u8) -> Option<ContentType> {
        match tag {
            1 => Some(ContentType::Lesson),
            2 => Some(ContentType::Drill),
            3 => Some(ContentType::Sparring),
            _ => None,
        }
    }

    /// Parses the path segment used by the public API routes.
    pub fn from_path_segment(segment: &str) -> Option<ContentType> {
        match segment {
            "lesson" | "lessons" => Some(ContentType::Lesson),
            "drill" | "drills" => Some(ContentType::Drill),
            "sparring" => Some(ContentType::Sparring),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Lesson => "lesson",
            ContentType::Drill => "drill",
            ContentType::Sparring => "sparring",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContentMetadata {
    pub title: String,
    pub content_type: ContentType,
    /// Price in the smallest currency unit. Zero means free for everyone.
    pub price: u32,
    pub creator_id: i64,
    /// Parent course; set for lessons only. Lessons take their publish state from it.
    pub course_id: Option<String>,
    pub published: bool,
    /// Reference into the external video host: a raw numeric id or an "id:hash" pair.
    /// Failed uploads leave an error sentinel here ("error" or an "ERROR:" prefix).
    pub video_ref: Option<String>,
    /// Markdown. Rendered and sanitized before it is served.
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ContentItem {
    pub id: String,
    pub metadata: ContentMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub creator_id: i64,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin-authored override: pins the daily free pick for one `(date, content_type)`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FeaturedPick {
    pub date: NaiveDate,
    pub content_type: ContentType,
    pub content_id: String,
}

/// One feed row as served to a client: the item plus its viewer-specific annotations.
#[derive(Debug, Serialize, Clone)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub content_type: ContentType,
    pub price: u32,
    pub course_id: Option<String>,
    pub is_daily_free: bool,
    pub can_play: bool,
    /// Present only when `can_play` is true.
    pub video_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub is_active: bool,
    pub subscription_expires_at: Option<String>,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

/// Type-safe permission checking for creator-owned catalog rows.
pub enum ContentAction {
    Edit,
    Delete,
}

pub mod db_operations;
