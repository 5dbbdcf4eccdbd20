#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use redb::Database;
use rusqlite::Connection;
use tempfile::TempDir;

use matbase_backend::models::{ContentMetadata, ContentType};
use matbase_backend::setup::db_setup;

/// A throwaway catalog database with the production table layout.
pub fn temp_catalog() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::create(dir.path().join("catalog.db")).expect("create catalog db");
    db_setup::setup_catalog_db(&db).expect("set up catalog tables");
    (dir, db)
}

/// A throwaway viewer-accounts database with the production schema and seeds.
pub fn temp_viewers() -> (TempDir, Connection) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut conn =
        Connection::open(dir.path().join("viewers.db")).expect("create viewers db");
    db_setup::setup_viewers_db(&mut conn).expect("set up viewer tables");
    (dir, conn)
}

pub fn metadata(
    title: &str,
    content_type: ContentType,
    price: u32,
    video_ref: Option<&str>,
    published: bool,
) -> ContentMetadata {
    ContentMetadata {
        title: title.to_string(),
        content_type,
        price,
        creator_id: 1,
        course_id: None,
        published,
        video_ref: video_ref.map(|s| s.to_string()),
        description: "A *markdown* description.".to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        last_updated_at: None,
    }
}
