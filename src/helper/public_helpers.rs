use std::collections::HashSet;

use actix_web::web;
use chrono::NaiveDate;
use rand::Rng;
use redb::Database;
use thiserror::Error;

use crate::models::db_operations::catalog_db_operations::{self, CatalogError};
use crate::models::db_operations::users_db_operations;
use crate::models::{ContentItem, ContentType, FeedEntry};
use crate::selection::{self, ViewerAccess};
use crate::DbPool;

#[derive(Error, Debug)]
pub enum PublicHelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub fn verify_viewer_credentials(
    pool: &web::Data<DbPool>,
    username: &str,
    password: &str,
) -> Option<(i64, String, String)> {
    if let Ok(conn) = pool.get() {
        users_db_operations::verify_credentials(&conn, username, password)
    } else {
        None
    }
}

pub fn register_viewer(
    pool: &web::Data<DbPool>,
    username: &str,
    password: &str,
) -> Result<(), PublicHelperError> {
    let conn = pool.get()?;
    users_db_operations::create_user(&conn, username, password, "viewer")?;
    Ok(())
}

pub fn record_login_time(pool: &web::Data<DbPool>, username: &str) {
    match pool.get() {
        Ok(conn) => {
            if let Err(e) = users_db_operations::update_last_login_time(&conn, username) {
                log::error!("Failed to record login time for '{}': {}", username, e);
            }
        }
        Err(e) => log::error!("Could not get DB connection to record login time: {}", e),
    }
}

/// Derives the entitlement inputs for the requesting viewer. Every lookup
/// failure degrades to "not subscribed / nothing purchased": missing data must
/// deny access, never grant it.
pub fn viewer_access(pool: &web::Data<DbPool>, viewer_id: Option<i64>) -> ViewerAccess {
    let Some(id) = viewer_id else {
        return ViewerAccess::anonymous();
    };
    match pool.get() {
        Ok(conn) => {
            let is_subscriber = users_db_operations::is_subscriber(&conn, id);
            let purchased = users_db_operations::read_purchased_content_ids(&conn, id)
                .unwrap_or_else(|e| {
                    log::error!("Failed to fetch purchases for viewer {}: {}", id, e);
                    HashSet::new()
                });
            ViewerAccess {
                is_logged_in: true,
                is_subscriber,
                purchased,
            }
        }
        Err(e) => {
            log::error!("Could not get DB connection for viewer {} entitlements: {}", id, e);
            ViewerAccess {
                is_logged_in: true,
                is_subscriber: false,
                purchased: HashSet::new(),
            }
        }
    }
}

// --- The daily-pick pipeline: fetch, filter, select. Each stage is its own ---
// --- function so the stages stay independently testable.                  ---

pub fn fetch_content_pool(
    db: &web::Data<Database>,
    content_type: ContentType,
) -> Result<Vec<ContentItem>, CatalogError> {
    catalog_db_operations::read_content_pool(db, content_type)
}

pub fn fetch_eligible_pool(
    db: &web::Data<Database>,
    content_type: ContentType,
) -> Result<Vec<ContentItem>, CatalogError> {
    Ok(selection::filter_eligible(fetch_content_pool(db, content_type)?))
}

/// Today's free item for one content type: admin override first, seeded
/// fallback second. `Ok(None)` means nothing is free today for that type.
pub fn daily_free_pick(
    db: &web::Data<Database>,
    content_type: ContentType,
    date: NaiveDate,
) -> Result<Option<ContentItem>, CatalogError> {
    let pool = fetch_eligible_pool(db, content_type)?;
    let override_id = catalog_db_operations::read_featured_pick(db, date, content_type)?;
    Ok(selection::select_daily_free(content_type, date, &pool, override_id.as_deref()).cloned())
}

pub fn fetch_content_detail(
    db: &web::Data<Database>,
    content_id: &str,
) -> Result<Option<ContentItem>, CatalogError> {
    catalog_db_operations::read_content_by_id(db, content_id)
}

/// Lessons cluster by their parent course; drills and sparring clips cluster
/// by content type.
fn feed_group_key(entry: &FeedEntry) -> String {
    match &entry.course_id {
        Some(course_id) => format!("course:{}", course_id),
        None => entry.content_type.as_str().to_string(),
    }
}

/// Composes the viewer-facing feed: for each requested type, fetch the pool,
/// filter it, work out today's free pick, annotate every item with the
/// viewer's access decision, then diversify the combined list. A fetch failure
/// for one type degrades to an empty section rather than failing the feed.
pub fn build_feed<R: Rng + ?Sized>(
    db: &web::Data<Database>,
    types: &[ContentType],
    date: NaiveDate,
    viewer: &ViewerAccess,
    target: Option<&str>,
    rng: &mut R,
) -> Vec<FeedEntry> {
    let mut entries: Vec<FeedEntry> = Vec::new();

    for &content_type in types {
        let pool = match fetch_eligible_pool(db, content_type) {
            Ok(pool) => pool,
            Err(e) => {
                log::error!("Failed to fetch {} pool for feed: {}", content_type, e);
                continue;
            }
        };
        let override_id = match catalog_db_operations::read_featured_pick(db, date, content_type) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to read featured pick for {}: {}", content_type, e);
                None
            }
        };
        let daily_id = selection::select_daily_free(content_type, date, &pool, override_id.as_deref())
            .map(|item| item.id.clone());

        for item in pool {
            let is_daily_free = daily_id.as_deref() == Some(item.id.as_str());
            let can_play =
                selection::can_access(&item.id, item.metadata.price, is_daily_free, viewer);
            entries.push(FeedEntry {
                id: item.id,
                title: item.metadata.title,
                content_type,
                price: item.metadata.price,
                course_id: item.metadata.course_id,
                is_daily_free,
                can_play,
                video_ref: if can_play { item.metadata.video_ref } else { None },
            });
        }
    }

    let mut ordered = selection::diversify(entries, feed_group_key, rng);
    if let Some(target_id) = target {
        selection::promote(&mut ordered, |entry| entry.id == target_id);
    }
    ordered
}
