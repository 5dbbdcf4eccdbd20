use std::collections::HashMap;

use actix_web::web;
use chrono::{DateTime, NaiveDate, Utc};
use redb::Database;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::models::db_operations::{catalog_db_operations, users_db_operations};
use crate::models::{ContentType, Course, FeaturedPick, Viewer};
use crate::selection;
use crate::DbPool;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog_db_operations::CatalogError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("User not found")]
    NotFound,
}

#[derive(Serialize)]
pub struct Settings {
    pub creator_path_prefix: String,
    pub feed_page_size: String,
}

fn get_conn(
    pool: &web::Data<DbPool>,
) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, AdminHelperError> {
    pool.get().map_err(AdminHelperError::Pool)
}

// ====================================================================
// ======================= ACCOUNT MANAGEMENT =========================
// ====================================================================

pub fn create_account(
    pool: &web::Data<DbPool>,
    username: &str,
    password: &str,
    role: &str,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::create_user(&conn, username, password, role)?;
    Ok(())
}

pub fn fetch_all_accounts(pool: &web::Data<DbPool>) -> Result<Vec<Viewer>, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(users_db_operations::read_all_users(&conn)?)
}

pub fn update_account(
    pool: &web::Data<DbPool>,
    user_id: i64,
    username: &str,
    new_password: Option<&str>,
    is_active: bool,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::update_user(&conn, user_id, username, new_password, is_active)?;
    Ok(())
}

pub fn delete_account(pool: &web::Data<DbPool>, user_id: i64) -> Result<usize, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(users_db_operations::delete_user(&conn, user_id)?)
}

/// Grants (or cancels, with `None`) a subscription. Payment processing lives
/// with the external processor; this is the manual admin override for support
/// cases and comped accounts.
pub fn set_subscription(
    pool: &web::Data<DbPool>,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::set_subscription_expiry(&conn, user_id, expires_at)?;
    Ok(())
}

/// Records a one-off purchase on behalf of an account, same support-case
/// rationale as `set_subscription`.
pub fn grant_purchase(
    pool: &web::Data<DbPool>,
    user_id: i64,
    content_id: &str,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::record_purchase(&conn, user_id, content_id)?;
    Ok(())
}

// ====================================================================
// ========================== SETTINGS ================================
// ====================================================================

// Takes a direct connection because it's also used during server startup,
// before the pool lands in Actix's app_data.
pub fn get_settings(conn: &Connection) -> Settings {
    let prefix = users_db_operations::read_setting(conn, "creator_path_prefix")
        .unwrap_or_else(|| "default-path-not-found".to_string());

    let feed_page_size = users_db_operations::read_setting(conn, "feed_page_size")
        .unwrap_or_else(|| "50".to_string());

    Settings {
        creator_path_prefix: prefix,
        feed_page_size,
    }
}

pub fn update_setting(
    pool: &web::Data<DbPool>,
    key: &str,
    value: &str,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::update_setting(&conn, key, value)?;
    Ok(())
}

// ====================================================================
// ======================= FEATURED PICKS =============================
// ====================================================================

/// Pins the daily free pick for a date and type. The target must exist, be of
/// the right type, and be eligible right now — a pin pointing at a paywalled
/// broken upload would silently fall back at selection time, so reject it here
/// where the admin can see the reason.
pub fn pin_featured_pick(
    db: &web::Data<Database>,
    date: NaiveDate,
    content_type: ContentType,
    content_id: &str,
) -> Result<(), AdminHelperError> {
    let item = catalog_db_operations::read_content_by_id(db, content_id)?
        .ok_or_else(|| AdminHelperError::Validation(format!("content '{}' does not exist", content_id)))?;

    if item.metadata.content_type != content_type {
        return Err(AdminHelperError::Validation(format!(
            "content '{}' is a {}, not a {}",
            content_id, item.metadata.content_type, content_type
        )));
    }
    if !selection::is_eligible(&item) {
        return Err(AdminHelperError::Validation(format!(
            "content '{}' is unpublished or has a broken video reference",
            content_id
        )));
    }

    catalog_db_operations::upsert_featured_pick(db, date, content_type, content_id)?;
    Ok(())
}

pub fn unpin_featured_pick(
    db: &web::Data<Database>,
    date: NaiveDate,
    content_type: ContentType,
) -> Result<(), AdminHelperError> {
    catalog_db_operations::delete_featured_pick(db, date, content_type)?;
    Ok(())
}

pub fn fetch_all_featured_picks(
    db: &web::Data<Database>,
) -> Result<Vec<FeaturedPick>, AdminHelperError> {
    Ok(catalog_db_operations::read_all_featured_picks(db)?)
}

// ====================================================================
// ======================= CATALOG DIAGNOSTICS ========================
// ====================================================================

#[derive(Serialize)]
pub struct CatalogIssue {
    pub content_id: String,
    pub title: String,
    pub detail: String,
}

#[derive(Serialize)]
pub struct CatalogReport {
    pub broken_video_refs: Vec<CatalogIssue>,
    pub orphaned_lessons: Vec<CatalogIssue>,
    pub dangling_picks: Vec<CatalogIssue>,
}

impl CatalogReport {
    pub fn is_clean(&self) -> bool {
        self.broken_video_refs.is_empty()
            && self.orphaned_lessons.is_empty()
            && self.dangling_picks.is_empty()
    }
}

/// Full-catalog health scan for the admin dashboard: items whose video
/// reference is missing or an error sentinel, lessons pointing at a missing
/// course, and featured picks pointing at missing or ineligible items.
pub fn run_catalog_diagnostics(db: &web::Data<Database>) -> Result<CatalogReport, AdminHelperError> {
    let items = catalog_db_operations::read_all_content_raw(db)?;
    let courses: HashMap<String, Course> = catalog_db_operations::read_all_courses(db)?
        .into_iter()
        .map(|course| (course.id.clone(), course))
        .collect();
    let picks = catalog_db_operations::read_all_featured_picks(db)?;

    let mut broken_video_refs = Vec::new();
    let mut orphaned_lessons = Vec::new();

    for item in &items {
        match item.metadata.video_ref.as_deref() {
            None => broken_video_refs.push(CatalogIssue {
                content_id: item.id.clone(),
                title: item.metadata.title.clone(),
                detail: "no video reference".to_string(),
            }),
            Some(video_ref) if video_ref == "error" || video_ref.starts_with("ERROR") => {
                broken_video_refs.push(CatalogIssue {
                    content_id: item.id.clone(),
                    title: item.metadata.title.clone(),
                    detail: format!("error sentinel: {}", video_ref),
                })
            }
            Some(_) => {}
        }

        if item.metadata.content_type == ContentType::Lesson {
            match item.metadata.course_id.as_deref() {
                None => orphaned_lessons.push(CatalogIssue {
                    content_id: item.id.clone(),
                    title: item.metadata.title.clone(),
                    detail: "lesson has no parent course".to_string(),
                }),
                Some(course_id) if !courses.contains_key(course_id) => {
                    orphaned_lessons.push(CatalogIssue {
                        content_id: item.id.clone(),
                        title: item.metadata.title.clone(),
                        detail: format!("parent course '{}' does not exist", course_id),
                    })
                }
                Some(_) => {}
            }
        }
    }

    let mut dangling_picks = Vec::new();
    for pick in &picks {
        let resolved = catalog_db_operations::read_content_by_id(db, &pick.content_id)?;
        let detail = match resolved {
            None => Some("pick target no longer exists".to_string()),
            Some(item) if !selection::is_eligible(&item) => {
                Some("pick target is unpublished or has a broken video reference".to_string())
            }
            Some(_) => None,
        };
        if let Some(detail) = detail {
            dangling_picks.push(CatalogIssue {
                content_id: pick.content_id.clone(),
                title: format!("{} pick for {}", pick.content_type, pick.date),
                detail,
            });
        }
    }

    Ok(CatalogReport {
        broken_video_refs,
        orphaned_lessons,
        dangling_picks,
    })
}
