use actix_web::web;
use chrono::Utc;
use redb::Database;

use crate::helper::sanitization_helpers;
use crate::models::db_operations::{catalog_db_operations, users_db_operations};
use crate::models::{ContentAction, ContentItem, ContentMetadata, ContentType, Course, Viewer};
use crate::DbPool;

pub fn get_creator_details(pool: &web::Data<DbPool>, username: &str) -> Option<Viewer> {
    let conn = pool.get().ok()?;
    users_db_operations::read_user_by_username(&conn, username)
}

/// Creators may edit and delete only their own catalog rows; admins may touch
/// anything.
pub fn can_perform_action(creator: &Viewer, item: &ContentItem, _action: ContentAction) -> bool {
    if creator.role == "admin" {
        return true;
    }
    creator.role == "creator" && item.metadata.creator_id == creator.id
}

pub fn can_manage_course(creator: &Viewer, course: &Course) -> bool {
    if creator.role == "admin" {
        return true;
    }
    creator.role == "creator" && course.creator_id == creator.id
}

/// Creates a catalog item from sanitized creator input. Lessons must name a
/// parent course the creator controls; a video reference, when present, must
/// be well-formed (upload-failure sentinels are written by the ingest side,
/// never accepted from a form).
pub fn create_content(
    db: &web::Data<Database>,
    creator: &Viewer,
    title: &str,
    content_type: ContentType,
    price: u32,
    course_id: Option<&str>,
    video_ref: Option<&str>,
    description: &str,
    published: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let clean_title = sanitization_helpers::strip_all_html(title);
    if clean_title.trim().is_empty() {
        return Err("Title must not be empty.".into());
    }

    if let Some(video_ref) = video_ref {
        if !sanitization_helpers::is_valid_video_ref(video_ref) {
            return Err("Video reference must be a numeric id or an id:hash pair.".into());
        }
    }

    let course_id = match content_type {
        ContentType::Lesson => {
            let course_id = course_id.ok_or("A lesson needs a parent course.")?;
            let course = catalog_db_operations::read_course(db, course_id)?
                .ok_or("The parent course does not exist.")?;
            if !can_manage_course(creator, &course) {
                return Err("You do not own the parent course.".into());
            }
            Some(course_id.to_string())
        }
        _ => None,
    };

    let metadata = ContentMetadata {
        title: clean_title,
        content_type,
        price,
        creator_id: creator.id,
        course_id,
        published,
        video_ref: video_ref.map(|s| s.to_string()),
        description: description.to_string(),
        created_at: Utc::now(),
        last_updated_at: None,
    };
    Ok(catalog_db_operations::create_content(db, &metadata)?)
}

pub fn update_content(
    db: &web::Data<Database>,
    creator: &Viewer,
    content_id: &str,
    title: &str,
    price: u32,
    video_ref: Option<&str>,
    description: &str,
    published: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = catalog_db_operations::read_content_by_id(db, content_id)?
        .ok_or("Content not found.")?;
    if !can_perform_action(creator, &existing, ContentAction::Edit) {
        return Err("You may only edit your own content.".into());
    }

    let clean_title = sanitization_helpers::strip_all_html(title);
    if clean_title.trim().is_empty() {
        return Err("Title must not be empty.".into());
    }
    if let Some(video_ref) = video_ref {
        if !sanitization_helpers::is_valid_video_ref(video_ref) {
            return Err("Video reference must be a numeric id or an id:hash pair.".into());
        }
    }

    let mut metadata = existing.metadata;
    metadata.title = clean_title;
    metadata.price = price;
    metadata.video_ref = video_ref.map(|s| s.to_string());
    metadata.description = description.to_string();
    metadata.published = published;

    catalog_db_operations::update_content(db, content_id, metadata)?;
    Ok(())
}

pub fn delete_content(
    db: &web::Data<Database>,
    creator: &Viewer,
    content_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = catalog_db_operations::read_content_by_id(db, content_id)?
        .ok_or("Content not found.")?;
    if !can_perform_action(creator, &existing, ContentAction::Delete) {
        return Err("You may only delete your own content.".into());
    }
    catalog_db_operations::delete_content(db, content_id)?;
    Ok(())
}

pub fn create_course(
    db: &web::Data<Database>,
    creator: &Viewer,
    title: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let clean_title = sanitization_helpers::strip_all_html(title);
    if clean_title.trim().is_empty() {
        return Err("Course title must not be empty.".into());
    }
    Ok(catalog_db_operations::create_course(db, &clean_title, creator.id)?)
}

/// Publishing a course makes every lesson underneath it visible in one step.
pub fn set_course_published(
    db: &web::Data<Database>,
    creator: &Viewer,
    course_id: &str,
    published: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let course = catalog_db_operations::read_course(db, course_id)?.ok_or("Course not found.")?;
    if !can_manage_course(creator, &course) {
        return Err("You may only publish your own courses.".into());
    }
    catalog_db_operations::set_course_published(db, course_id, published)?;
    Ok(())
}

/// Everything this creator has in the catalog, newest first, across all three
/// content types. Filtered in memory; creator catalogs stay small.
pub fn list_own_content(
    db: &web::Data<Database>,
    creator: &Viewer,
) -> Result<Vec<ContentItem>, Box<dyn std::error::Error>> {
    let mut own: Vec<ContentItem> = catalog_db_operations::read_all_content_raw(db)?
        .into_iter()
        .filter(|item| item.metadata.creator_id == creator.id)
        .collect();
    own.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
    Ok(own)
}

pub fn list_own_courses(
    db: &web::Data<Database>,
    creator: &Viewer,
) -> Result<Vec<Course>, Box<dyn std::error::Error>> {
    Ok(catalog_db_operations::read_all_courses(db)?
        .into_iter()
        .filter(|course| course.creator_id == creator.id)
        .collect())
}
