use redb::{
    CommitError, Database, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ContentItem, ContentMetadata, ContentType, Course, FeaturedPick};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),
    #[error("Item not found in catalog: {0}")]
    NotFound(String),
}

// --- Catalog tables ---
// Content metadata is stored as JSON keyed by uuid; the type index orders every
// item of one content type chronologically for listing and pool fetches.
pub const CONTENT_META: TableDefinition<&[u8; 16], &str> = TableDefinition::new("content_meta");
pub const TYPE_INDEX: TableDefinition<(u8, i64, &[u8; 16]), ()> = TableDefinition::new("type_index");
pub const COURSES: TableDefinition<&[u8; 16], &str> = TableDefinition::new("courses");

// --- Featured picks ---
// One row per (ISO date, content type tag); the value is the pinned content id.
pub const FEATURED_PICKS: TableDefinition<(&str, u8), &[u8; 16]> =
    TableDefinition::new("featured_picks");

const PICK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Lessons have no publish flag of their own; they are visible exactly when
/// their parent course is published. Other types keep the stored flag.
fn resolve_published<T>(courses: &T, metadata: &ContentMetadata) -> bool
where
    T: ReadableTable<&'static [u8; 16], &'static str>,
{
    match (metadata.content_type, metadata.course_id.as_deref()) {
        (ContentType::Lesson, Some(course_id)) => {
            let Ok(course_uuid) = Uuid::parse_str(course_id) else {
                return false;
            };
            let course_bytes = course_uuid.into_bytes();
            match courses.get(&course_bytes) {
                Ok(Some(guard)) => serde_json::from_str::<Course>(guard.value())
                    .map(|course| course.published)
                    .unwrap_or(false),
                _ => false,
            }
        }
        // A lesson without a parent course is an orphan and never visible.
        (ContentType::Lesson, None) => false,
        _ => metadata.published,
    }
}

// ====================================================================
// ======================= COURSE OPERATIONS ==========================
// ====================================================================

pub fn create_course(db: &Database, title: &str, creator_id: i64) -> Result<String, CatalogError> {
    let course_uuid = Uuid::new_v4();
    let course = Course {
        id: course_uuid.to_string(),
        title: title.to_string(),
        creator_id,
        published: false,
        created_at: Utc::now(),
    };
    let course_json = serde_json::to_string(&course)?;

    let write_txn = db.begin_write()?;
    {
        let mut courses = write_txn.open_table(COURSES)?;
        courses.insert(&course_uuid.into_bytes(), course_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(course.id)
}

pub fn read_course(db: &Database, course_id: &str) -> Result<Option<Course>, CatalogError> {
    let course_uuid = Uuid::parse_str(course_id)?;
    let read_txn = db.begin_read()?;
    let courses = read_txn.open_table(COURSES)?;
    let result = match courses.get(&course_uuid.into_bytes())? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

pub fn read_all_courses(db: &Database) -> Result<Vec<Course>, CatalogError> {
    let read_txn = db.begin_read()?;
    let courses = read_txn.open_table(COURSES)?;
    let mut all: Vec<Course> = courses
        .iter()?
        .filter_map(|entry| entry.ok())
        .filter_map(|(_key, value)| serde_json::from_str::<Course>(value.value()).ok())
        .collect();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(all)
}

/// Flips a course's publish flag. Publish state of every lesson underneath
/// follows automatically because lessons resolve it at read time.
pub fn set_course_published(
    db: &Database,
    course_id: &str,
    published: bool,
) -> Result<(), CatalogError> {
    let course_uuid = Uuid::parse_str(course_id)?;
    let course_bytes = course_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    {
        let mut courses = write_txn.open_table(COURSES)?;
        let mut course: Course = {
            let guard = courses
                .get(&course_bytes)?
                .ok_or_else(|| CatalogError::NotFound(format!("course {}", course_id)))?;
            serde_json::from_str(guard.value())?
        };
        course.published = published;
        let course_json = serde_json::to_string(&course)?;
        courses.insert(&course_bytes, course_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

// ====================================================================
// ======================= CONTENT OPERATIONS =========================
// ====================================================================

pub fn create_content(db: &Database, metadata: &ContentMetadata) -> Result<String, CatalogError> {
    let content_uuid = Uuid::new_v4();
    let metadata_json = serde_json::to_string(metadata)?;

    let write_txn = db.begin_write()?;
    {
        let mut meta_table = write_txn.open_table(CONTENT_META)?;
        let mut type_index = write_txn.open_table(TYPE_INDEX)?;

        let content_bytes = content_uuid.into_bytes();
        meta_table.insert(&content_bytes, metadata_json.as_str())?;
        type_index.insert(
            (
                metadata.content_type.tag(),
                metadata.created_at.timestamp_millis(),
                &content_bytes,
            ),
            (),
        )?;
    }
    write_txn.commit()?;
    Ok(content_uuid.to_string())
}

/// Replaces the stored metadata for one item. The content type and creation
/// timestamp are taken from the existing row so the type index key stays valid.
pub fn update_content(
    db: &Database,
    content_id: &str,
    mut metadata: ContentMetadata,
) -> Result<(), CatalogError> {
    let content_uuid = Uuid::parse_str(content_id)?;
    let content_bytes = content_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    {
        let mut meta_table = write_txn.open_table(CONTENT_META)?;
        let existing: ContentMetadata = {
            let guard = meta_table
                .get(&content_bytes)?
                .ok_or_else(|| CatalogError::NotFound(format!("content {}", content_id)))?;
            serde_json::from_str(guard.value())?
        };
        metadata.content_type = existing.content_type;
        metadata.created_at = existing.created_at;
        metadata.last_updated_at = Some(Utc::now());

        let metadata_json = serde_json::to_string(&metadata)?;
        meta_table.insert(&content_bytes, metadata_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Removes an item and its index entry. Featured picks that still point at the
/// id are left in place: the selector falls back past them and the diagnostics
/// report surfaces them for cleanup.
pub fn delete_content(db: &Database, content_id: &str) -> Result<(), CatalogError> {
    let content_uuid = Uuid::parse_str(content_id)?;
    let content_bytes = content_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    {
        let mut meta_table = write_txn.open_table(CONTENT_META)?;
        let mut type_index = write_txn.open_table(TYPE_INDEX)?;

        if let Some(guard) = meta_table.remove(&content_bytes)? {
            if let Ok(metadata) = serde_json::from_str::<ContentMetadata>(guard.value()) {
                type_index.remove((
                    metadata.content_type.tag(),
                    metadata.created_at.timestamp_millis(),
                    &content_bytes,
                ))?;
            }
        };
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_content_by_id(db: &Database, content_id: &str) -> Result<Option<ContentItem>, CatalogError> {
    let content_uuid = Uuid::parse_str(content_id)?;
    let read_txn = db.begin_read()?;
    let meta_table = read_txn.open_table(CONTENT_META)?;
    let courses = read_txn.open_table(COURSES)?;

    let result = match meta_table.get(&content_uuid.into_bytes())? {
        Some(guard) => {
            let mut metadata: ContentMetadata = serde_json::from_str(guard.value())?;
            metadata.published = resolve_published(&courses, &metadata);
            Ok(Some(ContentItem {
                id: content_uuid.to_string(),
                metadata,
            }))
        }
        None => Ok(None),
    };
    result
}

/// First stage of the daily-pick pipeline: every item of one content type, in
/// chronological index order, with lesson publish state already resolved
/// through the parent course. Eligibility filtering happens in memory in the
/// selection layer, not here.
pub fn read_content_pool(
    db: &Database,
    content_type: ContentType,
) -> Result<Vec<ContentItem>, CatalogError> {
    let read_txn = db.begin_read()?;
    let type_index = read_txn.open_table(TYPE_INDEX)?;
    let meta_table = read_txn.open_table(CONTENT_META)?;
    let courses = read_txn.open_table(COURSES)?;

    let start_key = (content_type.tag(), i64::MIN, &[0u8; 16]);
    let end_key = (content_type.tag(), i64::MAX, &[255u8; 16]);

    let pool = type_index
        .range(start_key..=end_key)?
        .filter_map(|entry| entry.ok())
        .filter_map(|(key, _value)| {
            let content_bytes = key.value().2;
            let content_uuid = Uuid::from_bytes(*content_bytes);
            meta_table.get(content_bytes).ok().flatten().and_then(|guard| {
                serde_json::from_str::<ContentMetadata>(guard.value())
                    .ok()
                    .map(|mut metadata| {
                        metadata.published = resolve_published(&courses, &metadata);
                        ContentItem {
                            id: content_uuid.to_string(),
                            metadata,
                        }
                    })
            })
        })
        .collect();
    Ok(pool)
}

/// Newest-first listing for the management and creator dashboards.
pub fn list_content_by_type(
    db: &Database,
    content_type: ContentType,
    limit: u32,
    offset: u32,
) -> Result<Vec<ContentItem>, CatalogError> {
    let read_txn = db.begin_read()?;
    let type_index = read_txn.open_table(TYPE_INDEX)?;
    let meta_table = read_txn.open_table(CONTENT_META)?;
    let courses = read_txn.open_table(COURSES)?;

    let start_key = (content_type.tag(), i64::MIN, &[0u8; 16]);
    let end_key = (content_type.tag(), i64::MAX, &[255u8; 16]);

    let items = type_index
        .range(start_key..=end_key)?
        .rev()
        .skip(offset as usize)
        .take(limit as usize)
        .filter_map(|entry| entry.ok())
        .filter_map(|(key, _value)| {
            let content_bytes = key.value().2;
            let content_uuid = Uuid::from_bytes(*content_bytes);
            meta_table.get(content_bytes).ok().flatten().and_then(|guard| {
                serde_json::from_str::<ContentMetadata>(guard.value())
                    .ok()
                    .map(|mut metadata| {
                        metadata.published = resolve_published(&courses, &metadata);
                        ContentItem {
                            id: content_uuid.to_string(),
                            metadata,
                        }
                    })
            })
        })
        .collect();
    Ok(items)
}

/// Full-catalog scan with publish state left as stored. Used by diagnostics,
/// which needs to see unpublished and broken rows as-is; acceptable cost for an
/// infrequent admin action.
pub fn read_all_content_raw(db: &Database) -> Result<Vec<ContentItem>, CatalogError> {
    let read_txn = db.begin_read()?;
    let meta_table = read_txn.open_table(CONTENT_META)?;

    let items = meta_table
        .iter()?
        .filter_map(|entry| entry.ok())
        .filter_map(|(key, value)| {
            let content_uuid = Uuid::from_bytes(*key.value());
            serde_json::from_str(value.value())
                .ok()
                .map(|metadata| ContentItem {
                    id: content_uuid.to_string(),
                    metadata,
                })
        })
        .collect();
    Ok(items)
}

// ====================================================================
// ===================== FEATURED PICK OPERATIONS =====================
// ====================================================================

fn pick_date_key(date: NaiveDate) -> String {
    date.format(PICK_DATE_FORMAT).to_string()
}

/// The admin override for `(date, content_type)`, if one has been pinned.
pub fn read_featured_pick(
    db: &Database,
    date: NaiveDate,
    content_type: ContentType,
) -> Result<Option<String>, CatalogError> {
    let read_txn = db.begin_read()?;
    let picks = read_txn.open_table(FEATURED_PICKS)?;
    let date_key = pick_date_key(date);
    let result = match picks.get((date_key.as_str(), content_type.tag()))? {
        Some(guard) => Ok(Some(Uuid::from_bytes(*guard.value()).to_string())),
        None => Ok(None),
    };
    result
}

/// Pins (or re-pins) the daily free pick for one date and type. The referenced
/// item must exist in the catalog; eligibility is re-checked at selection time.
pub fn upsert_featured_pick(
    db: &Database,
    date: NaiveDate,
    content_type: ContentType,
    content_id: &str,
) -> Result<(), CatalogError> {
    let content_uuid = Uuid::parse_str(content_id)?;
    let content_bytes = content_uuid.into_bytes();
    let date_key = pick_date_key(date);

    let write_txn = db.begin_write()?;
    {
        let meta_table = write_txn.open_table(CONTENT_META)?;
        if meta_table.get(&content_bytes)?.is_none() {
            return Err(CatalogError::NotFound(format!("content {}", content_id)));
        }
        let mut picks = write_txn.open_table(FEATURED_PICKS)?;
        picks.insert((date_key.as_str(), content_type.tag()), &content_bytes)?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn delete_featured_pick(
    db: &Database,
    date: NaiveDate,
    content_type: ContentType,
) -> Result<(), CatalogError> {
    let date_key = pick_date_key(date);
    let write_txn = db.begin_write()?;
    {
        let mut picks = write_txn.open_table(FEATURED_PICKS)?;
        picks.remove((date_key.as_str(), content_type.tag()))?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Every pinned pick, newest date first. Full scan; the table stays tiny (one
/// row per date and type).
pub fn read_all_featured_picks(db: &Database) -> Result<Vec<FeaturedPick>, CatalogError> {
    let read_txn = db.begin_read()?;
    let picks = read_txn.open_table(FEATURED_PICKS)?;

    let mut all: Vec<FeaturedPick> = picks
        .iter()?
        .filter_map(|entry| entry.ok())
        .filter_map(|(key, value)| {
            let (date_str, tag) = key.value();
            let date = NaiveDate::parse_from_str(date_str, PICK_DATE_FORMAT).ok()?;
            let content_type = ContentType::from_tag(tag)?;
            Some(FeaturedPick {
                date,
                content_type,
                content_id: Uuid::from_bytes(*value.value()).to_string(),
            })
        })
        .collect();
    all.sort_by(|a, b| b.date.cmp(&a.date).then(a.content_type.tag().cmp(&b.content_type.tag())));
    Ok(all)
}
