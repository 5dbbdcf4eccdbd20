mod common;

use chrono::{Duration, NaiveDate};

use matbase_backend::models::db_operations::catalog_db_operations::{self, CatalogError};
use matbase_backend::models::ContentType;

#[test]
fn content_round_trips_through_the_catalog() {
    let (_dir, db) = common::temp_catalog();

    let meta = common::metadata("Guard retention drill", ContentType::Drill, 9_000, Some("1234"), true);
    let id = catalog_db_operations::create_content(&db, &meta).unwrap();

    let item = catalog_db_operations::read_content_by_id(&db, &id)
        .unwrap()
        .expect("item should exist");
    assert_eq!(item.id, id);
    assert_eq!(item.metadata.title, "Guard retention drill");
    assert_eq!(item.metadata.price, 9_000);
    assert!(item.metadata.published);
}

#[test]
fn lessons_take_publish_state_from_their_course() {
    let (_dir, db) = common::temp_catalog();

    let course_id = catalog_db_operations::create_course(&db, "Closed guard basics", 1).unwrap();

    let mut meta = common::metadata("Lesson one", ContentType::Lesson, 12_000, Some("99:aa"), true);
    meta.course_id = Some(course_id.clone());
    let lesson_id = catalog_db_operations::create_content(&db, &meta).unwrap();

    // The course starts unpublished, so the lesson reads as unpublished even
    // though its own stored flag is true.
    let lesson = catalog_db_operations::read_content_by_id(&db, &lesson_id)
        .unwrap()
        .unwrap();
    assert!(!lesson.metadata.published);

    catalog_db_operations::set_course_published(&db, &course_id, true).unwrap();
    let lesson = catalog_db_operations::read_content_by_id(&db, &lesson_id)
        .unwrap()
        .unwrap();
    assert!(lesson.metadata.published);
}

#[test]
fn pool_fetch_returns_only_the_requested_type() {
    let (_dir, db) = common::temp_catalog();

    catalog_db_operations::create_content(
        &db,
        &common::metadata("Drill A", ContentType::Drill, 0, Some("1"), true),
    )
    .unwrap();
    catalog_db_operations::create_content(
        &db,
        &common::metadata("Sparring A", ContentType::Sparring, 0, Some("2"), true),
    )
    .unwrap();

    let drills = catalog_db_operations::read_content_pool(&db, ContentType::Drill).unwrap();
    assert_eq!(drills.len(), 1);
    assert_eq!(drills[0].metadata.title, "Drill A");
}

#[test]
fn listing_is_newest_first_and_paginates() {
    let (_dir, db) = common::temp_catalog();

    for i in 0..5 {
        let mut meta = common::metadata(
            &format!("Drill {}", i),
            ContentType::Drill,
            0,
            Some("1"),
            true,
        );
        meta.created_at = meta.created_at + Duration::days(i);
        catalog_db_operations::create_content(&db, &meta).unwrap();
    }

    let first_page = catalog_db_operations::list_content_by_type(&db, ContentType::Drill, 2, 0).unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].metadata.title, "Drill 4");
    assert_eq!(first_page[1].metadata.title, "Drill 3");

    let second_page =
        catalog_db_operations::list_content_by_type(&db, ContentType::Drill, 2, 2).unwrap();
    assert_eq!(second_page[0].metadata.title, "Drill 2");
}

#[test]
fn deleted_content_disappears_from_the_pool() {
    let (_dir, db) = common::temp_catalog();

    let id = catalog_db_operations::create_content(
        &db,
        &common::metadata("Drill A", ContentType::Drill, 0, Some("1"), true),
    )
    .unwrap();

    catalog_db_operations::delete_content(&db, &id).unwrap();
    assert!(catalog_db_operations::read_content_by_id(&db, &id)
        .unwrap()
        .is_none());
    assert!(catalog_db_operations::read_content_pool(&db, ContentType::Drill)
        .unwrap()
        .is_empty());
}

#[test]
fn featured_pick_upserts_and_deletes() {
    let (_dir, db) = common::temp_catalog();
    let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

    let first = catalog_db_operations::create_content(
        &db,
        &common::metadata("Drill A", ContentType::Drill, 0, Some("1"), true),
    )
    .unwrap();
    let second = catalog_db_operations::create_content(
        &db,
        &common::metadata("Drill B", ContentType::Drill, 0, Some("2"), true),
    )
    .unwrap();

    assert!(catalog_db_operations::read_featured_pick(&db, date, ContentType::Drill)
        .unwrap()
        .is_none());

    catalog_db_operations::upsert_featured_pick(&db, date, ContentType::Drill, &first).unwrap();
    assert_eq!(
        catalog_db_operations::read_featured_pick(&db, date, ContentType::Drill).unwrap(),
        Some(first)
    );

    // Re-pinning the same slot replaces the row; (date, type) stays unique.
    catalog_db_operations::upsert_featured_pick(&db, date, ContentType::Drill, &second).unwrap();
    assert_eq!(
        catalog_db_operations::read_featured_pick(&db, date, ContentType::Drill).unwrap(),
        Some(second)
    );
    assert_eq!(catalog_db_operations::read_all_featured_picks(&db).unwrap().len(), 1);

    catalog_db_operations::delete_featured_pick(&db, date, ContentType::Drill).unwrap();
    assert!(catalog_db_operations::read_featured_pick(&db, date, ContentType::Drill)
        .unwrap()
        .is_none());
}

#[test]
fn featured_pick_rejects_unknown_content() {
    let (_dir, db) = common::temp_catalog();
    let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

    let result = catalog_db_operations::upsert_featured_pick(
        &db,
        date,
        ContentType::Drill,
        "00000000-0000-0000-0000-000000000000",
    );
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

#[test]
fn picks_for_different_types_do_not_collide() {
    let (_dir, db) = common::temp_catalog();
    let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

    let drill = catalog_db_operations::create_content(
        &db,
        &common::metadata("Drill A", ContentType::Drill, 0, Some("1"), true),
    )
    .unwrap();
    let sparring = catalog_db_operations::create_content(
        &db,
        &common::metadata("Sparring A", ContentType::Sparring, 0, Some("2"), true),
    )
    .unwrap();

    catalog_db_operations::upsert_featured_pick(&db, date, ContentType::Drill, &drill).unwrap();
    catalog_db_operations::upsert_featured_pick(&db, date, ContentType::Sparring, &sparring)
        .unwrap();

    assert_eq!(
        catalog_db_operations::read_featured_pick(&db, date, ContentType::Drill).unwrap(),
        Some(drill)
    );
    assert_eq!(
        catalog_db_operations::read_featured_pick(&db, date, ContentType::Sparring).unwrap(),
        Some(sparring)
    );
}
