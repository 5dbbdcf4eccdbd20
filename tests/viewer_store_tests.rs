mod common;

use chrono::{Duration, Utc};

use matbase_backend::models::db_operations::users_db_operations;

#[test]
fn credentials_verify_and_suspension_blocks_login() {
    let (_dir, conn) = common::temp_viewers();

    users_db_operations::create_user(&conn, "kim", "correct horse battery", "viewer").unwrap();

    let verified = users_db_operations::verify_credentials(&conn, "kim", "correct horse battery")
        .expect("valid credentials should verify");
    assert_eq!(verified.1, "kim");
    assert_eq!(verified.2, "viewer");

    assert!(users_db_operations::verify_credentials(&conn, "kim", "wrong password").is_none());

    let user = users_db_operations::read_user_by_username(&conn, "kim").unwrap();
    users_db_operations::update_user(&conn, user.id, "kim", None, false).unwrap();
    assert!(
        users_db_operations::verify_credentials(&conn, "kim", "correct horse battery").is_none(),
        "suspended accounts must not log in"
    );
}

#[test]
fn subscription_state_follows_the_expiry_timestamp() {
    let (_dir, conn) = common::temp_viewers();

    users_db_operations::create_user(&conn, "lee", "a long password", "viewer").unwrap();
    let user = users_db_operations::read_user_by_username(&conn, "lee").unwrap();

    // No expiry at all.
    assert!(!users_db_operations::is_subscriber(&conn, user.id));

    // A future expiry subscribes.
    users_db_operations::set_subscription_expiry(&conn, user.id, Some(Utc::now() + Duration::days(30)))
        .unwrap();
    assert!(users_db_operations::is_subscriber(&conn, user.id));

    // A past expiry does not.
    users_db_operations::set_subscription_expiry(&conn, user.id, Some(Utc::now() - Duration::days(1)))
        .unwrap();
    assert!(!users_db_operations::is_subscriber(&conn, user.id));

    // Cancelling clears the state.
    users_db_operations::set_subscription_expiry(&conn, user.id, None).unwrap();
    assert!(!users_db_operations::is_subscriber(&conn, user.id));
}

#[test]
fn unparseable_expiry_fails_toward_not_subscribed() {
    let (_dir, conn) = common::temp_viewers();

    users_db_operations::create_user(&conn, "park", "a long password", "viewer").unwrap();
    let user = users_db_operations::read_user_by_username(&conn, "park").unwrap();

    conn.execute(
        "UPDATE users SET subscription_expires_at = 'not-a-timestamp' WHERE id = ?1",
        [user.id],
    )
    .unwrap();
    assert!(!users_db_operations::is_subscriber(&conn, user.id));
}

#[test]
fn purchases_accumulate_and_deduplicate() {
    let (_dir, conn) = common::temp_viewers();

    users_db_operations::create_user(&conn, "choi", "a long password", "viewer").unwrap();
    let user = users_db_operations::read_user_by_username(&conn, "choi").unwrap();

    assert!(users_db_operations::read_purchased_content_ids(&conn, user.id)
        .unwrap()
        .is_empty());

    users_db_operations::record_purchase(&conn, user.id, "content-a").unwrap();
    users_db_operations::record_purchase(&conn, user.id, "content-b").unwrap();
    // Recording the same purchase twice is a no-op.
    users_db_operations::record_purchase(&conn, user.id, "content-a").unwrap();

    let purchased = users_db_operations::read_purchased_content_ids(&conn, user.id).unwrap();
    assert_eq!(purchased.len(), 2);
    assert!(purchased.contains("content-a"));
    assert!(purchased.contains("content-b"));
}

#[test]
fn settings_are_seeded_and_updatable() {
    let (_dir, conn) = common::temp_viewers();

    assert_eq!(
        users_db_operations::read_setting(&conn, "creator_path_prefix").as_deref(),
        Some("creators")
    );
    assert_eq!(
        users_db_operations::read_setting(&conn, "feed_page_size").as_deref(),
        Some("50")
    );
    assert!(users_db_operations::read_setting(&conn, "no_such_key").is_none());

    users_db_operations::update_setting(&conn, "creator_path_prefix", "mat-crew").unwrap();
    assert_eq!(
        users_db_operations::read_setting(&conn, "creator_path_prefix").as_deref(),
        Some("mat-crew")
    );
}
