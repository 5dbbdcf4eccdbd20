use std::collections::HashSet;

use bcrypt::{hash, verify, BcryptError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Result as RusqliteResult};

use crate::models::Viewer;

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    role: &str,
) -> Result<(), RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        params![username, hashed_password, role],
    )?;
    Ok(())
}

pub fn read_all_users(conn: &Connection) -> Result<Vec<Viewer>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role, is_active, subscription_expires_at, last_login_time FROM users ORDER BY id",
    )?;
    let user_iter = stmt.query_map([], |row| {
        Ok(Viewer {
            id: row.get(0)?,
            username: row.get(1)?,
            role: row.get(2)?,
            is_active: row.get(3)?,
            subscription_expires_at: row.get(4)?,
            last_login_time: row.get(5)?,
        })
    })?;

    let users = user_iter.filter_map(|u| u.ok()).collect();
    Ok(users)
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Option<Viewer> {
    conn.query_row(
        "SELECT id, username, role, is_active, subscription_expires_at, last_login_time FROM users WHERE username = ?1",
        [username],
        |row| {
            Ok(Viewer {
                id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
                is_active: row.get(3)?,
                subscription_expires_at: row.get(4)?,
                last_login_time: row.get(5)?,
            })
        },
    )
    .ok()
}

pub fn update_user(
    conn: &Connection,
    user_id: i64,
    username: &str,
    new_password: Option<&str>,
    is_active: bool,
) -> Result<(), RusqliteError> {
    if let Some(password) = new_password {
        if !password.is_empty() {
            let hashed_password =
                hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
            conn.execute(
                "UPDATE users SET username = ?1, password_hash = ?2, is_active = ?3 WHERE id = ?4",
                params![username, hashed_password, is_active, user_id],
            )?;
            return Ok(());
        }
    }

    conn.execute(
        "UPDATE users SET username = ?1, is_active = ?2 WHERE id = ?3",
        params![username, is_active, user_id],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, user_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM users WHERE id = ?1", [user_id])
}

/// Checks a username/password pair against the stored hash. Suspended accounts
/// never verify. Returns `(id, username, role)` on success.
pub fn verify_credentials(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Option<(i64, String, String)> {
    let res: rusqlite::Result<(i64, String, String, bool)> = conn.query_row(
        "SELECT id, password_hash, role, is_active FROM users WHERE username = ?1",
        [username],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    );

    if let Ok((id, hash, role, is_active)) = res {
        if is_active && verify(password, &hash).unwrap_or(false) {
            return Some((id, username.to_string(), role));
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, username: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_time = ?1 WHERE username = ?2",
        params![now, username],
    )?;
    Ok(())
}

// ====================================================================
// ================== SUBSCRIPTION & PURCHASE STATE ===================
// ====================================================================

/// Sets or clears the subscription expiry for an account. Passing `None`
/// cancels the subscription outright.
pub fn set_subscription_expiry(
    conn: &Connection,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE users SET subscription_expires_at = ?1 WHERE id = ?2",
        params![expires_at.map(|t| t.to_rfc3339()), user_id],
    )?;
    Ok(())
}

/// True when the stored expiry parses and lies in the future. Anything else —
/// no row, NULL, an unparseable timestamp — counts as not subscribed.
pub fn is_subscriber(conn: &Connection, user_id: i64) -> bool {
    let stored: Option<String> = conn
        .query_row(
            "SELECT subscription_expires_at FROM users WHERE id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()
        .unwrap_or(None)
        .flatten();

    match stored {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|expires| expires.with_timezone(&Utc) > Utc::now())
            .unwrap_or(false),
        None => false,
    }
}

pub fn record_purchase(
    conn: &Connection,
    user_id: i64,
    content_id: &str,
) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO purchases (user_id, content_id, purchased_at) VALUES (?1, ?2, ?3)",
        params![user_id, content_id, now],
    )?;
    Ok(())
}

/// Every content id this account has bought outright.
pub fn read_purchased_content_ids(
    conn: &Connection,
    user_id: i64,
) -> Result<HashSet<String>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT content_id FROM purchases WHERE user_id = ?1")?;
    let id_iter = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;
    Ok(id_iter.filter_map(|id| id.ok()).collect())
}

// ====================================================================
// =========================== SETTINGS ===============================
// ====================================================================

pub fn read_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .unwrap_or(None)
}

pub fn update_setting(conn: &Connection, key: &str, value: &str) -> RusqliteResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}
