use redb::{CommitError, Database, StorageError, TableDefinition, TableError, TransactionError};
use rusqlite::{Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_viewers_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    println!("- Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'creator', 'viewer')),
            is_active INTEGER NOT NULL DEFAULT 1,
            subscription_expires_at TEXT,
            last_login_time TEXT
        )",
        [],
    )?;

    println!("- Creating 'purchases' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS purchases (
            user_id INTEGER NOT NULL,
            content_id TEXT NOT NULL,
            purchased_at TEXT NOT NULL,
            PRIMARY KEY (user_id, content_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'settings' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    seed_initial_settings(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    println!("- Seeding initial settings...");
    let default_prefix = "creators";
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('creator_path_prefix', ?1)",
        [&default_prefix],
    )?;
    println!("  > Default creator path prefix set to: {}", default_prefix);

    let default_page_size = "50";
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('feed_page_size', ?1)",
        [&default_page_size],
    )?;
    println!("  > Default feed page size set to: {}", default_page_size);

    Ok(())
}

pub fn setup_catalog_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        const CONTENT_META: TableDefinition<&[u8; 16], &str> = TableDefinition::new("content_meta");
        const TYPE_INDEX: TableDefinition<(u8, i64, &[u8; 16]), ()> =
            TableDefinition::new("type_index");
        const COURSES: TableDefinition<&[u8; 16], &str> = TableDefinition::new("courses");
        const FEATURED_PICKS: TableDefinition<(&str, u8), &[u8; 16]> =
            TableDefinition::new("featured_picks");

        println!("- Creating 'content_meta' table in Redb...");
        write_txn.open_table(CONTENT_META)?;

        println!("- Creating 'type_index' table in Redb...");
        write_txn.open_table(TYPE_INDEX)?;

        println!("- Creating 'courses' table in Redb...");
        write_txn.open_table(COURSES)?;

        println!("- Creating 'featured_picks' table in Redb...");
        write_txn.open_table(FEATURED_PICKS)?;
    }
    write_txn.commit()?;
    Ok(())
}
