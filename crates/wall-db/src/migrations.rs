use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            date_joined TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS auth_tokens (
            key         TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id),
            created     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL CHECK (length(content) > 0),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at DESC, id DESC);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
