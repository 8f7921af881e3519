use crate::models::{MessageRow, UserRow};
use crate::{Database, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password, u.date_joined";

impl Database {
    // -- Users --

    /// Inserts a user together with its auth token in one transaction, so an
    /// account never exists without a token.
    pub fn create_user_with_token(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        token_key: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRow> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (username, email, password, date_joined) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, &now),
            )?;
            let user_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO auth_tokens (key, user_id, created) VALUES (?1, ?2, ?3)",
                (token_key, user_id, &now),
            )?;
            tx.commit()?;

            Ok(UserRow {
                id: user_id,
                username: username.to_string(),
                email: email.to_string(),
                password: password_hash.to_string(),
                date_joined: now,
            })
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"), username)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1"), email)
        })
    }

    // -- Tokens --

    pub fn get_user_by_token(&self, key: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                &format!(
                    "SELECT {USER_COLUMNS} FROM auth_tokens t
                     JOIN users u ON t.user_id = u.id
                     WHERE t.key = ?1"
                ),
                key,
            )
        })
    }

    /// Returns the user's token, storing `candidate_key` first if the user
    /// has none. A user never holds more than one token.
    pub fn get_or_create_token(
        &self,
        user_id: i64,
        candidate_key: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO auth_tokens (key, user_id, created) VALUES (?1, ?2, ?3)",
                (candidate_key, user_id, &now),
            )?;
            let key = conn.query_row(
                "SELECT key FROM auth_tokens WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(key)
        })
    }

    /// Returns true if a token was removed.
    pub fn delete_token(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM auth_tokens WHERE user_id = ?1", [user_id])?;
            Ok(removed > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        user_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let created_at = format_timestamp(created_at);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, content, created_at) VALUES (?1, ?2, ?3)",
                (user_id, content, &created_at),
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                "SELECT m.id, m.user_id, u.username, m.content, m.created_at
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.id = ?1",
                [id],
                message_from_row,
            )?;
            Ok(row)
        })
    }

    /// Every message on the wall, newest first.
    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(query_messages)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        date_joined: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user(conn: &Connection, sql: &str, param: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([param], user_from_row).optional()?;
    Ok(row)
}

fn query_messages(conn: &Connection) -> Result<Vec<MessageRow>> {
    // JOIN users to fetch the author's username in a single query
    let mut stmt = conn.prepare(
        "SELECT m.id, m.user_id, u.username, m.content, m.created_at
         FROM messages m
         JOIN users u ON m.user_id = u.id
         ORDER BY m.created_at DESC, m.id DESC",
    )?;

    let rows = stmt
        .query_map([], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
