//! Database row types. These map directly to SQLite rows and are kept
//! apart from the wall-types API models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub date_joined: String,
}

/// A message joined with its author's username.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: String,
}
