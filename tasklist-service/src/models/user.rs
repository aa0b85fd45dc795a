use sqlx::FromRow;

/// Row of the `users` table. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}
