use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, DomainResult, NewUser, ProfileChanges, User, UserId, UserRepository, UserRole,
};

use super::{map_sqlx, PgStore};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, role, date_joined";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: Option<String>,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = UserRole::parse(&row.role)
            .ok_or_else(|| DomainError::internal(format!("unknown role '{}'", row.role)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role,
            date_joined: row.date_joined,
        })
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.try_into()
    }

    async fn find(&self, id: UserId) -> DomainResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.ok_or_else(|| DomainError::not_found("user", id))?
            .try_into()
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> DomainResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    async fn count(&self) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
