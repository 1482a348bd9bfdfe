use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AuthError;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: i32,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    #[serde(skip_serializing)]
    pub token_exp: Option<i64>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, name, lastname, email, password_hash, role, image, token, token_exp, created_at";

pub struct NewUser<'a> {
    pub name: Option<&'a str>,
    pub lastname: Option<&'a str>,
    pub email: &'a str,
    pub password_hash: &'a str,
}

impl User {
    /// Insert a new user. The password must already be hashed; hashing is
    /// composed explicitly into the registration write path, not here.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, lastname, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(new.name)
        .bind(new.lastname)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Resolve a session: both the id and the currently stored token must
    /// match exactly. Since the record only ever holds the latest token,
    /// this invalidates every previously issued one.
    pub async fn find_by_credential_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND token = $2
            "#,
        ))
        .bind(user_id)
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Overwrite the session token fields. Last write wins.
    pub async fn store_session_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        token_exp: i64,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET token = $2, token_exp = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(token)
        .bind(token_exp)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn clear_session_token(db: &PgPool, user_id: Uuid) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token = NULL, token_exp = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::RecordNotFound);
        }
        Ok(())
    }

    /// Replace the password digest. The caller hashes the new plaintext
    /// first; no other write path touches this column.
    pub async fn update_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::RecordNotFound);
        }
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.role != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_and_token_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: Some("Ada".into()),
            lastname: None,
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: 0,
            image: None,
            token: Some("opaque-token".into()),
            token_exp: Some(1_700_000_000),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("opaque-token"));
        assert!(json.contains("ada@example.com"));
    }

    fn new_user(email: &str) -> NewUser<'_> {
        NewUser {
            name: None,
            lastname: None,
            email,
            password_hash: "$argon2id$fake-digest",
        }
    }

    #[sqlx::test]
    async fn new_token_invalidates_previous_one(db: PgPool) {
        let user = User::create(&db, new_user("a@x.com")).await.unwrap();
        User::store_session_token(&db, user.id, "token-one", 100)
            .await
            .unwrap();
        let user = User::store_session_token(&db, user.id, "token-two", 200)
            .await
            .unwrap();
        assert_eq!(user.token.as_deref(), Some("token-two"));
        assert_eq!(user.token_exp, Some(200));

        let current = User::find_by_credential_token(&db, user.id, "token-two")
            .await
            .unwrap();
        assert!(current.is_some());

        let stale = User::find_by_credential_token(&db, user.id, "token-one")
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[sqlx::test]
    async fn token_writes_leave_digest_untouched(db: PgPool) {
        let user = User::create(&db, new_user("a@x.com")).await.unwrap();
        let user = User::store_session_token(&db, user.id, "opaque", 100)
            .await
            .unwrap();
        assert_eq!(user.password_hash, "$argon2id$fake-digest");

        User::clear_session_token(&db, user.id).await.unwrap();
        let user = User::find_by_email(&db, "a@x.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "$argon2id$fake-digest");
        assert!(user.token.is_none());
        assert!(user.token_exp.is_none());
    }

    #[sqlx::test]
    async fn cleared_token_no_longer_resolves(db: PgPool) {
        let user = User::create(&db, new_user("a@x.com")).await.unwrap();
        let user = User::store_session_token(&db, user.id, "opaque", 100)
            .await
            .unwrap();
        User::clear_session_token(&db, user.id).await.unwrap();
        let resolved = User::find_by_credential_token(&db, user.id, "opaque")
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[sqlx::test]
    async fn duplicate_email_insert_is_a_unique_violation(db: PgPool) {
        User::create(&db, new_user("a@x.com")).await.unwrap();
        let err = User::create(&db, new_user("a@x.com")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[sqlx::test]
    async fn update_password_replaces_digest(db: PgPool) {
        let user = User::create(&db, new_user("a@x.com")).await.unwrap();
        User::update_password(&db, user.id, "$argon2id$new-digest")
            .await
            .unwrap();
        let user = User::find_by_email(&db, "a@x.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "$argon2id$new-digest");
    }

    #[test]
    fn role_zero_is_not_admin() {
        let mut user = User {
            id: Uuid::new_v4(),
            name: None,
            lastname: None,
            email: "x@example.com".into(),
            password_hash: String::new(),
            role: 0,
            image: None,
            token: None,
            token_exp: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(!user.is_admin());
        user.role = 1;
        assert!(user.is_admin());
    }
}
