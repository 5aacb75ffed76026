//! The persisted login.

use redthread_core::{Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;

use super::RepositoryError;

/// A logged-in user: profile fields plus the bearer token.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Session {
    pub email: String,
    pub name: String,
    pub user_id: UserId,
    pub role: Role,
    pub token: SecretString,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Repository for the single session row.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored role is unknown.
    pub async fn load(&self) -> Result<Option<Session>, RepositoryError> {
        let row: Option<(String, String, UserId, String, String)> = sqlx::query_as(
            "SELECT email, name, user_id, role, token FROM session WHERE id = 1",
        )
        .fetch_optional(self.pool)
        .await?;

        row.map(|(email, name, user_id, role, token)| -> Result<Session, RepositoryError> {
            let role = role
                .parse::<Role>()
                .map_err(RepositoryError::DataCorruption)?;
            Ok(Session {
                email,
                name,
                user_id,
                role,
                token: SecretString::from(token),
            })
        })
        .transpose()
    }

    /// Store the session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO session (id, email, name, user_id, role, token)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                user_id = excluded.user_id,
                role = excluded.role,
                token = excluded.token
            ",
        )
        .bind(&session.email)
        .bind(&session.name)
        .bind(session.user_id)
        .bind(session.role.to_string())
        .bind(session.token.expose_secret())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Forget the stored session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM session").execute(self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn session(name: &str, token: &str) -> Session {
        Session {
            email: "ana@redthread.cl".to_string(),
            name: name.to_string(),
            user_id: UserId::new(3),
            role: Role::Despachador,
            token: SecretString::from(token),
        }
    }

    #[tokio::test]
    async fn test_save_overwrites_single_row() {
        let pool = test_pool().await;
        let repo = SessionRepository::new(&pool);
        assert!(repo.load().await.unwrap().is_none());

        repo.save(&session("Ana", "t1")).await.unwrap();
        repo.save(&session("Ana Soto", "t2")).await.unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ana Soto");
        assert_eq!(loaded.role, Role::Despachador);
        assert_eq!(loaded.token.expose_secret(), "t2");

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", session("Ana", "super-secret-jwt"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-jwt"));
    }
}
