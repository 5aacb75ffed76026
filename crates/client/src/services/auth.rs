//! Login, registration and profile management.

use std::sync::Arc;

use redthread_core::Email;
use secrecy::SecretString;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::ErrorSlot;
use crate::api::{Credentials, IdentityApi};
use crate::db::{Session, SessionRepository};
use crate::error::ClientError;
use crate::types::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    UpdateMeRequest, UserProfile,
};

/// Identity flows. A successful login installs the bearer token for every
/// authenticated client and persists the [`Session`].
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityApi>,
    credentials: Credentials,
    pool: SqlitePool,
    errors: ErrorSlot,
}

impl AuthService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityApi>,
        credentials: Credentials,
        pool: SqlitePool,
        errors: ErrorSlot,
    ) -> Self {
        Self {
            identity,
            credentials,
            pool,
            errors,
        }
    }

    /// Reinstall the persisted session's token, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the session cannot be read.
    pub async fn restore(&self) -> Result<Option<Session>, ClientError> {
        let session = SessionRepository::new(&self.pool).load().await?;
        if let Some(session) = &session {
            self.credentials.set(session.token.clone()).await;
            info!(email = %session.email, "Session restored");
        }
        Ok(session)
    }

    /// The persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the session cannot be read.
    pub async fn session(&self) -> Result<Option<Session>, ClientError> {
        Ok(SessionRepository::new(&self.pool).load().await?)
    }

    /// Create an account and log into it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed email and
    /// `ClientError::Api` if the identity service refuses the account.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let result: Result<Session, ClientError> = async {
            let email = parse_email(email)?;
            let req = RegisterRequest {
                full_name: full_name.trim().to_string(),
                email: email.into_inner(),
                password: password.to_string(),
            };
            let auth = self.identity.register(&req).await?;
            self.establish(auth).await
        }
        .await;
        self.errors.surface(result).await
    }

    /// Exchange credentials for a token, fetch the profile and persist the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the credentials are rejected or the
    /// profile cannot be fetched.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let result: Result<Session, ClientError> = async {
            let req = LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            };
            let auth = self.identity.login(&req).await?;
            self.establish(auth).await
        }
        .await;
        self.errors.surface(result).await
    }

    async fn establish(&self, auth: AuthResponse) -> Result<Session, ClientError> {
        self.credentials.set(auth.access_token.clone()).await;

        let profile = match self.identity.me().await {
            Ok(profile) => profile,
            Err(e) => {
                self.credentials.clear().await;
                return Err(e.into());
            }
        };

        let session = session_from(&profile, auth.access_token);
        if let Err(e) = SessionRepository::new(&self.pool).save(&session).await {
            self.credentials.clear().await;
            return Err(e.into());
        }
        info!(email = %session.email, role = %session.role, "Logged in");
        Ok(session)
    }

    /// Forget the token and the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the session row cannot be removed.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.credentials.clear().await;
        SessionRepository::new(&self.pool).clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Fetch the current profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` without a token and
    /// `ClientError::Api` if the service call fails.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let result: Result<UserProfile, ClientError> = async {
            self.require_token().await?;
            Ok(self.identity.me().await?)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Update name and email, then re-persist the session with the same token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out,
    /// `ClientError::Validation` for a malformed email and
    /// `ClientError::Api` if the update is refused.
    #[instrument(skip(self))]
    pub async fn update_me(&self, full_name: &str, email: &str) -> Result<Session, ClientError> {
        let result: Result<Session, ClientError> = async {
            let current = self.session().await?.ok_or(ClientError::NoSession)?;
            let email = parse_email(email)?;
            let req = UpdateMeRequest {
                full_name: full_name.trim().to_string(),
                email: email.into_inner(),
            };
            let profile = self.identity.update_me(&req).await?;
            let session = session_from(&profile, current.token);
            SessionRepository::new(&self.pool).save(&session).await?;
            Ok(session)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Change the password of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out,
    /// `ClientError::Validation` for an empty new password and
    /// `ClientError::Api` if the current password is rejected.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ClientError> {
        let result: Result<(), ClientError> = async {
            self.require_token().await?;
            if new.trim().is_empty() {
                return Err(ClientError::Validation(
                    "The new password cannot be empty.".to_string(),
                ));
            }
            let req = ChangePasswordRequest {
                current_password: current.to_string(),
                new_password: new.to_string(),
            };
            Ok(self.identity.change_password(&req).await?)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Reset a forgotten password. Any failure is reported as `false`.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(&self, identifier: &str, new_password: &str) -> bool {
        let req = ResetPasswordRequest {
            identifier: identifier.trim().to_string(),
            new_password: new_password.to_string(),
        };
        match self.identity.reset_password(&req).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Password reset failed");
                false
            }
        }
    }

    /// Read and clear the last surfaced error message.
    pub async fn take_error(&self) -> Option<String> {
        self.errors.take().await
    }

    async fn require_token(&self) -> Result<(), ClientError> {
        if self.credentials.is_set().await {
            Ok(())
        } else {
            Err(ClientError::NoSession)
        }
    }
}

fn parse_email(email: &str) -> Result<Email, ClientError> {
    Email::parse(email).map_err(|e| ClientError::Validation(format!("Invalid email: {e}")))
}

fn session_from(profile: &UserProfile, token: SecretString) -> Session {
    Session {
        email: profile.email.clone(),
        name: profile.full_name.clone(),
        user_id: profile.id,
        role: profile.primary_role(),
        token,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::Role;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::api::memory::InMemoryIdentity;
    use crate::db::test_pool;

    async fn setup() -> (AuthService, InMemoryIdentity, Credentials) {
        let credentials = Credentials::new();
        let identity = InMemoryIdentity::new(credentials.clone());
        identity.add_user(7, "Diego Rojas", "diego@redthread.cl", "Clave123!", "ROLE_DESPACHADOR");
        let auth = AuthService::new(
            Arc::new(identity.clone()),
            credentials.clone(),
            test_pool().await,
            ErrorSlot::new(),
        );
        (auth, identity, credentials)
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let (auth, _, credentials) = setup().await;

        let session = auth.login("diego@redthread.cl", "Clave123!").await.unwrap();
        assert_eq!(session.role, Role::Despachador);
        assert_eq!(session.name, "Diego Rojas");
        assert!(credentials.is_set().await);

        let stored = auth.session().await.unwrap().unwrap();
        assert_eq!(stored.token.expose_secret(), "token-7");
        assert!(auth.take_error().await.is_none());
    }

    #[tokio::test]
    async fn test_bad_login_surfaces_error_once() {
        let (auth, _, credentials) = setup().await;

        let err = auth.login("diego@redthread.cl", "nope").await.unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        assert!(!credentials.is_set().await);
        assert!(auth.take_error().await.is_some());
        assert!(auth.take_error().await.is_none());
        assert!(auth.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_without_saved_session_leaves_no_token() {
        let credentials = Credentials::new();
        let identity = InMemoryIdentity::new(credentials.clone());
        identity.add_user(7, "Diego Rojas", "diego@redthread.cl", "Clave123!", "ROLE_DESPACHADOR");
        let pool = test_pool().await;
        let auth = AuthService::new(
            Arc::new(identity),
            credentials.clone(),
            pool.clone(),
            ErrorSlot::new(),
        );

        pool.close().await;
        let err = auth.login("diego@redthread.cl", "Clave123!").await.unwrap_err();
        assert!(matches!(err, ClientError::Repository(_)));
        assert!(!credentials.is_set().await);
        assert!(auth.take_error().await.is_some());
    }

    #[tokio::test]
    async fn test_register_logs_in_as_shopper() {
        let (auth, _, _) = setup().await;

        let session = auth
            .register("Ana Soto", "ana@redthread.cl", "Secreta1!")
            .await
            .unwrap();
        assert_eq!(session.role, Role::Usuario);
        assert_eq!(auth.me().await.unwrap().full_name, "Ana Soto");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email() {
        let (auth, _, _) = setup().await;
        let err = auth.register("Ana", "not-an-email", "x").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(auth.take_error().await.unwrap().starts_with("Invalid email"));
    }

    #[tokio::test]
    async fn test_update_me_keeps_token() {
        let (auth, _, _) = setup().await;
        auth.login("diego@redthread.cl", "Clave123!").await.unwrap();

        let session = auth
            .update_me("Diego R.", "diego.r@redthread.cl")
            .await
            .unwrap();
        assert_eq!(session.email, "diego.r@redthread.cl");
        assert_eq!(session.token.expose_secret(), "token-7");

        let stored = auth.session().await.unwrap().unwrap();
        assert_eq!(stored.name, "Diego R.");
    }

    #[tokio::test]
    async fn test_logout_and_restore() {
        let (auth, _, credentials) = setup().await;
        auth.login("diego@redthread.cl", "Clave123!").await.unwrap();

        credentials.clear().await;
        let restored = auth.restore().await.unwrap().unwrap();
        assert_eq!(restored.user_id, redthread_core::UserId::new(7));
        assert!(credentials.is_set().await);

        auth.logout().await.unwrap();
        assert!(!credentials.is_set().await);
        assert!(auth.restore().await.unwrap().is_none());
        assert!(matches!(auth.me().await, Err(ClientError::NoSession)));
    }

    #[tokio::test]
    async fn test_change_and_reset_password() {
        let (auth, _, _) = setup().await;
        auth.login("diego@redthread.cl", "Clave123!").await.unwrap();

        assert!(auth.change_password("wrong", "Nueva123!").await.is_err());
        auth.change_password("Clave123!", "Nueva123!").await.unwrap();

        assert!(auth.reset_password("diego@redthread.cl", "Otra123!").await);
        assert!(!auth.reset_password("nadie@redthread.cl", "Otra123!").await);
        auth.login("diego@redthread.cl", "Otra123!").await.unwrap();
    }
}
