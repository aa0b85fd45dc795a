use crate::dtos::auth::{LoginRequest, LoginResponse};
use crate::services::database::TaskStore;
use crate::services::error::ServiceError;
use crate::services::jwt::JwtService;
use crate::services::metrics::record_login;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Hash checked against when the username is unknown.
static DUMMY_HASH: Lazy<Option<PasswordHashString>> = Lazy::new(|| {
    hash_password(&Password::new("tasklist-dummy-password".to_string())).ok()
});

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TaskStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn TaskStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    /// Check the credentials against the stored hash and issue a bearer token.
    ///
    /// The username must match byte for byte; store lookups may be
    /// case-insensitive depending on the column collation.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let password = Password::new(req.password);

        let user = self
            .store
            .find_user_by_username(&req.username)
            .await?
            .filter(|user| user.username == req.username);

        let Some(user) = user else {
            // Match the cost of a real verification.
            if let Some(dummy) = DUMMY_HASH.as_ref() {
                let _ = verify_password(&password, dummy);
            }
            warn!("Login attempt for unknown user");
            record_login("failure");
            return Err(ServiceError::InvalidCredentials);
        };

        let stored = PasswordHashString::new(user.password_hash.clone());
        let matches = verify_password(&password, &stored).unwrap_or_else(|e| {
            error!(user_id = user.id, error = %e, "Stored password hash is malformed");
            false
        });

        if !matches {
            warn!(user_id = user.id, "Login attempt with wrong password");
            record_login("failure");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.jwt.generate_access_token(&user.username)?;

        record_login("success");
        info!(user_id = user.id, "User logged in");

        Ok(LoginResponse {
            success: true,
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::MockTaskStore;

    fn service_with_user(username: &str, password: &str) -> AuthService {
        let store = Arc::new(MockTaskStore::new());
        let hash = hash_password(&Password::new(password.to_string())).unwrap();
        store.add_user(username, hash);

        let jwt = JwtService::new(&JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            expiry_minutes: 30,
        })
        .unwrap();
        AuthService::new(store, jwt)
    }

    fn request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn valid_credentials_issue_token() {
        let service = service_with_user("alice", "secret-pass");

        let response = service.login(request("alice", "secret-pass")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 1800);
        assert_ne!(response.token, "alice");

        let claims = service.jwt.validate_access_token(&response.token).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let service = service_with_user("alice", "secret-pass");
        assert!(matches!(
            service.login(request("alice", "nope")).await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let service = service_with_user("alice", "secret-pass");
        assert!(matches!(
            service.login(request("bob", "secret-pass")).await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn case_variant_username_is_rejected() {
        let service = service_with_user("tanaka", "secret-pass");

        for username in ["TANAKA", "Tanaka"] {
            assert!(matches!(
                service.login(request(username, "secret-pass")).await,
                Err(ServiceError::InvalidCredentials)
            ));
        }
        assert!(service.login(request("tanaka", "secret-pass")).await.is_ok());
    }

    #[test]
    fn dummy_hash_is_usable() {
        let dummy = DUMMY_HASH.as_ref().unwrap();
        assert!(!verify_password(&Password::new("secret-pass".to_string()), dummy).unwrap());
    }
}
