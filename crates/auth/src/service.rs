use crate::{
    error::{AuthError, Result},
    jwt::{generate_token, validate_token},
    model::{normalize_email, AccountUpdate, NewAccount, Session},
    password::{hash_password_blocking, verify_against_dummy_blocking, verify_password_blocking},
};
use bookshelf_core::{PublicUser, User, UserId};
use storage::{users, Database, StoreError};

/// Accounts and sessions on top of the database
pub struct UserService {
    db: Database,
    jwt_secret: String,
    token_expiry_seconds: i64,
}

impl UserService {
    /// Create a new UserService
    ///
    /// # Arguments
    /// * `db` - Shared database handle
    /// * `jwt_secret` - Secret key for token signing
    /// * `token_expiry_seconds` - Token lifetime in seconds
    pub fn new(db: Database, jwt_secret: String, token_expiry_seconds: i64) -> Self {
        Self {
            db,
            jwt_secret,
            token_expiry_seconds,
        }
    }

    /// Register a new user and open a session for them.
    ///
    /// Fails with [`AuthError::EmailTaken`] if the email is registered.
    pub async fn signup(&self, account: NewAccount) -> Result<Session> {
        let name = required("name", &account.name)?.to_string();
        let email = normalize_email(required("email", &account.email)?);
        required("password", &account.password)?;

        // Cheap early exit before paying for the hash; the unique index
        // catches a concurrent signup.
        {
            let mut conn = self.db.acquire().await?;
            if users::email_taken(&mut conn, &email, None).await? {
                return Err(AuthError::EmailTaken);
            }
        }

        let password_hash = hash_password_blocking(account.password).await?;
        let user = User::new(name, email, password_hash, account.role);

        let mut conn = self.db.acquire().await?;
        users::insert(&mut conn, &user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user signed up");
        self.issue_session(&user)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password both yield
    /// [`AuthError::InvalidCredentials`] after the same amount of work.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let user = {
            let mut conn = self.db.acquire().await?;
            users::find_by_email(&mut conn, &email).await?
        };

        let Some(user) = user else {
            verify_against_dummy_blocking(password.to_string()).await;
            tracing::debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(&user)
    }

    /// Resolve a bearer token to the live user it was issued to
    pub async fn validate(&self, token: &str) -> Result<User> {
        let claims = validate_token(token, &self.jwt_secret)?;
        let user_id = claims.user_id()?;

        self.find_user(&user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    pub async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        let mut conn = self.db.acquire().await?;
        Ok(users::find(&mut conn, id).await?)
    }

    /// Apply a partial update to `target` on behalf of `actor`.
    ///
    /// The target must exist, and only its owner may change it.
    pub async fn update(
        &self,
        actor: &UserId,
        target: &UserId,
        changes: AccountUpdate,
    ) -> Result<PublicUser> {
        let name = changes
            .name
            .as_deref()
            .map(|name| required("name", name).map(str::to_string))
            .transpose()?;
        let email = changes
            .email
            .as_deref()
            .map(|email| required("email", email).map(normalize_email))
            .transpose()?;
        let password_hash = match changes.password {
            Some(password) => {
                required("password", &password)?;
                Some(hash_password_blocking(password).await?)
            }
            None => None,
        };

        let mut tx = self.db.begin().await?;

        let mut user = users::find(&mut tx, target)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.id != *actor {
            return Err(AuthError::Forbidden(
                "Not authorized to update this user".to_string(),
            ));
        }

        if let Some(email) = &email {
            if users::email_taken(&mut tx, email, Some(target)).await? {
                return Err(AuthError::EmailTaken);
            }
        }

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash;
        }
        user.touch();

        users::update(&mut tx, &user).await?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(user_id = %user.id, "user updated");
        Ok(user.to_public())
    }

    /// Self-service name/email change, as exposed on the reader profile.
    pub async fn update_profile(
        &self,
        actor: &UserId,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<PublicUser> {
        let changes = AccountUpdate {
            name,
            email,
            password: None,
        };
        self.update(actor, actor, changes).await
    }

    /// Remove `target` on behalf of `actor`. Books they wrote stay in the
    /// catalogue.
    pub async fn delete(&self, actor: &UserId, target: &UserId) -> Result<()> {
        let mut tx = self.db.begin().await?;

        if !users::exists(&mut tx, target).await? {
            return Err(AuthError::UserNotFound);
        }
        if target != actor {
            return Err(AuthError::Forbidden(
                "Not authorized to delete this user".to_string(),
            ));
        }

        users::delete(&mut tx, target).await?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(user_id = %target, "user deleted");
        Ok(())
    }

    fn issue_session(&self, user: &User) -> Result<Session> {
        let token = generate_token(&user.id, &self.jwt_secret, self.token_expiry_seconds)?;
        Ok(Session {
            user: user.to_public(),
            token,
        })
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::Role;

    async fn service() -> UserService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        UserService::new(db, "test_secret".to_string(), 3600)
    }

    fn account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let service = service().await;

        let session = service.signup(account("Test@Example.com", Role::Reader)).await.unwrap();
        assert_eq!(session.user.email, "test@example.com");
        assert_eq!(session.user.role, Role::Reader);
        assert!(!session.token.is_empty());

        let logged_in = service.login("test@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.user.id, session.user.id);

        let validated = service.validate(&logged_in.token).await.unwrap();
        assert_eq!(validated.id, session.user.id);
        assert_ne!(validated.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = service().await;
        service.signup(account("dup@example.com", Role::Reader)).await.unwrap();

        let mut again = account("DUP@example.com", Role::Author);
        again.name = "Someone Else".to_string();
        let err = service.signup(again).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_login_failures_look_identical() {
        let service = service().await;
        service.signup(account("a@example.com", Role::Reader)).await.unwrap();

        let wrong_password = service.login("a@example.com", "nope").await.unwrap_err();
        let unknown_email = service.login("b@example.com", "password123").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_token_of_deleted_user_is_rejected() {
        let service = service().await;
        let session = service.signup(account("gone@example.com", Role::Reader)).await.unwrap();

        service.delete(&session.user.id, &session.user.id).await.unwrap();

        let err = service.validate(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_update_is_self_service_with_explicit_presence() {
        let service = service().await;
        let me = service.signup(account("me@example.com", Role::Reader)).await.unwrap().user;
        let other = service.signup(account("other@example.com", Role::Reader)).await.unwrap().user;

        let err = service
            .update(&other.id, &me.id, AccountUpdate { name: Some("X".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));

        let updated = service
            .update(&me.id, &me.id, AccountUpdate { name: Some("Renamed".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "me@example.com");

        let err = service
            .update(&me.id, &me.id, AccountUpdate { email: Some("".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        let err = service
            .update(&me.id, &me.id, AccountUpdate { email: Some("other@example.com".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_password_change_takes_effect() {
        let service = service().await;
        let me = service.signup(account("pw@example.com", Role::Author)).await.unwrap().user;

        service
            .update(&me.id, &me.id, AccountUpdate { password: Some("fresh-secret".into()), ..Default::default() })
            .await
            .unwrap();

        assert!(service.login("pw@example.com", "password123").await.is_err());
        assert!(service.login("pw@example.com", "fresh-secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let service = service().await;
        let me = service.signup(account("me@example.com", Role::Reader)).await.unwrap().user;

        let err = service.delete(&me.id, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
