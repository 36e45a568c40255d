use std::sync::Arc;

use cakehouse_core::{parse_positive_id, StoreError};
use tracing::{debug, info, warn};

use crate::{
    error::{AuthError, Result},
    jwt::TokenIssuer,
    model::{
        present, LoginInput, NewUser, PublicUser, RegisterInput, Role, UpdateInput, UserChanges,
        VerifyInput,
    },
    password::{hash_password_blocking, verify_password_blocking},
    repository::UserRepository,
    verification::issue_code,
};

/// Account lifecycle: registration, verification, login and profile management.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
}

impl UserService {
    /// Create a new UserService
    ///
    /// # Arguments
    /// * `repo` - Account persistence
    /// * `tokens` - Signs session tokens issued on login
    pub fn new(repo: Arc<dyn UserRepository>, tokens: TokenIssuer) -> Self {
        Self { repo, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new, unverified account with a fresh verification code.
    ///
    /// Email uniqueness is left to the store's constraint; a clash comes back
    /// as [`AuthError::DuplicateEmail`].
    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser> {
        const MISSING: &str = "Name, email and password are required";

        let name = present(input.name).ok_or(AuthError::MissingFields(MISSING))?;
        let email = present(input.email).ok_or(AuthError::MissingFields(MISSING))?;
        let password = non_blank(input.password).ok_or(AuthError::MissingFields(MISSING))?;

        let password_hash = hash_password_blocking(password).await?;
        let verification_code = issue_code();

        let new_user = NewUser {
            name,
            email,
            phone: present(input.phone),
            address: present(input.address),
            password_hash,
            role: input.role.unwrap_or_default(),
            is_verified: false,
            verification_code: Some(verification_code.clone()),
        };

        let id = self.repo.insert(&new_user).await.map_err(email_conflict)?;

        // No mail transport yet; the code is only visible at debug level.
        debug!(user_id = id, code = %verification_code, "Verification code issued");
        info!(user_id = id, "User registered");

        let user = self.repo.find_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        Ok(user.to_public())
    }

    /// Check credentials and issue a session token.
    ///
    /// Verification state is not consulted here; only the password gates the token.
    pub async fn login(&self, input: LoginInput) -> Result<(String, PublicUser)> {
        const MISSING: &str = "Email and password are required";

        let email = present(input.email).ok_or(AuthError::MissingFields(MISSING))?;
        let password = non_blank(input.password).ok_or(AuthError::MissingFields(MISSING))?;

        let user = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password_blocking(password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::WrongPassword);
        }

        let token = self.tokens.issue(user.id, user.role)?;
        info!(user_id = user.id, verified = user.is_verified, "User logged in");

        Ok((token, user.to_public()))
    }

    /// Confirm an account with the code issued at registration.
    /// The code is consumed, so repeating a successful call fails with `CodeMismatch`.
    pub async fn verify(&self, input: VerifyInput) -> Result<()> {
        const MISSING: &str = "Email and code are required";

        let email = present(input.email).ok_or(AuthError::MissingFields(MISSING))?;
        let code = present(input.code).ok_or(AuthError::MissingFields(MISSING))?;

        let user = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.verification_code.as_deref() != Some(code.as_str()) {
            warn!(user_id = user.id, "Verification code mismatch");
            return Err(AuthError::CodeMismatch);
        }

        // A concurrent verify may have consumed the code since the read above.
        if self.repo.confirm_verification(user.id, &code).await? == 0 {
            warn!(user_id = user.id, "Verification code already consumed");
            return Err(AuthError::CodeMismatch);
        }

        info!(user_id = user.id, "User verified");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<PublicUser>> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn get(&self, raw_id: &str) -> Result<PublicUser> {
        let id = parse_user_id(raw_id)?;

        let user = self.repo.find_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        Ok(user.to_public())
    }

    /// Merge the provided fields into the account. A new password is re-hashed.
    pub async fn update(&self, raw_id: &str, input: UpdateInput) -> Result<()> {
        let id = parse_user_id(raw_id)?;

        let password_hash = match non_blank(input.password) {
            Some(password) => Some(hash_password_blocking(password).await?),
            None => None,
        };

        let changes = UserChanges {
            name: present(input.name),
            email: present(input.email),
            phone: present(input.phone),
            address: present(input.address),
            password_hash,
        };

        let affected = self.repo.update(id, &changes).await.map_err(email_conflict)?;
        if affected == 0 {
            return Err(AuthError::UserNotFound);
        }

        info!(user_id = id, "User updated");
        Ok(())
    }

    /// Physically remove the account.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = parse_user_id(raw_id)?;

        if self.repo.delete(id).await? == 0 {
            return Err(AuthError::UserNotFound);
        }

        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Resolve a bearer token to the current account.
    /// Also verifies that the role in the token matches the user's current role.
    pub async fn authenticate(&self, token: &str) -> Result<PublicUser> {
        let claims = self.tokens.verify(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;

        if user.role != claims.role {
            return Err(AuthError::InvalidToken(
                "User role has changed, please login again".to_string(),
            ));
        }

        Ok(user.to_public())
    }

    /// Create a verified admin unless one already exists.
    /// Returns the new account, or `None` when an admin was already present.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<PublicUser>> {
        if self.repo.count_by_role(Role::Admin).await? > 0 {
            return Ok(None);
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let admin = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            address: None,
            password_hash,
            role: Role::Admin,
            is_verified: true,
            verification_code: None,
        };

        let id = self.repo.insert(&admin).await.map_err(email_conflict)?;
        let user = self.repo.find_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        Ok(Some(user.to_public()))
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

fn parse_user_id(raw: &str) -> Result<i64> {
    parse_positive_id(raw).ok_or(AuthError::InvalidId)
}

/// Passwords keep their whitespace; only absence or blankness counts as missing.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The only unique column on `users` is `email`.
fn email_conflict(err: StoreError) -> AuthError {
    match err {
        StoreError::UniqueViolation(_) => AuthError::DuplicateEmail,
        other => AuthError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewUser, User};
    use crate::repository::SqlUserRepository;
    use async_trait::async_trait;
    use cakehouse_core::{run_migrations, Database, StoreResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn service() -> (UserService, SqlUserRepository) {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        run_migrations(&db).await.unwrap();
        let repo = SqlUserRepository::new(db);
        let service = UserService::new(Arc::new(repo.clone()), TokenIssuer::new("test_secret", 3600));
        (service, repo)
    }

    fn registration(email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: Some("A".to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }

    fn login(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_creates_unverified_user_with_code() {
        let (service, repo) = service().await;

        let user = service.register(registration("a@x.com", "p")).await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.role, Role::Customer);
        assert!(!user.is_verified);

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "p");
        assert_eq!(stored.verification_code.as_deref().map(str::len), Some(6));
    }

    #[tokio::test]
    async fn test_register_requires_name_email_password() {
        let (service, _) = service().await;

        let input = RegisterInput {
            name: Some("Elizabeth".to_string()),
            ..Default::default()
        };
        let err = service.register(input).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingFields(_)));

        let blank = registration("   ", "p");
        assert!(matches!(service.register(blank).await, Err(AuthError::MissingFields(_))));
    }

    #[tokio::test]
    async fn test_register_same_email_twice() {
        let (service, _) = service().await;

        service.register(registration("dup@x.com", "p")).await.unwrap();
        let err = service.register(registration("dup@x.com", "other")).await.unwrap_err();

        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_login_issues_token_for_stored_user() {
        let (service, _) = service().await;
        let user = service.register(registration("l@x.com", "secret")).await.unwrap();

        // Unverified accounts may log in
        let (token, logged_in) = service.login(login("l@x.com", "secret")).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = service.tokens().verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (service, _) = service().await;
        service.register(registration("l@x.com", "secret")).await.unwrap();

        assert!(matches!(
            service.login(login("l@x.com", "wrong")).await,
            Err(AuthError::WrongPassword)
        ));
        assert!(matches!(
            service.login(login("nobody@x.com", "secret")).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            service.login(LoginInput::default()).await,
            Err(AuthError::MissingFields(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_consumes_code() {
        let (service, repo) = service().await;
        let user = service.register(registration("v@x.com", "p")).await.unwrap();
        let code = repo.find_by_id(user.id).await.unwrap().unwrap().verification_code.unwrap();

        let wrong = VerifyInput {
            email: Some("v@x.com".to_string()),
            code: Some("not-it".to_string()),
        };
        assert!(matches!(service.verify(wrong).await, Err(AuthError::CodeMismatch)));

        let input = VerifyInput {
            email: Some("v@x.com".to_string()),
            code: Some(code),
        };
        service.verify(input.clone()).await.unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.verification_code.is_none());

        assert!(matches!(service.verify(input).await, Err(AuthError::CodeMismatch)));
    }

    #[tokio::test]
    async fn test_concurrent_verify_succeeds_once() {
        let (service, repo) = service().await;
        let user = service.register(registration("race@x.com", "p")).await.unwrap();
        let code = repo.find_by_id(user.id).await.unwrap().unwrap().verification_code.unwrap();

        let input = VerifyInput {
            email: Some("race@x.com".to_string()),
            code: Some(code),
        };
        let (first, second) = tokio::join!(service.verify(input.clone()), service.verify(input));

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(matches!(
            if first.is_err() { first } else { second },
            Err(AuthError::CodeMismatch)
        ));
    }

    #[tokio::test]
    async fn test_verify_input_errors() {
        let (service, _) = service().await;

        assert!(matches!(
            service.verify(VerifyInput::default()).await,
            Err(AuthError::MissingFields("Email and code are required"))
        ));

        let unknown = VerifyInput {
            email: Some("noone@x.com".to_string()),
            code: Some("123456".to_string()),
        };
        assert!(matches!(service.verify(unknown).await, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let (service, _) = service().await;
        let user = service.register(registration("a@x.com", "p")).await.unwrap();
        let id = user.id.to_string();

        let update = UpdateInput {
            name: Some("Updated Name".to_string()),
            ..Default::default()
        };
        service.update(&id, update).await.unwrap();

        let fetched = service.get(&id).await.unwrap();
        assert_eq!(fetched.name, "Updated Name");
        assert_eq!(fetched.email, "a@x.com");

        service.delete(&id).await.unwrap();
        assert!(matches!(service.get(&id).await, Err(AuthError::UserNotFound)));
        assert!(matches!(service.delete(&id).await, Err(AuthError::UserNotFound)));
        assert!(matches!(
            service.update(&id, UpdateInput::default()).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_password_is_rehashed() {
        let (service, _) = service().await;
        let user = service.register(registration("pw@x.com", "old")).await.unwrap();

        let update = UpdateInput {
            password: Some("new".to_string()),
            ..Default::default()
        };
        service.update(&user.id.to_string(), update).await.unwrap();

        assert!(matches!(
            service.login(login("pw@x.com", "old")).await,
            Err(AuthError::WrongPassword)
        ));
        assert!(service.login(login("pw@x.com", "new")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let (service, _) = service().await;
        service.register(registration("one@x.com", "p")).await.unwrap();
        let two = service.register(registration("two@x.com", "p")).await.unwrap();

        let update = UpdateInput {
            email: Some("one@x.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&two.id.to_string(), update).await,
            Err(AuthError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_checks_role() {
        let (service, repo) = service().await;
        let user = service.register(registration("r@x.com", "p")).await.unwrap();
        let (token, _) = service.login(login("r@x.com", "p")).await.unwrap();

        assert_eq!(service.authenticate(&token).await.unwrap().id, user.id);

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(user.id)
            .execute(repo_pool(&repo))
            .await
            .unwrap();
        assert!(matches!(service.authenticate(&token).await, Err(AuthError::InvalidToken(_))));

        service.delete(&user.id.to_string()).await.unwrap();
        assert!(matches!(service.authenticate(&token).await, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_only_once() {
        let (service, _) = service().await;

        let admin = service.ensure_admin("Admin", "admin@x.com", "pw").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(admin.is_verified);

        assert!(service.ensure_admin("Admin", "admin2@x.com", "pw").await.unwrap().is_none());
    }

    fn repo_pool(repo: &SqlUserRepository) -> &sqlx::SqlitePool {
        repo.database().pool()
    }

    /// Counts every store call; used to prove validation happens first.
    #[derive(Default)]
    struct CountingRepository {
        calls: AtomicUsize,
    }

    impl CountingRepository {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl UserRepository for CountingRepository {
        async fn find_all(&self) -> StoreResult<Vec<PublicUser>> {
            self.hit();
            Ok(Vec::new())
        }
        async fn find_by_id(&self, _id: i64) -> StoreResult<Option<User>> {
            self.hit();
            Ok(None)
        }
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
            self.hit();
            Ok(None)
        }
        async fn insert(&self, _user: &NewUser) -> StoreResult<i64> {
            self.hit();
            Ok(1)
        }
        async fn update(&self, _id: i64, _changes: &UserChanges) -> StoreResult<u64> {
            self.hit();
            Ok(0)
        }
        async fn delete(&self, _id: i64) -> StoreResult<u64> {
            self.hit();
            Ok(0)
        }
        async fn set_verified(&self, _id: i64) -> StoreResult<u64> {
            self.hit();
            Ok(0)
        }
        async fn clear_verification_code(&self, _id: i64) -> StoreResult<u64> {
            self.hit();
            Ok(0)
        }
        async fn confirm_verification(&self, _id: i64, _code: &str) -> StoreResult<u64> {
            self.hit();
            Ok(0)
        }
        async fn count_by_role(&self, _role: Role) -> StoreResult<i64> {
            self.hit();
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_invalid_id_never_reaches_store() {
        let repo = Arc::new(CountingRepository::default());
        let service = UserService::new(repo.clone(), TokenIssuer::new("s", 60));

        for raw in ["abc", "0", "-1", "1e3", ""] {
            assert!(matches!(service.get(raw).await, Err(AuthError::InvalidId)));
            assert!(matches!(
                service.update(raw, UpdateInput::default()).await,
                Err(AuthError::InvalidId)
            ));
            assert!(matches!(service.delete(raw).await, Err(AuthError::InvalidId)));
        }

        assert!(matches!(
            service.register(RegisterInput::default()).await,
            Err(AuthError::MissingFields(_))
        ));

        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }
}
