//! User directory: registration, authentication, lookups and updates

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use users_auth::PasswordHasher;
use users_db::{DbError, NewUser, OptionalExt, User, UserField, UserStore};

use crate::config::DirectoryConfig;
use crate::error::{
    CoreError, EMAIL_TAKEN, INVALID_EMAIL, INVALID_IMAGE, PASSWORD_TOO_SHORT, USERNAME_BLANK,
    USER_EXISTS,
};
use crate::validation::{is_valid_email, is_valid_password, is_valid_url, normalize_username};

/// Password verified when the email is unknown, so both paths cost one hash check
const DUMMY_PASSWORD: &str = "dummy-password-never-matches";

/// Sparse profile patch; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// Directory of user accounts backed by a [`UserStore`]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    config: DirectoryConfig,
    dummy_hash: String,
}

impl UserDirectory {
    /// Create a new user directory
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: DirectoryConfig,
    ) -> Result<Self, CoreError> {
        info!(
            "Initializing user directory (store timeout: {:?})",
            config.store_timeout
        );

        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            config,
            dummy_hash,
        })
    }

    /// Register a new user
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, CoreError> {
        let username = normalize_username(username);

        let mut violations = Vec::new();
        if username.is_none() {
            violations.push(USERNAME_BLANK.to_string());
        }
        if !is_valid_email(email) {
            violations.push(INVALID_EMAIL.to_string());
        }
        if !is_valid_password(password) {
            violations.push(PASSWORD_TOO_SHORT.to_string());
        }
        let Some(username) = username.filter(|_| violations.is_empty()) else {
            return Err(CoreError::InvalidArgument(violations));
        };

        if self.username_taken(username).await? {
            return Err(CoreError::AlreadyExists(USER_EXISTS.to_string()));
        }
        if self.email_taken(email).await? {
            return Err(CoreError::AlreadyExists(EMAIL_TAKEN.to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        }
        .into_user();

        // A concurrent registration may have won since the checks above
        self.bounded("create_if_absent", self.store.create_if_absent(&user))
            .await?;

        metrics::counter!("users_registrations_total").increment(1);
        info!("Registered user: {}", user.username);
        Ok(user)
    }

    /// Check a password for the account with this email
    ///
    /// Unknown emails and wrong passwords both yield `Ok(false)`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<bool, CoreError> {
        let user = self
            .bounded("find_one_by_field", async {
                self.store
                    .find_one_by_field(UserField::Email, email)
                    .await
                    .optional()
            })
            .await?;

        let hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self.verify_password(password, hash).await?;
        let authenticated = user.is_some() && matches;

        if authenticated {
            metrics::counter!("users_logins_total", "outcome" => "success").increment(1);
            debug!("Password accepted for {}", email);
        } else {
            metrics::counter!("users_logins_total", "outcome" => "failure").increment(1);
            warn!("Failed login attempt for {}", email);
        }

        Ok(authenticated)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, CoreError> {
        debug!("Looking up user by username: {}", username);
        self.bounded("get", self.store.get(username)).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, CoreError> {
        debug!("Looking up user by email: {}", email);
        self.bounded(
            "find_one_by_field",
            self.store.find_one_by_field(UserField::Email, email),
        )
        .await
    }

    /// Apply a sparse update to the user stored under `username`
    pub async fn update_by_username(
        &self,
        username: &str,
        update: UserUpdate,
    ) -> Result<User, CoreError> {
        let mut user = self.get_by_username(username).await?;
        let key = user.username.clone();

        if let Some(new_username) = update.username.as_deref()
            && new_username != user.username
        {
            let new_username =
                normalize_username(new_username).ok_or_else(|| CoreError::invalid(USERNAME_BLANK))?;
            if new_username != user.username {
                if self.username_taken(new_username).await? {
                    return Err(CoreError::AlreadyExists(USER_EXISTS.to_string()));
                }
                user.username = new_username.to_string();
            }
        }

        if let Some(new_email) = update.email
            && new_email != user.email
        {
            if !is_valid_email(&new_email) {
                return Err(CoreError::invalid(INVALID_EMAIL));
            }
            if self.email_taken(&new_email).await? {
                return Err(CoreError::AlreadyExists(EMAIL_TAKEN.to_string()));
            }
            user.email = new_email;
        }

        if let Some(password) = update.password {
            if !is_valid_password(&password) {
                return Err(CoreError::invalid(PASSWORD_TOO_SHORT));
            }
            user.password_hash = self.hash_password(&password).await?;
        }

        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }

        if let Some(image) = update.image {
            if !is_valid_url(&image) {
                return Err(CoreError::invalid(INVALID_IMAGE));
            }
            user.image = Some(image);
        }

        user.updated_at = Utc::now();
        self.bounded("set", self.store.set(&key, &user)).await?;

        metrics::counter!("users_updates_total").increment(1);
        if key != user.username {
            info!("Updated user: {} (renamed to {})", key, user.username);
        } else {
            info!("Updated user: {}", user.username);
        }
        Ok(user)
    }

    async fn username_taken(&self, username: &str) -> Result<bool, CoreError> {
        let existing = self
            .bounded("get", async { self.store.get(username).await.optional() })
            .await?;
        Ok(existing.is_some())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, CoreError> {
        let existing = self
            .bounded("find_one_by_field", async {
                self.store
                    .find_one_by_field(UserField::Email, email)
                    .await
                    .optional()
            })
            .await?;
        Ok(existing.is_some())
    }

    /// Run a store call under the configured timeout
    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if !matches!(e, DbError::NotFound(_) | DbError::Duplicate(_)) {
                    error!("Store {} failed: {}", op, e);
                }
                Err(e.into())
            }
            Err(_) => {
                error!(
                    "Store {} timed out after {:?}",
                    op, self.config.store_timeout
                );
                Err(CoreError::Internal(format!(
                    "store {} timed out after {:?}",
                    op, self.config.store_timeout
                )))
            }
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, CoreError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| CoreError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(CoreError::from)
    }

    async fn verify_password(&self, password: &str, hash: String) -> Result<bool, CoreError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| CoreError::Internal(format!("verification task failed: {}", e)))?
            .map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, USER_NOT_FOUND};
    use async_trait::async_trait;
    use std::time::Duration;
    use users_auth::Argon2Hasher;
    use users_db::MemoryStore;

    fn hasher() -> Arc<dyn PasswordHasher> {
        Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap())
    }

    fn directory_with(store: Arc<dyn UserStore>) -> UserDirectory {
        UserDirectory::new(store, hasher(), DirectoryConfig::default()).unwrap()
    }

    fn directory() -> UserDirectory {
        directory_with(Arc::new(MemoryStore::new()))
    }

    async fn register_jake(dir: &UserDirectory) -> User {
        dir.register("jake", "jake@jake.jake", "jakejake").await.unwrap()
    }

    #[tokio::test]
    async fn test_register() {
        let dir = directory();
        let user = register_jake(&dir).await;

        assert_eq!(user.username, "jake");
        assert_eq!(user.email, "jake@jake.jake");
        assert!(user.bio.is_none());
        assert!(user.image.is_none());
        assert_ne!(user.password_hash, "jakejake");

        let stored = dir.get_by_username("jake").await.unwrap();
        assert_eq!(stored.id, user.id);
        assert_eq!(stored.email, "jake@jake.jake");
        assert!(stored.bio.is_none());
        assert!(stored.image.is_none());
        assert_eq!(stored.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn test_register_trims_username() {
        let dir = directory();
        let user = dir.register("  jake ", "jake@jake.jake", "jakejake").await.unwrap();
        assert_eq!(user.username, "jake");
    }

    #[tokio::test]
    async fn test_register_reports_all_violations_in_order() {
        let dir = directory();
        let err = dir.register("   ", "not-an-email", "short").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.messages(),
            vec![USERNAME_BLANK, INVALID_EMAIL, PASSWORD_TOO_SHORT]
        );
    }

    #[tokio::test]
    async fn test_register_single_violation() {
        let dir = directory();

        let err = dir.register("jake", "jake@jake.jake", "1234567").await.unwrap_err();
        assert_eq!(err.messages(), vec![PASSWORD_TOO_SHORT]);

        let err = dir.register("jake", "jake", "jakejake").await.unwrap_err();
        assert_eq!(err.messages(), vec![INVALID_EMAIL]);
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let dir = directory();
        register_jake(&dir).await;

        let err = dir.register("jake", "other@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.messages(), vec![USER_EXISTS]);

        let err = dir.register("jane", "jake@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.messages(), vec![EMAIL_TAKEN]);
    }

    #[tokio::test]
    async fn test_concurrent_register_single_winner() {
        let dir = Arc::new(directory());

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    dir.register("jake", &format!("jake{}@jake.jake", i), "jakejake")
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let dir = directory();
        register_jake(&dir).await;

        assert!(dir.authenticate("jake@jake.jake", "jakejake").await.unwrap());
        assert!(!dir.authenticate("jake@jake.jake", "wrong-password").await.unwrap());
        assert!(!dir.authenticate("nobody@jake.jake", "jakejake").await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_corrupt_hash_is_internal() {
        let store = Arc::new(MemoryStore::new());
        let user = NewUser {
            username: "jake".to_string(),
            email: "jake@jake.jake".to_string(),
            password_hash: "not-a-phc-string".to_string(),
        }
        .into_user();
        store.create_if_absent(&user).await.unwrap();

        let dir = directory_with(store);
        let err = dir.authenticate("jake@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_lookups() {
        let dir = directory();
        register_jake(&dir).await;

        assert_eq!(dir.get_by_email("jake@jake.jake").await.unwrap().username, "jake");

        let err = dir.get_by_username("jane").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.messages(), vec![USER_NOT_FOUND]);

        let err = dir.get_by_email("jane@jane.jane").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_profile_fields() {
        let dir = directory();
        let before = register_jake(&dir).await;

        let updated = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    bio: Some("I like to skateboard".to_string()),
                    image: Some("https://i.stack.imgur.com/xHWG8.jpg".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.bio.as_deref(), Some("I like to skateboard"));
        assert_eq!(updated.image.as_deref(), Some("https://i.stack.imgur.com/xHWG8.jpg"));
        assert_eq!(updated.email, before.email);
        assert_eq!(updated.password_hash, before.password_hash);
        assert!(updated.updated_at >= before.updated_at);
        assert!(dir.authenticate("jake@jake.jake", "jakejake").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_empty_bio_is_kept() {
        let dir = directory();
        register_jake(&dir).await;

        let updated = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    bio: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_update_empty_patch_changes_nothing() {
        let dir = directory();
        let before = register_jake(&dir).await;

        let after = dir
            .update_by_username("jake", UserUpdate::default())
            .await
            .unwrap();
        assert_eq!(after.username, before.username);
        assert_eq!(after.email, before.email);
        assert_eq!(after.bio, before.bio);
        assert_eq!(after.image, before.image);
    }

    #[tokio::test]
    async fn test_update_rename_moves_record() {
        let dir = directory();
        let before = register_jake(&dir).await;

        let renamed = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    username: Some("jacob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.username, "jacob");
        assert_eq!(renamed.id, before.id);
        assert_eq!(
            dir.get_by_username("jake").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(dir.get_by_username("jacob").await.unwrap().id, before.id);
        assert!(dir.authenticate("jake@jake.jake", "jakejake").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_rename_to_same_name_is_noop() {
        let dir = directory();
        register_jake(&dir).await;

        let user = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    username: Some("jake".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(user.username, "jake");
    }

    #[tokio::test]
    async fn test_update_rename_conflicts() {
        let dir = directory();
        register_jake(&dir).await;
        dir.register("jane", "jane@jane.jane", "janejane").await.unwrap();

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    username: Some("jane".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![USER_EXISTS]);

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    username: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![USERNAME_BLANK]);
    }

    #[tokio::test]
    async fn test_update_email() {
        let dir = directory();
        register_jake(&dir).await;
        dir.register("jane", "jane@jane.jane", "janejane").await.unwrap();

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    email: Some("jane@jane.jane".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![EMAIL_TAKEN]);

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    email: Some("bogus".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![INVALID_EMAIL]);

        dir.update_by_username(
            "jake",
            UserUpdate {
                email: Some("jacob@jake.jake".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // The old email is free again
        dir.register("other", "jake@jake.jake", "otherother").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_password() {
        let dir = directory();
        register_jake(&dir).await;

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    password: Some("short".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![PASSWORD_TOO_SHORT]);

        dir.update_by_username(
            "jake",
            UserUpdate {
                password: Some("newpassword".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(!dir.authenticate("jake@jake.jake", "jakejake").await.unwrap());
        assert!(dir.authenticate("jake@jake.jake", "newpassword").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_invalid_image() {
        let dir = directory();
        register_jake(&dir).await;

        let err = dir
            .update_by_username(
                "jake",
                UserUpdate {
                    image: Some("not a url".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec![INVALID_IMAGE]);
        assert!(dir.get_by_username("jake").await.unwrap().image.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let dir = directory();
        let err = dir
            .update_by_username("nobody", UserUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    /// Store whose lookups never see existing records, as if another
    /// writer got in between the existence check and the create
    struct RacingStore {
        conflict: UserField,
    }

    #[async_trait]
    impl UserStore for RacingStore {
        async fn create_if_absent(&self, _user: &User) -> Result<(), DbError> {
            Err(DbError::Duplicate(self.conflict))
        }

        async fn get(&self, username: &str) -> Result<User, DbError> {
            Err(DbError::NotFound(username.to_string()))
        }

        async fn find_one_by_field(&self, _field: UserField, value: &str) -> Result<User, DbError> {
            Err(DbError::NotFound(value.to_string()))
        }

        async fn set(&self, _key: &str, _user: &User) -> Result<(), DbError> {
            Err(DbError::Duplicate(self.conflict))
        }
    }

    #[tokio::test]
    async fn test_store_duplicate_maps_to_already_exists() {
        let dir = directory_with(Arc::new(RacingStore {
            conflict: UserField::Email,
        }));
        let err = dir.register("jake", "jake@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.messages(), vec![EMAIL_TAKEN]);

        let dir = directory_with(Arc::new(RacingStore {
            conflict: UserField::Username,
        }));
        let err = dir.register("jake", "jake@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.messages(), vec![USER_EXISTS]);
    }

    /// Store that never answers
    struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn create_if_absent(&self, _user: &User) -> Result<(), DbError> {
            std::future::pending().await
        }

        async fn get(&self, _username: &str) -> Result<User, DbError> {
            std::future::pending().await
        }

        async fn find_one_by_field(&self, _field: UserField, _value: &str) -> Result<User, DbError> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _user: &User) -> Result<(), DbError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_store_timeout_is_internal() {
        let dir = UserDirectory::new(
            Arc::new(StalledStore),
            hasher(),
            DirectoryConfig {
                store_timeout: Duration::from_millis(20),
            },
        )
        .unwrap();

        let err = dir.get_by_username("jake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = dir.register("jake", "jake@jake.jake", "jakejake").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
