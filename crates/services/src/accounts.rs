//! User accounts: registration, login, profile and password changes.

use std::sync::Arc;

use domains::{
    DomainError, DomainResult, NewUser, PasswordHasher, ProfileChanges, User, UserId,
    UserRepository, UserRole, ValidationErrors, USERNAME_MAX_LEN,
};
use serde::Deserialize;
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "Please enter a correct username and password.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone().unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

/// Letters, digits and `@.+-_`, like most account systems accept.
fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
}

fn normalize_email(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() {
        return None;
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Some(email.to_lowercase())
        }
        _ => {
            errors.push("email", "enter a valid e-mail address");
            None
        }
    }
}

fn check_new_password(first: &str, second: &str, errors: &mut ValidationErrors, field: &'static str) {
    if first.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            field,
            format!("the password must contain at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    if first != second {
        errors.push(field, "the two password fields didn't match");
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn register(&self, form: &RegistrationForm) -> DomainResult<User> {
        let mut errors = ValidationErrors::new();
        let username = form.username.trim();
        if !valid_username(username) {
            errors.push(
                "username",
                format!("required; {USERNAME_MAX_LEN} characters or fewer; letters, digits and @/./+/-/_ only"),
            );
        } else if self.users.find_by_username(username).await?.is_some() {
            errors.push("username", "a user with that username already exists");
        }
        let email = normalize_email(&form.email, &mut errors);
        check_new_password(&form.password1, &form.password2, &mut errors, "password2");
        errors.into_result()?;

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                password_hash: self.hasher.hash(&form.password1)?,
                role: UserRole::User,
            })
            .await
            .map_err(|e| match e {
                DomainError::Conflict(msg) => DomainError::invalid("email", msg),
                other => other,
            })?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Checks credentials; any mismatch yields the same validation error.
    pub async fn authenticate(&self, username: &str, password: &str) -> DomainResult<User> {
        let user = self.users.find_by_username(username.trim()).await?;
        match user {
            Some(user) if self.hasher.verify(password, &user.password_hash) => {
                info!(user_id = user.id, "user logged in");
                Ok(user)
            }
            _ => {
                warn!(username, "failed login attempt");
                let mut errors = ValidationErrors::new();
                errors.push_general(BAD_CREDENTIALS);
                Err(DomainError::Validation(errors))
            }
        }
    }

    pub async fn find(&self, id: UserId) -> DomainResult<Option<User>> {
        self.users.find(id).await
    }

    pub async fn update_profile(&self, user: &User, form: &ProfileForm) -> DomainResult<User> {
        let mut errors = ValidationErrors::new();
        let email = normalize_email(&form.email, &mut errors);
        errors.into_result()?;
        self.users
            .update_profile(
                user.id,
                ProfileChanges {
                    email,
                    first_name: form.first_name.trim().to_string(),
                    last_name: form.last_name.trim().to_string(),
                },
            )
            .await
            .map_err(|e| match e {
                DomainError::Conflict(msg) => DomainError::invalid("email", msg),
                other => other,
            })
    }

    pub async fn change_password(&self, user: &User, form: &PasswordChangeForm) -> DomainResult<()> {
        let mut errors = ValidationErrors::new();
        if !self.hasher.verify(&form.old_password, &user.password_hash) {
            errors.push("old_password", "your old password was entered incorrectly");
        }
        check_new_password(&form.new_password1, &form.new_password2, &mut errors, "new_password2");
        errors.into_result()?;

        let hash = self.hasher.hash(&form.new_password1)?;
        self.users.set_password_hash(user.id, &hash).await?;
        info!(user_id = user.id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockPasswordHasher, MockUserRepository};

    fn stored_user() -> User {
        User {
            id: 4,
            username: "alice".into(),
            email: Some("alice@example.com".into()),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash:secret-pass".into(),
            role: UserRole::User,
            date_joined: Utc::now(),
        }
    }

    /// Hasher that prefixes instead of hashing.
    fn plain_hasher() -> MockPasswordHasher {
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .returning(|p| Ok(format!("hash:{p}")));
        hasher
            .expect_verify()
            .returning(|p, h| h == format!("hash:{p}"));
        hasher
    }

    fn registration(username: &str, p1: &str, p2: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: "bob@example.com".into(),
            first_name: "Bob".into(),
            last_name: String::new(),
            password1: p1.into(),
            password2: p2.into(),
        }
    }

    #[test]
    fn username_rules() {
        assert!(valid_username("bob.smith+test@x"));
        assert!(!valid_username("bob smith"));
        assert!(!valid_username(""));
        assert!(!valid_username(&"a".repeat(USERNAME_MAX_LEN + 1)));
    }

    #[tokio::test]
    async fn register_hashes_password() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|u| u.password_hash == "hash:long-enough" && u.role == UserRole::User)
            .returning(|u| {
                Ok(User {
                    id: 9,
                    username: u.username,
                    email: u.email,
                    first_name: u.first_name,
                    last_name: u.last_name,
                    password_hash: u.password_hash,
                    role: u.role,
                    date_joined: Utc::now(),
                })
            });
        let service = AccountService::new(Arc::new(users), Arc::new(plain_hasher()));

        let user = service
            .register(&registration("bob", "long-enough", "long-enough"))
            .await
            .unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
    }

    #[tokio::test]
    async fn register_rejects_mismatch_and_taken_username() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(stored_user())));
        let service = AccountService::new(Arc::new(users), Arc::new(plain_hasher()));

        let err = service
            .register(&registration("alice", "long-enough", "different1"))
            .await
            .unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("password2").len(), 1);
    }

    #[tokio::test]
    async fn authenticate_accepts_right_password_only() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_username()
            .returning(|name| Ok((name == "alice").then(stored_user)));
        let service = AccountService::new(Arc::new(users), Arc::new(plain_hasher()));

        assert_eq!(service.authenticate("alice", "secret-pass").await.unwrap().id, 4);
        assert!(service.authenticate("alice", "wrong").await.is_err());
        assert!(service.authenticate("mallory", "secret-pass").await.is_err());
    }

    #[tokio::test]
    async fn change_password_requires_old_password() {
        let users = MockUserRepository::new();
        let service = AccountService::new(Arc::new(users), Arc::new(plain_hasher()));
        let form = PasswordChangeForm {
            old_password: "wrong".into(),
            new_password1: "new-password".into(),
            new_password2: "new-password".into(),
        };
        let err = service.change_password(&stored_user(), &form).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn change_password_stores_new_hash() {
        let mut users = MockUserRepository::new();
        users
            .expect_set_password_hash()
            .withf(|id, hash| *id == 4 && hash == "hash:new-password")
            .times(1)
            .returning(|_, _| Ok(()));
        let service = AccountService::new(Arc::new(users), Arc::new(plain_hasher()));
        let form = PasswordChangeForm {
            old_password: "secret-pass".into(),
            new_password1: "new-password".into(),
            new_password2: "new-password".into(),
        };
        service.change_password(&stored_user(), &form).await.unwrap();
    }
}
