//! Registration and email-confirmation flows.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{NewUserRequest, User, UserPayload};
use repository::{AddressesRepository, NewUser, RepositoryError, UsersRepository};
use tracing::{info, instrument};

use crate::{ServiceError, password, validation};

/// Subject of the confirmation email.
pub const EMAIL_CONFIRM_SUBJECT: &str = "CleanPro: подтверждение электронной почты";

/// Body template of the confirmation email; takes username and the new
/// temporary password.
pub const EMAIL_CONFIRM_TEXT: &str = "Здравствуйте, {username}!\n\n\
    Ваша электронная почта подтверждена. Временный пароль для входа: {password}\n\
    Пожалуйста, смените его после первого входа.";

/// Outgoing-mail collaborator. Real SMTP delivery stays outside the core:
/// the production wiring decides how a message actually leaves the system.
/// The sender address comes from configuration and belongs to the
/// implementation, not to the calling flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Mailer that records the dispatch in the log instead of sending.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    /// `from` is the configured sender address (`email_from`).
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        info!("Email from {} to {}: {}", self.from, to, subject);
        Ok(())
    }
}

/// Trait describing user-facing account operations.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Registers a user from an explicit payload. The response carries no
    /// body, so nothing is returned beyond success.
    ///
    /// # Errors
    /// Returns [`ServiceError::Validation`] for invalid fields or an already
    /// taken email.
    async fn register(&self, req: &NewUserRequest) -> Result<(), ServiceError>;

    /// Confirms an email address: generates a fresh temporary credential,
    /// stores its hash and hands the plain value to the mailer.
    async fn confirm_email(&self, email: &str) -> Result<(), ServiceError>;

    /// Personal data of one user.
    async fn get_user(&self, id: i32) -> Result<User, ServiceError>;
}

/// Async implementation of [`UserService`].
pub struct UserServiceImpl<R1, R2, M> {
    db_pool: Pool,
    users_repo: R1,
    addresses_repo: R2,
    mailer: M,
    phone_region: String,
}

impl<R1, R2, M> UserServiceImpl<R1, R2, M>
where
    R1: UsersRepository + Send + Sync,
    R2: AddressesRepository + Send + Sync,
    M: Mailer,
{
    pub fn new(
        db_pool: Pool,
        users_repo: R1,
        addresses_repo: R2,
        mailer: M,
        phone_region: String,
    ) -> Self {
        Self {
            db_pool,
            users_repo,
            addresses_repo,
            mailer,
            phone_region,
        }
    }
}

#[async_trait]
impl<R1, R2, M> UserService for UserServiceImpl<R1, R2, M>
where
    R1: UsersRepository + Send + Sync,
    R2: AddressesRepository + Send + Sync,
    M: Mailer,
{
    /// Validates the payload and creates the user, resolving the optional
    /// address in the same transaction so a failed insert leaves no new
    /// address row behind.
    #[instrument(skip(self, req))]
    async fn register(&self, req: &NewUserRequest) -> Result<(), ServiceError> {
        let contact = UserPayload {
            username: req.username.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
        };
        validation::validate_user(&contact, &self.phone_region)?;
        if req.password.len() < 8 {
            return Err(ServiceError::Validation(
                "Пароль должен содержать не менее 8 символов.".to_string(),
            ));
        }
        if let Some(address) = &req.address {
            validation::validate_address(address)?;
        }

        let password_hash = password::hash(&req.password)?;

        let mut client = self.db_pool.get().await.map_err(ServiceError::from)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let address_id = match &req.address {
            Some(payload) => {
                let address = match self.addresses_repo.find_exact_tx(&tx, payload).await? {
                    Some(existing) => existing,
                    None => self.addresses_repo.insert_tx(&tx, payload).await?,
                };
                Some(address.id)
            }
            None => None,
        };

        let new_user = NewUser {
            username: req.username.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            password_hash,
            address_id,
        };
        match self.users_repo.insert_tx(&tx, &new_user).await {
            Ok(_) => {}
            Err(RepositoryError::Duplicate) => {
                return Err(ServiceError::Validation(
                    "Пользователь с таким email уже существует.".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn confirm_email(&self, email: &str) -> Result<(), ServiceError> {
        if !validation::email_is_valid(email) {
            return Err(ServiceError::Validation(
                "Отсутствуют или указаны невалидные данные: email.".to_string(),
            ));
        }
        let user = self.users_repo.get_by_email(email).await?;

        let temporary = password::generate();
        let hashed = password::hash(&temporary)?;
        self.users_repo.set_password(user.id, &hashed).await?;

        let body = confirmation_body(&user.username, &temporary);
        self.mailer
            .send(&user.email, EMAIL_CONFIRM_SUBJECT, &body)
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Mail dispatch failed: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: i32) -> Result<User, ServiceError> {
        Ok(self.users_repo.get_by_id(id).await?)
    }
}

/// Renders the confirmation email body from the template.
fn confirmation_body(username: &str, password: &str) -> String {
    EMAIL_CONFIRM_TEXT
        .replace("{username}", username)
        .replace("{password}", password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mailer_carries_configured_sender() {
        let mailer = LogMailer::new("noreply@cleanpro.local".to_string());
        assert_eq!(mailer.from, "noreply@cleanpro.local");
    }

    #[test]
    fn test_confirmation_body_substitutes_placeholders() {
        let body = confirmation_body("Мария", "s3cretPass");
        assert!(body.contains("Мария"));
        assert!(body.contains("s3cretPass"));
        assert!(!body.contains("{username}"));
        assert!(!body.contains("{password}"));
    }
}
