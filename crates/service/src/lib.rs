//! Business logic layer for the cleanpro booking backend.
//!
//! This module defines the [`OrderService`] trait and its async implementation
//! [`OrderServiceImpl`]. The service coordinates order creation across
//! addresses, users, orders and line items, providing transactional
//! guarantees, payload validation and repository abstraction. Registration,
//! catalog and rating flows live in their own submodules.
//!
//! # Features
//! - Atomic creation of an order together with its resolved user, address
//!   and line items in a single transaction.
//! - Aggregated payload validation before any write.
//! - Dependency injection for testability and loose coupling.
//! - Async-first API suitable for scalable web applications.
//! - Well-typed error handling via [`ServiceError`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use deadpool_postgres::{Pool, PoolError};
use model::{Address, AddressPayload, NewOrderRequest, Order, OrderStatus, User, UserPayload};
use repository::{
    AddressesRepository, NewOrder, NewUser, OrderedServicesRepository, OrdersRepository,
    RepositoryError, ServicesRepository, UsersRepository,
};
use thiserror::Error;
use tokio_postgres::Transaction;
use tracing::instrument;

pub mod catalog;
pub mod password;
pub mod rating;
pub mod users;
pub mod validation;

/// The main error type for all service-layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The payload failed validation; the message lists every failing field.
    #[error("{0}")]
    Validation(String),
    /// An identical order already exists; nothing was written.
    #[error("Заказ уже был создан.")]
    DuplicateOrder,
    /// The referenced record does not exist.
    #[error("Not found")]
    NotFound,
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(RepositoryError),
    /// Failed to obtain a database connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::Duplicate => ServiceError::DuplicateOrder,
            other => ServiceError::Db(other),
        }
    }
}

/// Trait describing business operations for order management.
///
/// Implementations are expected to guarantee atomicity of order creation:
/// a failed creation leaves no new user, address, order or line-item rows.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Validates the request and atomically creates the order together with
    /// its resolved user, address and line items.
    ///
    /// The result is deliberately opaque: a successful call confirms creation
    /// without echoing order details back to the caller.
    ///
    /// # Errors
    /// Returns [`ServiceError::Validation`] if any payload field fails
    /// validation, [`ServiceError::DuplicateOrder`] if an identical
    /// submission already exists, or a database error.
    async fn create_order(&self, req: &NewOrderRequest) -> Result<(), ServiceError>;

    /// Retrieves the full order by id, including its line items.
    async fn get_order(&self, id: i32) -> Result<Order, ServiceError>;

    /// Lists a user's orders, newest first, including line items.
    async fn list_user_orders(&self, user_id: i32) -> Result<Vec<Order>, ServiceError>;

    /// Marks the order as paid. Idempotent.
    async fn pay(&self, id: i32) -> Result<(), ServiceError>;

    /// Cancels the order, optionally recording a cancellation comment.
    /// Re-applying with a different comment updates only the comment.
    async fn cancel(&self, id: i32, comment: Option<String>) -> Result<(), ServiceError>;

    /// Sets the order status. Any status is settable from any other.
    async fn set_status(&self, id: i32, status: OrderStatus) -> Result<(), ServiceError>;

    /// Replaces the free-text comment on the order.
    async fn set_comment(&self, id: i32, comment: String) -> Result<(), ServiceError>;

    /// Replaces the cleaning date and/or time; an absent part is untouched.
    async fn reschedule(
        &self,
        id: i32,
        cleaning_date: Option<NaiveDate>,
        cleaning_time: Option<NaiveTime>,
    ) -> Result<(), ServiceError>;
}

/// Async implementation of [`OrderService`] using the repository pattern.
///
/// Wires together the concrete repositories and a Postgres connection pool
/// so that order creation runs as one all-or-nothing transaction.
pub struct OrderServiceImpl<R1, R2, R3, R4, R5> {
    db_pool: Pool,
    orders_repo: R1,
    addresses_repo: R2,
    users_repo: R3,
    services_repo: R4,
    ordered_repo: R5,
    phone_region: String,
}

impl<R1, R2, R3, R4, R5> OrderServiceImpl<R1, R2, R3, R4, R5>
where
    R1: OrdersRepository + Send + Sync,
    R2: AddressesRepository + Send + Sync,
    R3: UsersRepository + Send + Sync,
    R4: ServicesRepository + Send + Sync,
    R5: OrderedServicesRepository + Send + Sync,
{
    /// Constructs a new [`OrderServiceImpl`] from the provided dependencies.
    ///
    /// `phone_region` is the default region hint for phone validation
    /// ("RU" in production).
    pub fn new(
        db_pool: Pool,
        orders_repo: R1,
        addresses_repo: R2,
        users_repo: R3,
        services_repo: R4,
        ordered_repo: R5,
        phone_region: String,
    ) -> Self {
        Self {
            db_pool,
            orders_repo,
            addresses_repo,
            users_repo,
            services_repo,
            ordered_repo,
            phone_region,
        }
    }

    /// Finds an address matching the payload exactly, or inserts a new row.
    /// Runs inside the caller's transaction: a later rollback also discards
    /// a freshly created address.
    async fn resolve_address(
        &self,
        tx: &Transaction<'_>,
        payload: &AddressPayload,
    ) -> Result<Address, ServiceError> {
        if let Some(existing) = self.addresses_repo.find_exact_tx(tx, payload).await? {
            return Ok(existing);
        }
        Ok(self.addresses_repo.insert_tx(tx, payload).await?)
    }

    /// Finds a user by email or creates one with a generated password.
    ///
    /// For an existing user, empty phone/username fields are backfilled from
    /// the payload and the resolved address is attached only if the user had
    /// none; populated fields are never overwritten. "Already exists" is the
    /// normal reuse path, never an error.
    async fn resolve_user(
        &self,
        tx: &Transaction<'_>,
        payload: &UserPayload,
        address: &Address,
    ) -> Result<User, ServiceError> {
        match self.users_repo.get_by_email_tx(tx, &payload.email).await? {
            Some(mut user) => {
                apply_backfill(&mut user, payload, address);
                self.users_repo.update_contact_tx(tx, &user).await?;
                Ok(user)
            }
            None => {
                let password_hash = password::hash(&password::generate())?;
                let new_user = NewUser {
                    username: payload.username.clone(),
                    email: payload.email.clone(),
                    phone: payload.phone.clone(),
                    password_hash,
                    address_id: Some(address.id),
                };
                match self.users_repo.insert_tx(tx, &new_user).await {
                    Ok(user) => Ok(user),
                    Err(err) => Err(map_user_insert_err(err, &payload.email)),
                }
            }
        }
    }
}

/// Backfills an existing user's contact fields from the order payload.
///
/// Empty phone/username values are filled in; populated values are never
/// overwritten. The resolved address is attached only if the user had none.
fn apply_backfill(user: &mut User, payload: &UserPayload, address: &Address) {
    if user.phone.is_empty() {
        user.phone = payload.phone.clone();
    }
    if user.username.is_empty() {
        user.username = payload.username.clone();
    }
    if user.address_id.is_none() {
        user.address_id = Some(address.id);
    }
}

/// Maps a failed user insert inside the order transaction.
///
/// A `Duplicate` here means a concurrent request created the same email
/// between our lookup and our insert. That is not a duplicate order, so it
/// must not surface as one; the caller simply resubmits.
fn map_user_insert_err(err: RepositoryError, email: &str) -> ServiceError {
    match err {
        RepositoryError::Duplicate => {
            ServiceError::Unexpected(format!("Concurrent creation of user {email}"))
        }
        other => other.into(),
    }
}

#[async_trait]
impl<R1, R2, R3, R4, R5> OrderService for OrderServiceImpl<R1, R2, R3, R4, R5>
where
    R1: OrdersRepository + Send + Sync,
    R2: AddressesRepository + Send + Sync,
    R3: UsersRepository + Send + Sync,
    R4: ServicesRepository + Send + Sync,
    R5: OrderedServicesRepository + Send + Sync,
{
    /// Validates the payloads, then resolves the address and the user,
    /// inserts the order row and bulk-inserts the line items — all inside a
    /// single DB transaction. Any failure (including the duplicate guard on
    /// the orders table) rolls the whole transaction back, so no orphaned
    /// user or address rows survive a failed creation.
    #[instrument(skip(self, req))]
    async fn create_order(&self, req: &NewOrderRequest) -> Result<(), ServiceError> {
        validation::validate_user(&req.user, &self.phone_region)?;
        validation::validate_address(&req.address)?;

        let catalog: HashMap<i32, model::Service> = self
            .services_repo
            .list()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let lines = validation::validate_services(&req.services, &catalog)?;
        let total_time = validation::total_cleaning_time(&lines, &catalog)?;

        let mut client = self.db_pool.get().await.map_err(ServiceError::from)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let address = self.resolve_address(&tx, &req.address).await?;
        let user = self.resolve_user(&tx, &req.user, &address).await?;

        let new_order = NewOrder {
            user_id: user.id,
            total_sum: req.total_sum,
            total_time,
            comment: req.comment.clone(),
            cleaning_type_id: req.cleaning_type,
            address_id: address.id,
            cleaning_date: req.cleaning_date,
            cleaning_time: req.cleaning_time,
        };
        let order_id = self.orders_repo.insert_tx(&tx, &new_order).await?;
        self.ordered_repo.insert_tx(&tx, order_id, &lines).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: i32) -> Result<Order, ServiceError> {
        let mut order = self.orders_repo.get_by_id(id).await?;
        order.services = self.ordered_repo.get_by_order_id(id).await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn list_user_orders(&self, user_id: i32) -> Result<Vec<Order>, ServiceError> {
        let mut orders = self.orders_repo.list_by_user(user_id).await?;
        for order in &mut orders {
            order.services = self.ordered_repo.get_by_order_id(order.id).await?;
        }
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn pay(&self, id: i32) -> Result<(), ServiceError> {
        Ok(self.orders_repo.set_pay_status(id).await?)
    }

    #[instrument(skip(self, comment))]
    async fn cancel(&self, id: i32, comment: Option<String>) -> Result<(), ServiceError> {
        Ok(self.orders_repo.cancel(id, comment.as_deref()).await?)
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: i32, status: OrderStatus) -> Result<(), ServiceError> {
        Ok(self.orders_repo.set_status(id, status).await?)
    }

    #[instrument(skip(self, comment))]
    async fn set_comment(&self, id: i32, comment: String) -> Result<(), ServiceError> {
        Ok(self.orders_repo.set_comment(id, &comment).await?)
    }

    #[instrument(skip(self))]
    async fn reschedule(
        &self,
        id: i32,
        cleaning_date: Option<NaiveDate>,
        cleaning_time: Option<NaiveTime>,
    ) -> Result<(), ServiceError> {
        Ok(self
            .orders_repo
            .reschedule(id, cleaning_date, cleaning_time)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use model::UserRole;

    use super::*;

    fn payload() -> UserPayload {
        UserPayload {
            username: "Мария".to_string(),
            email: "maria@x.com".to_string(),
            phone: "+79991234567".to_string(),
        }
    }

    fn address(id: i32) -> Address {
        Address {
            id,
            city: "Moscow".to_string(),
            street: "Lenina".to_string(),
            house: 5,
            apartment: Some(12),
            floor: Some(3),
            entrance: Some(1),
        }
    }

    fn existing_user(phone: &str, username: &str, address_id: Option<i32>) -> User {
        User {
            id: 1,
            username: username.to_string(),
            email: "maria@x.com".to_string(),
            phone: phone.to_string(),
            role: UserRole::User,
            address_id,
        }
    }

    #[test]
    fn test_backfill_fills_empty_contact_fields() {
        let mut user = existing_user("", "", None);
        apply_backfill(&mut user, &payload(), &address(7));
        assert_eq!(user.phone, "+79991234567");
        assert_eq!(user.username, "Мария");
        assert_eq!(user.address_id, Some(7));
    }

    #[test]
    fn test_backfill_never_overwrites_populated_fields() {
        let mut user = existing_user("+70001112233", "Анна", None);
        apply_backfill(&mut user, &payload(), &address(7));
        assert_eq!(user.phone, "+70001112233");
        assert_eq!(user.username, "Анна");
    }

    #[test]
    fn test_backfill_keeps_existing_address() {
        let mut user = existing_user("+70001112233", "Анна", Some(3));
        apply_backfill(&mut user, &payload(), &address(7));
        assert_eq!(user.address_id, Some(3));
    }

    #[test]
    fn test_concurrent_user_insert_is_not_a_duplicate_order() {
        let err = map_user_insert_err(RepositoryError::Duplicate, "maria@x.com");
        assert!(matches!(err, ServiceError::Unexpected(_)));
    }

    #[test]
    fn test_user_insert_other_errors_pass_through() {
        let err = map_user_insert_err(RepositoryError::NotFound, "maria@x.com");
        assert!(matches!(err, ServiceError::NotFound));
    }
}
