//! # Data Repository Layer
//!
//! This module provides repository traits and PostgreSQL implementations
//! for all entities: addresses, users, the service catalog, orders,
//! order line items and ratings. Each repository supports both regular
//! and transactional operations for integration with service/business logic.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use model::{
    Address, AddressPayload, CleaningType, Order, OrderStatus, OrderedService, Rating, Service,
    User, UserRole,
};
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Row, Transaction};

/// # RepositoryError
///
/// Error types that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// A unique constraint rejected the write.
    #[error("Already exists")]
    Duplicate,
    /// A stored value could not be decoded into its model type.
    #[error("Invalid stored value: {0}")]
    Decode(String),
}

/// Converts an insert error into `Duplicate` when the database rejected the
/// row on a unique constraint (SQLSTATE 23505).
fn map_insert_err(e: tokio_postgres::Error) -> RepositoryError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        RepositoryError::Duplicate
    } else {
        RepositoryError::Db(e)
    }
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// New address row to insert; mirrors the incoming payload.
pub type NewAddress = AddressPayload;

/// # AddressesRepository
///
/// Repository interface for address records. Addresses carry no uniqueness
/// constraint: reuse is decided by exact-field lookup, never by merging.
#[async_trait]
pub trait AddressesRepository: Send + Sync {
    /// Find an address matching every field of the payload (NULL-safe on
    /// the optional ones), inside the caller's transaction.
    async fn find_exact_tx(
        &self,
        tx: &Transaction<'_>,
        payload: &NewAddress,
    ) -> Result<Option<Address>, RepositoryError>;

    /// Insert a new address row in a transaction and return it.
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        payload: &NewAddress,
    ) -> Result<Address, RepositoryError>;

    /// Get an address by its id.
    async fn get_by_id(&self, id: i32) -> Result<Address, RepositoryError>;
}

/// PostgreSQL implementation of the AddressesRepository trait.
pub struct PgAddressesRepository {
    db: Client,
}

impl PgAddressesRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn address_from_row(row: &Row) -> Address {
    Address {
        id: row.get("id"),
        city: row.get("city"),
        street: row.get("street"),
        house: row.get("house"),
        apartment: row.get("apartment"),
        floor: row.get("floor"),
        entrance: row.get("entrance"),
    }
}

#[async_trait]
impl AddressesRepository for PgAddressesRepository {
    async fn find_exact_tx(
        &self,
        tx: &Transaction<'_>,
        payload: &NewAddress,
    ) -> Result<Option<Address>, RepositoryError> {
        let query = r#"
            SELECT id, city, street, house, apartment, floor, entrance
            FROM addresses
            WHERE city = $1 AND street = $2 AND house = $3
              AND apartment IS NOT DISTINCT FROM $4
              AND floor IS NOT DISTINCT FROM $5
              AND entrance IS NOT DISTINCT FROM $6
            LIMIT 1
        "#;
        let row = tx
            .query_opt(query, &[
                &payload.city,
                &payload.street,
                &payload.house,
                &payload.apartment,
                &payload.floor,
                &payload.entrance,
            ])
            .await?;
        Ok(row.as_ref().map(address_from_row))
    }

    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        payload: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let query = r#"
            INSERT INTO addresses (city, street, house, apartment, floor, entrance)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, city, street, house, apartment, floor, entrance
        "#;
        let row = tx
            .query_one(query, &[
                &payload.city,
                &payload.street,
                &payload.house,
                &payload.apartment,
                &payload.floor,
                &payload.entrance,
            ])
            .await?;
        Ok(address_from_row(&row))
    }

    async fn get_by_id(&self, id: i32) -> Result<Address, RepositoryError> {
        let query = r#"
            SELECT id, city, street, house, apartment, floor, entrance
            FROM addresses WHERE id = $1
        "#;
        match self.db.query_opt(query, &[&id]).await? {
            Some(row) => Ok(address_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// New user row to insert. The password is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub address_id: Option<i32>,
}

/// # UsersRepository
///
/// Repository interface for user records. Email is the unique login
/// identifier; lookups used by the order workflow run inside the caller's
/// transaction so that a rolled-back order leaves no new user behind.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get_by_email_tx(
        &self,
        tx: &Transaction<'_>,
        email: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        user: &NewUser,
    ) -> Result<User, RepositoryError>;

    /// Persist backfilled contact fields (username, phone, address).
    async fn update_contact_tx(
        &self,
        tx: &Transaction<'_>,
        user: &User,
    ) -> Result<(), RepositoryError>;

    /// Insert a user outside of any transaction (explicit registration).
    /// Returns `Duplicate` when the email is already taken.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: i32) -> Result<User, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    /// Replace the stored password hash.
    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the UsersRepository trait.
pub struct PgUsersRepository {
    db: Client,
}

impl PgUsersRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &Row) -> Result<User, RepositoryError> {
    let role: String = row.get("role");
    let role = UserRole::from_str(&role)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown user role '{role}'")))?;
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        phone: row.get("phone"),
        address_id: row.get("address_id"),
        role,
    })
}

const USER_COLUMNS: &str = "id, username, email, phone, address_id, role";

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn get_by_email_tx(
        &self,
        tx: &Transaction<'_>,
        email: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = tx.query_opt(query.as_str(), &[&email]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        user: &NewUser,
    ) -> Result<User, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, phone, password, address_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
        "#
        );
        let row = tx
            .query_one(query.as_str(), &[
                &user.username,
                &user.email,
                &user.phone,
                &user.password_hash,
                &user.address_id,
            ])
            .await
            .map_err(map_insert_err)?;
        user_from_row(&row)
    }

    async fn update_contact_tx(
        &self,
        tx: &Transaction<'_>,
        user: &User,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE users SET username = $2, phone = $3, address_id = $4
            WHERE id = $1
        "#;
        let updated = tx
            .execute(query, &[&user.id, &user.username, &user.phone, &user.address_id])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, phone, password, address_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
        "#
        );
        let row = self
            .db
            .query_one(query.as_str(), &[
                &user.username,
                &user.email,
                &user.phone,
                &user.password_hash,
                &user.address_id,
            ])
            .await
            .map_err(map_insert_err)?;
        user_from_row(&row)
    }

    async fn get_by_id(&self, id: i32) -> Result<User, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        match self.db.query_opt(query.as_str(), &[&id]).await? {
            Some(row) => user_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        match self.db.query_opt(query.as_str(), &[&email]).await? {
            Some(row) => user_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), RepositoryError> {
        let updated = self
            .db
            .execute("UPDATE users SET password = $2 WHERE id = $1", &[&id, &password_hash])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog: cleaning types and services
// ---------------------------------------------------------------------------

/// # CleaningTypesRepository
///
/// Read access to the cleaning-type groupings of the catalog.
#[async_trait]
pub trait CleaningTypesRepository: Send + Sync {
    /// List cleaning types without their service sets.
    async fn list(&self) -> Result<Vec<CleaningType>, RepositoryError>;

    async fn get_by_id(&self, id: i32) -> Result<CleaningType, RepositoryError>;
}

/// PostgreSQL implementation of the CleaningTypesRepository trait.
pub struct PgCleaningTypesRepository {
    db: Client,
}

impl PgCleaningTypesRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn cleaning_type_from_row(row: &Row) -> CleaningType {
    CleaningType {
        id: row.get("id"),
        title: row.get("title"),
        coefficient: row.get("coefficient"),
        services: Vec::new(), // To be filled by service
    }
}

#[async_trait]
impl CleaningTypesRepository for PgCleaningTypesRepository {
    async fn list(&self) -> Result<Vec<CleaningType>, RepositoryError> {
        let rows = self
            .db
            .query("SELECT id, title, coefficient FROM cleaning_types ORDER BY id", &[])
            .await?;
        Ok(rows.iter().map(cleaning_type_from_row).collect())
    }

    async fn get_by_id(&self, id: i32) -> Result<CleaningType, RepositoryError> {
        let row = self
            .db
            .query_opt("SELECT id, title, coefficient FROM cleaning_types WHERE id = $1", &[&id])
            .await?;
        match row {
            Some(row) => Ok(cleaning_type_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// # ServicesRepository
///
/// Read access to the service catalog.
#[async_trait]
pub trait ServicesRepository: Send + Sync {
    /// List the whole catalog.
    async fn list(&self) -> Result<Vec<Service>, RepositoryError>;

    /// List only the "additional" services shown to non-staff clients.
    async fn list_additional(&self) -> Result<Vec<Service>, RepositoryError>;

    async fn list_by_cleaning_type(
        &self,
        cleaning_type_id: i32,
    ) -> Result<Vec<Service>, RepositoryError>;
}

/// PostgreSQL implementation of the ServicesRepository trait.
pub struct PgServicesRepository {
    db: Client,
}

impl PgServicesRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn service_from_row(row: &Row) -> Service {
    Service {
        id: row.get("id"),
        title: row.get("title"),
        price: row.get("price"),
        measure: row.get("measure"),
        image: row.get("image"),
        cleaning_time: row.get("cleaning_time"),
        cleaning_type_id: row.get("cleaning_type_id"),
        additional: row.get("additional"),
    }
}

const SERVICE_COLUMNS: &str =
    "id, title, price, measure, image, cleaning_time, cleaning_type_id, additional";

#[async_trait]
impl ServicesRepository for PgServicesRepository {
    async fn list(&self) -> Result<Vec<Service>, RepositoryError> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY id");
        let rows = self.db.query(query.as_str(), &[]).await?;
        Ok(rows.iter().map(service_from_row).collect())
    }

    async fn list_additional(&self) -> Result<Vec<Service>, RepositoryError> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE additional ORDER BY id");
        let rows = self.db.query(query.as_str(), &[]).await?;
        Ok(rows.iter().map(service_from_row).collect())
    }

    async fn list_by_cleaning_type(
        &self,
        cleaning_type_id: i32,
    ) -> Result<Vec<Service>, RepositoryError> {
        let query =
            format!("SELECT {SERVICE_COLUMNS} FROM services WHERE cleaning_type_id = $1 ORDER BY id");
        let rows = self.db.query(query.as_str(), &[&cleaning_type_id]).await?;
        Ok(rows.iter().map(service_from_row).collect())
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// New order row to insert; resolver results plus order scalar fields.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub total_sum: i32,
    pub total_time: i32,
    pub comment: String,
    pub cleaning_type_id: i32,
    pub address_id: i32,
    pub cleaning_date: NaiveDate,
    pub cleaning_time: NaiveTime,
}

/// # OrdersRepository
///
/// Repository interface for orders: transactional creation guarded by the
/// composite unique constraint, reads, and the partial lifecycle updates
/// (pay, cancel, status, comment, reschedule). Every update is a single
/// statement and is idempotent on repeated identical calls.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Insert the order row in a transaction and return its id.
    /// Returns `Duplicate` when an identical submission already exists.
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        order: &NewOrder,
    ) -> Result<i32, RepositoryError>;

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError>;

    async fn list_by_user(&self, user_id: i32) -> Result<Vec<Order>, RepositoryError>;

    async fn set_pay_status(&self, id: i32) -> Result<(), RepositoryError>;

    /// Set the status to `cancelled`; an absent comment keeps the stored one.
    async fn cancel(&self, id: i32, comment: Option<&str>) -> Result<(), RepositoryError>;

    async fn set_status(&self, id: i32, status: OrderStatus) -> Result<(), RepositoryError>;

    async fn set_comment(&self, id: i32, comment: &str) -> Result<(), RepositoryError>;

    /// Replace cleaning date and/or time; an absent part stays untouched.
    async fn reschedule(
        &self,
        id: i32,
        cleaning_date: Option<NaiveDate>,
        cleaning_time: Option<NaiveTime>,
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the OrdersRepository trait.
pub struct PgOrdersRepository {
    db: Client,
}

impl PgOrdersRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn order_from_row(row: &Row) -> Result<Order, RepositoryError> {
    let status: String = row.get("order_status");
    let order_status = OrderStatus::from_str(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status '{status}'")))?;
    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        total_sum: row.get("total_sum"),
        total_time: row.get("total_time"),
        comment: row.get("comment"),
        order_status,
        cleaning_type_id: row.get("cleaning_type_id"),
        address_id: row.get("address_id"),
        pay_status: row.get("pay_status"),
        creation_date: row.get("creation_date"),
        creation_time: row.get("creation_time"),
        cleaning_date: row.get("cleaning_date"),
        cleaning_time: row.get("cleaning_time"),
        comment_cancel: row.get("comment_cancel"),
        services: Vec::new(), // To be filled by service
    })
}

const ORDER_COLUMNS: &str = "id, user_id, total_sum, total_time, comment, order_status, \
     cleaning_type_id, address_id, pay_status, creation_date, creation_time, \
     cleaning_date, cleaning_time, comment_cancel";

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        order: &NewOrder,
    ) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO orders (
                user_id, total_sum, total_time, comment, order_status,
                cleaning_type_id, address_id, creation_date, creation_time,
                cleaning_date, cleaning_time
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, CURRENT_DATE, LOCALTIME, $8, $9)
            RETURNING id
        "#;
        let row = tx
            .query_one(query, &[
                &order.user_id,
                &order.total_sum,
                &order.total_time,
                &order.comment,
                &OrderStatus::Pending.as_str(),
                &order.cleaning_type_id,
                &order.address_id,
                &order.cleaning_date,
                &order.cleaning_time,
            ])
            .await
            .map_err(map_insert_err)?;
        Ok(row.get("id"))
    }

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        match self.db.query_opt(query.as_str(), &[&id]).await? {
            Some(row) => order_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_by_user(&self, user_id: i32) -> Result<Vec<Order>, RepositoryError> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id DESC");
        let rows = self.db.query(query.as_str(), &[&user_id]).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn set_pay_status(&self, id: i32) -> Result<(), RepositoryError> {
        let updated = self
            .db
            .execute("UPDATE orders SET pay_status = TRUE WHERE id = $1", &[&id])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn cancel(&self, id: i32, comment: Option<&str>) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET order_status = 'cancelled',
                comment_cancel = COALESCE($2, comment_cancel)
            WHERE id = $1
        "#;
        let updated = self.db.execute(query, &[&id, &comment]).await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_status(&self, id: i32, status: OrderStatus) -> Result<(), RepositoryError> {
        let updated = self
            .db
            .execute("UPDATE orders SET order_status = $2 WHERE id = $1", &[
                &id,
                &status.as_str(),
            ])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_comment(&self, id: i32, comment: &str) -> Result<(), RepositoryError> {
        let updated = self
            .db
            .execute("UPDATE orders SET comment = $2 WHERE id = $1", &[&id, &comment])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        id: i32,
        cleaning_date: Option<NaiveDate>,
        cleaning_time: Option<NaiveTime>,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET cleaning_date = COALESCE($2, cleaning_date),
                cleaning_time = COALESCE($3, cleaning_time)
            WHERE id = $1
        "#;
        let updated = self
            .db
            .execute(query, &[&id, &cleaning_date, &cleaning_time])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Order line items
// ---------------------------------------------------------------------------

/// One (service, amount) pair to attach to an order.
#[derive(Debug, Clone, Copy)]
pub struct OrderLine {
    pub service_id: i32,
    pub amount: i32,
}

/// # OrderedServicesRepository
///
/// Repository interface for order line items. Line items are created in
/// bulk inside the order-creation transaction and are immutable afterwards.
#[async_trait]
pub trait OrderedServicesRepository: Send + Sync {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: i32,
        lines: &[OrderLine],
    ) -> Result<(), RepositoryError>;

    /// Line items of one order, joined with catalog data for display.
    async fn get_by_order_id(&self, order_id: i32)
        -> Result<Vec<OrderedService>, RepositoryError>;
}

/// PostgreSQL implementation of the OrderedServicesRepository trait.
pub struct PgOrderedServicesRepository {
    db: Client,
}

impl PgOrderedServicesRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderedServicesRepository for PgOrderedServicesRepository {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: i32,
        lines: &[OrderLine],
    ) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO ordered_services (order_id, service_id, amount)
            VALUES ($1, $2, $3)
        "#;
        for line in lines {
            tx.execute(query, &[&order_id, &line.service_id, &line.amount])
                .await?;
        }
        Ok(())
    }

    async fn get_by_order_id(
        &self,
        order_id: i32,
    ) -> Result<Vec<OrderedService>, RepositoryError> {
        let query = r#"
            SELECT s.id AS service_id, s.title, s.measure, s.price, os.amount
            FROM ordered_services os
            JOIN services s ON s.id = os.service_id
            WHERE os.order_id = $1
            ORDER BY os.id
        "#;
        let rows = self.db.query(query, &[&order_id]).await?;
        Ok(rows
            .iter()
            .map(|row| OrderedService {
                service_id: row.get("service_id"),
                title: row.get("title"),
                measure: row.get("measure"),
                price: row.get("price"),
                amount: row.get("amount"),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// New rating row to insert.
#[derive(Debug, Clone)]
pub struct NewRating {
    pub user_id: i32,
    pub order_id: i32,
    pub text: String,
    pub score: i16,
}

/// # RatingsRepository
///
/// Repository interface for post-service ratings.
#[async_trait]
pub trait RatingsRepository: Send + Sync {
    async fn insert(&self, rating: &NewRating) -> Result<Rating, RepositoryError>;

    async fn list(&self) -> Result<Vec<Rating>, RepositoryError>;
}

/// PostgreSQL implementation of the RatingsRepository trait.
pub struct PgRatingsRepository {
    db: Client,
}

impl PgRatingsRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

fn rating_from_row(row: &Row) -> Rating {
    Rating {
        id: row.get("id"),
        user_id: row.get("user_id"),
        order_id: row.get("order_id"),
        text: row.get("text"),
        score: row.get("score"),
        pub_date: row.get("pub_date"),
    }
}

#[async_trait]
impl RatingsRepository for PgRatingsRepository {
    async fn insert(&self, rating: &NewRating) -> Result<Rating, RepositoryError> {
        let query = r#"
            INSERT INTO ratings (user_id, order_id, text, score)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, order_id, text, score, pub_date
        "#;
        let row = self
            .db
            .query_one(query, &[
                &rating.user_id,
                &rating.order_id,
                &rating.text,
                &rating.score,
            ])
            .await?;
        Ok(rating_from_row(&row))
    }

    async fn list(&self) -> Result<Vec<Rating>, RepositoryError> {
        let rows = self
            .db
            .query(
                "SELECT id, user_id, order_id, text, score, pub_date FROM ratings ORDER BY pub_date DESC",
                &[],
            )
            .await?;
        Ok(rows.iter().map(rating_from_row).collect())
    }
}
