//! Post-service ratings.

use async_trait::async_trait;
use model::Rating;
use repository::{NewRating, OrdersRepository, RatingsRepository};
use tracing::instrument;

use crate::ServiceError;

/// Allowed score range for a rating.
pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

/// Trait describing rating operations.
#[async_trait]
pub trait RatingService: Send + Sync {
    /// Creates a rating for an existing order.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for an unknown order and
    /// [`ServiceError::Validation`] for an out-of-range score.
    async fn create(
        &self,
        order_id: i32,
        user_id: i32,
        text: String,
        score: i16,
    ) -> Result<Rating, ServiceError>;

    /// Ratings for the landing page, newest first.
    async fn list(&self) -> Result<Vec<Rating>, ServiceError>;
}

/// Async implementation of [`RatingService`].
pub struct RatingServiceImpl<R1, R2> {
    ratings_repo: R1,
    orders_repo: R2,
}

impl<R1, R2> RatingServiceImpl<R1, R2>
where
    R1: RatingsRepository + Send + Sync,
    R2: OrdersRepository + Send + Sync,
{
    pub fn new(ratings_repo: R1, orders_repo: R2) -> Self {
        Self {
            ratings_repo,
            orders_repo,
        }
    }
}

#[async_trait]
impl<R1, R2> RatingService for RatingServiceImpl<R1, R2>
where
    R1: RatingsRepository + Send + Sync,
    R2: OrdersRepository + Send + Sync,
{
    #[instrument(skip(self, text))]
    async fn create(
        &self,
        order_id: i32,
        user_id: i32,
        text: String,
        score: i16,
    ) -> Result<Rating, ServiceError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ServiceError::Validation(format!(
                "Оценка должна быть в диапазоне от {MIN_SCORE} до {MAX_SCORE}."
            )));
        }
        // Ordering matters: an unknown order must surface as "not found"
        // before anything is written.
        let order = self.orders_repo.get_by_id(order_id).await?;

        let rating = self
            .ratings_repo
            .insert(&NewRating {
                user_id,
                order_id: order.id,
                text,
                score,
            })
            .await?;
        Ok(rating)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Rating>, ServiceError> {
        Ok(self.ratings_repo.list().await?)
    }
}
