//! Read access to the service catalog.

use async_trait::async_trait;
use model::{CleaningType, Service};
use repository::{CleaningTypesRepository, ServicesRepository};
use tracing::instrument;

use crate::ServiceError;

/// Trait describing catalog reads.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Cleaning types with their full service sets.
    async fn list_cleaning_types(&self) -> Result<Vec<CleaningType>, ServiceError>;

    /// The service list. Non-staff clients see only the "additional"
    /// services; staff see the whole catalog.
    async fn list_services(&self, additional_only: bool) -> Result<Vec<Service>, ServiceError>;
}

/// Async implementation of [`CatalogService`].
pub struct CatalogServiceImpl<R1, R2> {
    cleaning_types_repo: R1,
    services_repo: R2,
}

impl<R1, R2> CatalogServiceImpl<R1, R2>
where
    R1: CleaningTypesRepository + Send + Sync,
    R2: ServicesRepository + Send + Sync,
{
    pub fn new(cleaning_types_repo: R1, services_repo: R2) -> Self {
        Self {
            cleaning_types_repo,
            services_repo,
        }
    }
}

#[async_trait]
impl<R1, R2> CatalogService for CatalogServiceImpl<R1, R2>
where
    R1: CleaningTypesRepository + Send + Sync,
    R2: ServicesRepository + Send + Sync,
{
    #[instrument(skip(self))]
    async fn list_cleaning_types(&self) -> Result<Vec<CleaningType>, ServiceError> {
        let mut cleaning_types = self.cleaning_types_repo.list().await?;
        for cleaning_type in &mut cleaning_types {
            cleaning_type.services = self
                .services_repo
                .list_by_cleaning_type(cleaning_type.id)
                .await?;
        }
        Ok(cleaning_types)
    }

    #[instrument(skip(self))]
    async fn list_services(&self, additional_only: bool) -> Result<Vec<Service>, ServiceError> {
        let services = if additional_only {
            self.services_repo.list_additional().await?
        } else {
            self.services_repo.list().await?
        };
        Ok(services)
    }
}
