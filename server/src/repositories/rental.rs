//! MySqlRentalRepository - Repository per noleggi, attrezzature e fornitori

use super::{RentalStore, StoreError};
use crate::entities::{Provider, Rental, RentalStatus};
use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// RENTAL REPOSITORY
pub struct MySqlRentalRepository {
    connection_pool: MySqlPool,
}

impl MySqlRentalRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl RentalStore for MySqlRentalRepository {
    #[instrument(skip(self), fields(rental_id = %id))]
    async fn find_rental(&self, id: &Uuid) -> Result<Option<Rental>, StoreError> {
        debug!("Fetching rental");
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, equipment_id, provider_id, status
            FROM rentals
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(rental)
    }

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn find_provider(&self, id: &Uuid) -> Result<Option<Provider>, StoreError> {
        debug!("Fetching provider");
        let provider = sqlx::query_as::<_, Provider>("SELECT id, user_id FROM providers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await?;

        Ok(provider)
    }

    #[instrument(skip(self), fields(rental_id = %id, status = %status))]
    async fn update_rental_status(&self, id: &Uuid, status: RentalStatus) -> Result<(), StoreError> {
        debug!("Updating rental status");
        sqlx::query("UPDATE rentals SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Rental status updated");
        Ok(())
    }

    #[instrument(skip(self), fields(equipment_id = %id, available))]
    async fn set_equipment_availability(&self, id: &Uuid, available: bool) -> Result<(), StoreError> {
        debug!("Updating equipment availability");
        // MySQL conta le righe modificate, non quelle trovate: serve un controllo esplicito
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM equipment WHERE id = ?")
            .bind(id)
            .fetch_one(&self.connection_pool)
            .await?;
        if exists == 0 {
            warn!("Equipment row not found");
            return Err(StoreError::not_found("equipment", id));
        }

        sqlx::query("UPDATE equipment SET is_available = ? WHERE id = ?")
            .bind(available)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Equipment availability updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Uuid = Uuid::from_u128(0xa000_0000_0000_0000_0000_0000_0000_0001);
    const PROVIDER: Uuid = Uuid::from_u128(0xd000_0000_0000_0000_0000_0000_0000_0001);
    const DRILL: Uuid = Uuid::from_u128(0xe000_0000_0000_0000_0000_0000_0000_0001);
    const RENTAL: Uuid = Uuid::from_u128(0xf000_0000_0000_0000_0000_0000_0000_0001);

    async fn is_available(pool: &MySqlPool, id: &Uuid) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT is_available FROM equipment WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    /*------------------------------------------- */
    /* Unit tests: find_rental / find_provider    */
    /*------------------------------------------- */

    /// Test: legge il noleggio con id binari e stato ENUM
    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("rentals")))]
    async fn test_find_rental_success(pool: MySqlPool) {
        let repo = MySqlRentalRepository::new(pool);

        let rental = repo.find_rental(&RENTAL).await.unwrap().unwrap();
        assert_eq!(rental.equipment_id, DRILL);
        assert_eq!(rental.provider_id, PROVIDER);
        assert_eq!(rental.status, RentalStatus::Pending);

        assert!(repo.find_rental(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("rentals")))]
    async fn test_find_provider_returns_owner(pool: MySqlPool) {
        let repo = MySqlRentalRepository::new(pool);

        let provider = repo.find_provider(&PROVIDER).await.unwrap().unwrap();
        assert_eq!(provider.user_id, ALICE);
        assert!(repo.find_provider(&ALICE).await.unwrap().is_none());
    }

    /*------------------------------------------- */
    /* Unit tests: scritture                      */
    /*------------------------------------------- */

    /// Test: ogni stato può seguire qualunque altro stato
    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("rentals")))]
    async fn test_update_rental_status(pool: MySqlPool) {
        let repo = MySqlRentalRepository::new(pool);

        for status in [RentalStatus::Active, RentalStatus::Completed, RentalStatus::Pending] {
            repo.update_rental_status(&RENTAL, status).await.unwrap();
            assert_eq!(repo.find_rental(&RENTAL).await.unwrap().unwrap().status, status);
        }
    }

    /// Test: riscrivere lo stesso valore non è un errore, anche se MySQL non conta righe modificate
    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("rentals")))]
    async fn test_set_equipment_availability_is_idempotent(pool: MySqlPool) {
        let repo = MySqlRentalRepository::new(pool.clone());

        repo.set_equipment_availability(&DRILL, false).await.unwrap();
        assert!(!is_available(&pool, &DRILL).await);

        repo.set_equipment_availability(&DRILL, false).await.unwrap();
        assert!(!is_available(&pool, &DRILL).await);

        repo.set_equipment_availability(&DRILL, true).await.unwrap();
        assert!(is_available(&pool, &DRILL).await);
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("rentals")))]
    async fn test_set_equipment_availability_unknown_equipment(pool: MySqlPool) {
        let repo = MySqlRentalRepository::new(pool);

        let result = repo.set_equipment_availability(&Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "equipment", .. })));
    }
}
