//! Reservation Repository

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{Reservation, ReservationCreate, ReservationStatus};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const RESERVATION_TABLE: &str = "reservation";

#[derive(Clone)]
pub struct ReservationRepository {
    base: BaseRepository,
}

impl ReservationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Reservations of an owner, newest first
    pub async fn find_by_owner(&self, owner: &str) -> RepoResult<Vec<Reservation>> {
        let owner = owner.to_string();
        let reservations: Vec<Reservation> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM reservation WHERE owner = $owner ORDER BY created_at DESC")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(reservations)
    }

    /// Create a reservation
    pub async fn create(&self, owner: &str, data: ReservationCreate) -> RepoResult<Reservation> {
        let key = new_record_key();
        let reservation = Reservation {
            id: None,
            owner: owner.to_string(),
            name: data.name,
            phone: data.phone,
            date: data.date,
            time: data.time,
            party_size: data.party_size,
            notes: data.notes,
            status: ReservationStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let created: Option<Reservation> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", RESERVATION_TABLE))
            .bind(("key", key))
            .bind(("data", reservation))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create reservation".to_string()))
    }

    /// Cancel a reservation (owner scoped)
    pub async fn cancel(&self, owner: &str, id: &str) -> RepoResult<Reservation> {
        let key = strip_table_prefix(RESERVATION_TABLE, id).to_string();
        let owner = owner.to_string();
        let updated: Vec<Reservation> = self
            .base
            .db()
            .query(
                "UPDATE type::thing($tb, $key) SET status = $status WHERE owner = $owner RETURN NONE;
                 SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;",
            )
            .bind(("tb", RESERVATION_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .bind(("status", ReservationStatus::Cancelled))
            .await?
            .take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Reservation {} not found", id)))
    }
}
