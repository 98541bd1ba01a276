//! Review Repository

use super::{BaseRepository, RepoError, RepoResult, new_record_key};
use shared::models::{RatingSummary, Review, ReviewCreate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const REVIEW_TABLE: &str = "review";

#[derive(Clone)]
pub struct ReviewRepository {
    base: BaseRepository,
}

impl ReviewRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Reviews for a menu item, newest first
    pub async fn find_by_item(&self, menu_item_id: &str) -> RepoResult<Vec<Review>> {
        let menu_item_id = menu_item_id.to_string();
        let reviews: Vec<Review> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM review WHERE menu_item = $item ORDER BY created_at DESC")
            .bind(("item", menu_item_id))
            .await?
            .take(0)?;
        Ok(reviews)
    }

    /// Create a review
    pub async fn create(&self, owner: &str, data: ReviewCreate) -> RepoResult<Review> {
        if !(1..=5).contains(&data.rating) {
            return Err(RepoError::Validation("rating must be between 1 and 5".into()));
        }

        let key = new_record_key();
        let review = Review {
            id: None,
            owner: owner.to_string(),
            menu_item: data.menu_item,
            rating: data.rating,
            comment: data.comment,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let created: Option<Review> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", REVIEW_TABLE))
            .bind(("key", key))
            .bind(("data", review))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create review".to_string()))
    }

    /// Aggregate rating for a menu item
    pub async fn rating_summary(&self, menu_item_id: &str) -> RepoResult<RatingSummary> {
        let menu_item_id = menu_item_id.to_string();

        #[derive(serde::Deserialize)]
        struct Row {
            average: Option<f64>,
            total: i64,
        }

        let rows: Vec<Row> = self
            .base
            .db()
            .query("SELECT math::mean(rating) AS average, count() AS total FROM review WHERE menu_item = $item GROUP ALL")
            .bind(("item", menu_item_id))
            .await?
            .take(0)?;

        Ok(rows
            .into_iter()
            .next()
            .map(|r| RatingSummary {
                average: r.average.unwrap_or(0.0),
                count: r.total,
            })
            .unwrap_or(RatingSummary {
                average: 0.0,
                count: 0,
            }))
    }
}
