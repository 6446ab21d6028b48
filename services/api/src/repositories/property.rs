//! Property repository

use serde::Deserialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{ApprovalStatus, Property, PropertyDraft, PropertyPatch, PropertyStatus};

const PROPERTY_COLUMNS: &str = "id, name, property_type, price, images, address, bedrooms, \
     bathrooms, area, description, facilities, geolocation, status, approval_status, rating, \
     reviews, phone, created_at, updated_at";

fn map_property(row: &PgRow) -> Property {
    let status: String = row.get("status");
    let approval: String = row.get("approval_status");
    Property {
        id: row.get("id"),
        name: row.get("name"),
        property_type: row.get("property_type"),
        price: row.get("price"),
        images: row.get("images"),
        address: row.get("address"),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        area: row.get("area"),
        description: row.get("description"),
        facilities: row.get("facilities"),
        geolocation: row.get("geolocation"),
        status: PropertyStatus::from(status.as_str()),
        approval_status: ApprovalStatus::from(approval.as_str()),
        rating: row.get("rating"),
        reviews: row.get("reviews"),
        phone: row.get("phone"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Filters accepted by the public listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub filter: Option<String>,
    pub query: Option<String>,
    pub limit: Option<i64>,
}

impl ListingQuery {
    /// `All` (any casing) and blank filters mean no type restriction
    pub fn type_filter(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("all"))
    }

    pub fn search_term(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q))
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(6)
    }
}

#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new listing. Starts pending approval and available.
    pub async fn create(
        &self,
        draft: &PropertyDraft,
        images: &[String],
    ) -> Result<Property, sqlx::Error> {
        info!("Creating property listing: {}", draft.name);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO properties
                (name, property_type, price, images, address, bedrooms, bathrooms,
                 area, description, facilities, geolocation, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PROPERTY_COLUMNS}
            "#,
        ))
        .bind(&draft.name)
        .bind(&draft.property_type)
        .bind(draft.price)
        .bind(images)
        .bind(&draft.address)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.area)
        .bind(&draft.description)
        .bind(&draft.facilities)
        .bind(&draft.geolocation)
        .bind(&draft.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_property(&row))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_property))
    }

    /// Approved listings, newest first, with optional type filter and
    /// case-insensitive name/description search
    pub async fn list_approved(&self, params: &ListingQuery) -> Result<Vec<Property>, sqlx::Error> {
        let mut sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE approval_status = 'approved'"
        );
        if params.type_filter().is_some() {
            sql.push_str(" AND property_type = $1");
        }
        if params.search_term().is_some() {
            let n = if params.type_filter().is_some() { 2 } else { 1 };
            sql.push_str(&format!(" AND (name ILIKE ${n} OR description ILIKE ${n})"));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ");
        sql.push_str(&params.limit().to_string());

        let mut query = sqlx::query(&sql);
        if let Some(filter) = params.type_filter() {
            query = query.bind(filter.to_string());
        }
        if let Some(term) = params.search_term() {
            query = query.bind(term);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(map_property).collect())
    }

    /// Approved and still-available listings, newest first
    pub async fn list_latest(&self, limit: i64) -> Result<Vec<Property>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE approval_status = 'approved' AND status = 'available'
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_property).collect())
    }

    /// The superadmin approval queue
    pub async fn list_pending(&self) -> Result<Vec<Property>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE approval_status = 'pending'
            ORDER BY created_at DESC
            "#,
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_property).collect())
    }

    /// Apply a partial edit. Any edit sends the listing back through
    /// approval; new images append after the existing ones.
    pub async fn update(
        &self,
        id: Uuid,
        patch: &PropertyPatch,
        new_images: &[String],
    ) -> Result<Option<Property>, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE properties SET
                name = COALESCE($2, name),
                property_type = COALESCE($3, property_type),
                price = COALESCE($4, price),
                address = COALESCE($5, address),
                bedrooms = COALESCE($6, bedrooms),
                bathrooms = COALESCE($7, bathrooms),
                area = COALESCE($8, area),
                description = COALESCE($9, description),
                facilities = COALESCE($10, facilities),
                geolocation = COALESCE($11, geolocation),
                status = COALESCE($12, status),
                phone = COALESCE($13, phone),
                images = images || $14,
                approval_status = 'pending',
                updated_at = now()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.property_type)
        .bind(patch.price)
        .bind(&patch.address)
        .bind(patch.bedrooms)
        .bind(patch.bathrooms)
        .bind(patch.area)
        .bind(&patch.description)
        .bind(&patch.facilities)
        .bind(&patch.geolocation)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.phone)
        .bind(new_images)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_property))
    }

    /// Superadmin approval decision. Idempotent on repeat calls.
    pub async fn set_approval(
        &self,
        id: Uuid,
        decision: ApprovalStatus,
    ) -> Result<Option<Property>, sqlx::Error> {
        info!("Setting approval for property {}: {}", id, decision.as_str());

        let row = sqlx::query(&format!(
            r#"
            UPDATE properties
            SET approval_status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(decision.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_property))
    }

    /// Admin availability override
    pub async fn set_status(
        &self,
        id: Uuid,
        status: PropertyStatus,
    ) -> Result<Option<Property>, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE properties
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_property, test_pool};
    use serial_test::serial;

    #[test]
    fn all_filter_means_no_restriction() {
        let params = ListingQuery {
            filter: Some("All".to_string()),
            ..Default::default()
        };
        assert!(params.type_filter().is_none());

        let params = ListingQuery {
            filter: Some("Apartment".to_string()),
            ..Default::default()
        };
        assert_eq!(params.type_filter(), Some("Apartment"));
    }

    #[test]
    fn search_term_is_wrapped_for_ilike() {
        let params = ListingQuery {
            query: Some(" pool ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.search_term().as_deref(), Some("%pool%"));

        let params = ListingQuery::default();
        assert!(params.search_term().is_none());
    }

    #[test]
    fn limit_defaults_and_rejects_nonpositive() {
        assert_eq!(ListingQuery::default().limit(), 6);
        let params = ListingQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(params.limit(), 6);
        let params = ListingQuery {
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(params.limit(), 20);
    }

    #[tokio::test]
    #[serial]
    async fn unapproved_listings_stay_out_of_the_catalogue() {
        let Some(pool) = test_pool().await else { return };
        let repo = PropertyRepository::new(pool.clone());

        let pending_id = seed_property(&pool, "pending", "available").await;
        let approved_id = seed_property(&pool, "approved", "available").await;

        let params = ListingQuery {
            limit: Some(1000),
            ..Default::default()
        };
        let listed: Vec<Uuid> = repo
            .list_approved(&params)
            .await
            .expect("list failed")
            .iter()
            .map(|p| p.id)
            .collect();
        assert!(listed.contains(&approved_id));
        assert!(!listed.contains(&pending_id));

        let latest: Vec<Uuid> = repo
            .list_latest(1000)
            .await
            .expect("latest failed")
            .iter()
            .map(|p| p.id)
            .collect();
        assert!(!latest.contains(&pending_id));
    }

    #[tokio::test]
    #[serial]
    async fn edits_reset_approval() {
        let Some(pool) = test_pool().await else { return };
        let repo = PropertyRepository::new(pool.clone());

        let id = seed_property(&pool, "approved", "available").await;

        let patch = PropertyPatch {
            price: Some(750.0),
            ..Default::default()
        };
        let updated = repo
            .update(id, &patch, &[])
            .await
            .expect("update failed")
            .expect("property missing");

        assert_eq!(updated.price, 750.0);
        assert_eq!(updated.approval_status, ApprovalStatus::Pending);
    }
}
