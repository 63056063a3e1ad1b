use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Facility;

pub async fn create(
    pool: &PgPool,
    name: &str,
    address: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tax_amount: f64,
    owner_account_id: Uuid,
) -> Result<Facility, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        "INSERT INTO facilities (name, address, latitude, longitude, tax_amount, owner_account_id)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(name)
    .bind(address)
    .bind(latitude)
    .bind(longitude)
    .bind(tax_amount)
    .bind(owner_account_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>("SELECT * FROM facilities ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn list_by_owner(pool: &PgPool, owner: Uuid) -> Result<Vec<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        "SELECT * FROM facilities WHERE owner_account_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner)
    .fetch_all(pool)
    .await
}

pub async fn set_verified(pool: &PgPool, id: Uuid) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        "UPDATE facilities SET is_verified = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn set_location(
    pool: &PgPool,
    id: Uuid,
    latitude: f64,
    longitude: f64,
) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        "UPDATE facilities SET latitude = $2, longitude = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(latitude)
    .bind(longitude)
    .fetch_optional(pool)
    .await
}

pub async fn set_tax_amount(
    pool: &PgPool,
    id: Uuid,
    tax_amount: f64,
) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        "UPDATE facilities SET tax_amount = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(tax_amount)
    .fetch_optional(pool)
    .await
}

/// Apply one compounding discount server-side and return the new amount.
/// The arithmetic and rounding happen in SQL so concurrent approvals on
/// other facilities never interleave with a stale read.
pub async fn apply_discount<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    rate: f64,
) -> Result<Option<f64>, sqlx::Error> {
    let row: Option<(f64,)> = sqlx::query_as(
        "UPDATE facilities
         SET tax_amount = round((tax_amount - tax_amount * $2)::numeric, 2)::double precision
         WHERE id = $1
         RETURNING tax_amount",
    )
    .bind(id)
    .bind(rate)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|r| r.0))
}
