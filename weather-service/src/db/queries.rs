use chrono::NaiveDate;
use common::models::{FavoriteLocation, Location, WeatherKind};
use serde_json::Value;
use sqlx::PgPool;

pub async fn find_location_by_city(
    pool: &PgPool,
    city: &str,
) -> Result<Option<Location>, sqlx::Error> {
    let location = sqlx::query_as::<_, Location>(
        r#"
        SELECT id, city, country, lat, lng
        FROM locations
        WHERE LOWER(city) = LOWER($1)
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(city.trim())
    .fetch_optional(pool)
    .await?;

    Ok(location)
}

pub async fn find_location_by_id(pool: &PgPool, id: i32) -> Result<Option<Location>, sqlx::Error> {
    let location = sqlx::query_as::<_, Location>(
        r#"
        SELECT id, city, country, lat, lng
        FROM locations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(location)
}

pub async fn list_locations(pool: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
    let locations = sqlx::query_as::<_, Location>(
        r#"
        SELECT id, city, country, lat, lng
        FROM locations
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(locations)
}

#[derive(sqlx::FromRow)]
pub struct Favorite {
    pub id: i32,
    pub user_id: i32,
    pub city_id: i32,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<Favorite> for FavoriteLocation {
    fn from(row: Favorite) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            location: Location {
                id: row.city_id,
                city: row.city,
                country: row.country,
                lat: row.lat,
                lng: row.lng,
            },
        }
    }
}

impl Favorite {
    pub async fn list_page(pool: &PgPool, limit: i64, skip: i64) -> Result<Vec<Self>, sqlx::Error> {
        let favorites = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT f.id, f.user_id, f.city_id, l.city, l.country, l.lat, l.lng
            FROM user_favorite_locations f
            INNER JOIN locations l ON l.id = f.city_id
            ORDER BY f.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

        Ok(favorites)
    }

    pub async fn create(pool: &PgPool, user_id: i32, city_id: i32) -> Result<i32, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO user_favorite_locations (user_id, city_id)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(city_id)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }
}

#[derive(sqlx::FromRow)]
pub struct WeatherRecord {
    pub id: i32,
    pub city_id: i32,
    pub kind: String,
    pub date: NaiveDate,
    pub data: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl WeatherRecord {
    pub async fn find(
        pool: &PgPool,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT id, city_id, kind, date, data, created_at, updated_at
            FROM weather_records
            WHERE city_id = $1 AND kind = $2 AND date = $3
            "#,
        )
        .bind(city_id)
        .bind(kind.as_str())
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn upsert(
        pool: &PgPool,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
        data: &Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO weather_records (city_id, kind, date, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (city_id, kind, date)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(city_id)
        .bind(kind.as_str())
        .bind(date)
        .bind(data)
        .execute(pool)
        .await?;

        Ok(())
    }
}
