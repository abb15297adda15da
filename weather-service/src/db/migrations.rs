use sqlx::PgPool;
use tracing::info;

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id SERIAL PRIMARY KEY,
            city VARCHAR(255) NOT NULL,
            country VARCHAR(255) NOT NULL,
            lat DOUBLE PRECISION NOT NULL,
            lng DOUBLE PRECISION NOT NULL,
            UNIQUE (city, country)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_favorite_locations (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL,
            city_id INTEGER NOT NULL REFERENCES locations(id),
            UNIQUE (city_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_records (
            id SERIAL PRIMARY KEY,
            city_id INTEGER NOT NULL REFERENCES locations(id),
            kind VARCHAR(16) NOT NULL,
            date DATE NOT NULL,
            data JSONB NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
            UNIQUE (city_id, kind, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Default locations
    sqlx::query(
        r#"
        INSERT INTO locations (city, country, lat, lng) VALUES
            ('New York', 'USA', 40.7128, -74.0060),
            ('Paris', 'France', 48.8566, 2.3522),
            ('London', 'UK', 51.5074, -0.1278)
        ON CONFLICT (city, country) DO NOTHING
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
