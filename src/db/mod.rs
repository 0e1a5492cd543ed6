use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::{config::Config, error::Result, models::*};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== USER QUERIES ====================
impl Database {
    pub async fn create_user(&self, address: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (address) VALUES ($1)
             ON CONFLICT DO NOTHING",
        )
        .bind(address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, address: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_last_active(&self, address: &str) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = NOW() WHERE address = $1")
            .bind(address)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ==================== STORAGE SURFACE ====================
// The generic string-keyed store the fusion client writes through:
// is_available() / get_data(key) / set_data(key, value). Each set_data is
// an atomic upsert; read-modify-write sequences over it are last-write-wins
// by design of the surface.
impl Database {
    pub async fn is_available(&self) -> bool {
        self.pool.acquire().await.is_ok()
    }

    pub async fn get_data(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    pub async fn set_data(&self, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ==================== NOTIFICATION QUERIES ====================
impl Database {
    pub async fn create_notification(
        &self,
        user: &str,
        notif_type: &str,
        title: &str,
        message: &str,
        data: Option<serde_json::Value>,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO notifications (user_address, notif_type, title, message, data)
             VALUES ($1,$2,$3,$4,$5)
             RETURNING id",
        )
        .bind(user)
        .bind(notif_type)
        .bind(title)
        .bind(message)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        Ok(id)
    }

    pub async fn get_user_notifications(
        &self,
        address: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE user_address = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(address)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn count_user_notifications(&self, address: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_address = $1")
                .bind(address)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
