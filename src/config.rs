use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Redis
    pub redis_url: String,

    // Chain identity presented to wallets
    pub chain_id: u64,
    pub storage_contract_address: String,
    pub vault_address: String,

    // Vault
    pub vault_owner_address: String,
    pub submission_cooldown_secs: Option<i64>,
    pub fusion_cooldown_secs: Option<i64>,

    // Oracle signing
    pub oracle_signing_secret: String,

    // JWT
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "11155111".to_string())
                .parse()?,
            storage_contract_address: env::var("STORAGE_CONTRACT_ADDRESS")?,
            vault_address: env::var("VAULT_ADDRESS")?,

            vault_owner_address: env::var("VAULT_OWNER_ADDRESS")?,
            submission_cooldown_secs: env::var("SUBMISSION_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            fusion_cooldown_secs: env::var("FUSION_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),

            oracle_signing_secret: env::var("ORACLE_SIGNING_SECRET")?,

            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET is empty");
        }
        if self.oracle_signing_secret.trim().is_empty() {
            anyhow::bail!("ORACLE_SIGNING_SECRET is empty");
        }
        if self.vault_owner_address.trim().is_empty() {
            anyhow::bail!("VAULT_OWNER_ADDRESS is empty");
        }

        if self.storage_contract_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder storage contract address");
        }
        if self.vault_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder vault address");
        }
        if self.oracle_signing_secret.contains("123456") || self.jwt_secret.contains("super_secret")
        {
            tracing::warn!("Detected dev credentials in config");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn submission_cooldown(&self) -> i64 {
        self.submission_cooldown_secs
            .unwrap_or(crate::constants::SUBMISSION_COOLDOWN_SECS)
    }

    pub fn fusion_cooldown(&self) -> i64 {
        self.fusion_cooldown_secs
            .unwrap_or(crate::constants::FUSION_COOLDOWN_SECS)
    }

    pub fn is_testnet(&self) -> bool {
        self.environment == "development" || self.environment == "testnet"
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 3000,
        environment: "development".to_string(),
        database_url: "postgres://localhost".to_string(),
        database_max_connections: 1,
        redis_url: "redis://localhost:6379".to_string(),
        chain_id: 11155111,
        storage_contract_address: "0x00000000000000000000000000000000000000aa".to_string(),
        vault_address: "0x00000000000000000000000000000000000000bb".to_string(),
        vault_owner_address: "0xowner".to_string(),
        submission_cooldown_secs: Some(0),
        fusion_cooldown_secs: Some(0),
        oracle_signing_secret: "oracle-secret".to_string(),
        jwt_secret: "test_secret".to_string(),
        jwt_expiry_hours: 24,
        cors_allowed_origins: "*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_overrides_take_precedence() {
        let mut cfg = test_config();
        cfg.submission_cooldown_secs = Some(7);
        cfg.fusion_cooldown_secs = None;
        assert_eq!(cfg.submission_cooldown(), 7);
        assert_eq!(cfg.fusion_cooldown(), crate::constants::FUSION_COOLDOWN_SECS);
    }

    #[test]
    fn development_counts_as_testnet() {
        let cfg = test_config();
        assert!(cfg.is_testnet());
    }
}
