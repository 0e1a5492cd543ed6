// All service modules
pub mod decryption_oracle;
pub mod fhe_engine;
pub mod fusion_service;
pub mod fusion_vault;

// Re-export for convenience
pub use decryption_oracle::DecryptionOracle;
pub use fhe_engine::FheEngine;
pub use fusion_service::FusionService;
pub use fusion_vault::FusionVault;

use crate::db::Database;
use std::sync::Arc;

/// Start all background services
pub async fn start_background_services(db: Database, oracle: Arc<DecryptionOracle>) {
    tracing::info!("Starting background services...");

    oracle.start_worker(db).await;

    tracing::info!("All background services started successfully");
}
