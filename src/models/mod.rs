// src/models/mod.rs
pub mod fusion;
pub mod user;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use fusion::{
    BatchRequest, DecryptPrepareResponse, DecryptRequest, DecryptResponse, FuseRequest,
    FuseResponse, FusionRecord, NftAttributes, OutputNft, ProviderRequest, RequestFusionResponse,
    SubmitNftRequest,
};
pub use user::{ApiResponse, Notification, PaginatedResponse, User};
