/// Application constants

// Storage keys used by the fusion client
pub const STORAGE_KEY_INDEX: &str = "fusion_keys";
pub const STORAGE_KEY_RECORD_PREFIX: &str = "fusion_";

// Client-side "FHE" tag. Strings without this prefix decode to all-zero
// attributes instead of failing.
pub const FHE_TAG: &str = "FHEENC:";

// Fusion configuration
pub const FUSION_COST_ETH: &str = "0.01";
pub const ATTRIBUTE_MIN: u32 = 10;
pub const ATTRIBUTE_MAX: u32 = 99;

// Rarity dampener applied after averaging (0.7x, integer arithmetic)
pub const RARITY_DAMPENER_NUM: u32 = 7;
pub const RARITY_DAMPENER_DEN: u32 = 10;

// Vault admission control. Cooldowns are per caller address and applied
// independently to submissions and fusion requests.
pub const SUBMISSION_COOLDOWN_SECS: i64 = 60;
pub const FUSION_COOLDOWN_SECS: i64 = 300;
pub const MIN_BATCH_ENTRIES: usize = 2;

// Decrypt gate (wallet-signature UX window)
pub const DECRYPT_WINDOW_SECS: u64 = 300;
pub const DECRYPT_MESSAGE_TEMPLATE: &str = "FusionLab decrypt request\npublic key: {public_key}\ncontract: {contract}\nchain id: {chain_id}\nvalid for: {window}s";

// Ciphertext handles are 0x-prefixed keccak digests
pub const HANDLE_HEX_LEN: usize = 66;

// API version
pub const API_VERSION: &str = "v1";

// Background service intervals
pub const ORACLE_WORKER_INTERVAL_SECS: u64 = 5;

// Pagination guard
pub const MAX_PAGE_LIMIT: u32 = 100;
