// Utility modules

use crate::{
    constants::MAX_PAGE_LIMIT,
    error::{AppError, Result},
};

/// Basic guard for list/query limits to avoid expensive queries.
pub fn ensure_page_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::RateLimitExceeded);
    }

    Ok(())
}
