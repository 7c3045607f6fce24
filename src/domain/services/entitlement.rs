use crate::domain::entities::user_context::UserContext;
use crate::helper::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum EntitlementError {
    #[error("Batch processing requires a premium subscription")]
    PremiumRequired,
    #[error("A batch cannot contain more than {0} files")]
    BatchTooLarge(usize),
}

impl std::fmt::Debug for EntitlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Decides whether `user` may submit `batch_size` files in one request.
///
/// A non-premium caller may submit a single file; anything above that is
/// denied for the whole batch. Premium callers are bounded by the configured
/// maximum. Pure decision function, checked before any job is created.
pub fn authorize_batch(
    user: &UserContext,
    batch_size: usize,
    max_batch_size: usize,
) -> Result<(), EntitlementError> {
    if !user.is_premium && batch_size > 1 {
        return Err(EntitlementError::PremiumRequired);
    }
    if batch_size > max_batch_size {
        return Err(EntitlementError::BatchTooLarge(max_batch_size));
    }
    Ok(())
}
