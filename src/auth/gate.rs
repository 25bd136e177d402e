use crate::{auth::extractors::Identity, error::AppError};

/// Anything with an owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

/// Pass only when `identity` is the authenticated owner of `resource`.
///
/// Callers read `resource` inside the transaction that performs the
/// mutation, with the row locked.
pub fn authorize(identity: &Identity, resource: &impl Owned) -> Result<(), AppError> {
    match identity.user() {
        Some(user) if user.id == resource.owner_id() => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}
