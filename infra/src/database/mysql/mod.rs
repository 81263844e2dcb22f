//! MySQL implementations of the core persistence traits

pub(crate) mod principal_directory_impl;
mod token_store_impl;

#[cfg(test)]
mod tests;

pub use principal_directory_impl::MySqlPrincipalDirectory;
pub use token_store_impl::MySqlTokenStore;

/// Map a sqlx failure to the domain taxonomy
///
/// Unique-key violations become `Conflict` on `resource`; everything else is
/// a transient storage failure.
pub(crate) fn map_sqlx_error(err: sqlx::Error, resource: &str) -> tw_core::errors::DomainError {
    use tw_core::errors::DomainError;

    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::Conflict {
            resource: resource.to_string(),
        },
        _ => DomainError::storage(err),
    }
}
