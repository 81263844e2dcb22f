use tw_core::errors::DomainError;

use crate::database::mysql::map_sqlx_error;

#[test]
fn test_non_constraint_errors_are_transient() {
    let err = map_sqlx_error(sqlx::Error::PoolTimedOut, "token record for principal");
    assert!(matches!(err, DomainError::Storage { .. }));
    assert!(err.is_transient());
}

#[test]
fn test_row_not_found_is_storage_error() {
    let err = map_sqlx_error(sqlx::Error::RowNotFound, "refresh token value");
    assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
}

#[test]
fn test_refresh_value_match_is_byte_exact() {
    use crate::database::mysql::token_store_impl::MATCH_REFRESH_VALUE;

    assert!(MATCH_REFRESH_VALUE.starts_with("refresh_value = ?"));
    assert!(MATCH_REFRESH_VALUE.contains("CAST(refresh_value AS BINARY) = CAST(? AS BINARY)"));
    assert_eq!(MATCH_REFRESH_VALUE.matches('?').count(), 2);
}
