//! Display name validation
//!
//! Pure checks with no state: syntax (`[A-Za-z0-9_]+`) and reservation.

use crate::error::Rejection;

/// Any name containing this fragment, in any case, is reserved.
pub const RESERVED_FRAGMENT: &str = "server";

/// True iff `name` is non-empty and only ASCII letters, digits or underscores.
pub fn is_well_formed(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True iff the lowercase form of `name` contains "server".
pub fn is_reserved(name: &str) -> bool {
    name.to_lowercase().contains(RESERVED_FRAGMENT)
}

/// Syntax and reservation checks combined, in that order.
///
/// Reserved names are reported as taken.
pub fn validate(name: &str) -> Result<(), Rejection> {
    if !is_well_formed(name) {
        return Err(Rejection::InvalidName);
    }
    if is_reserved(name) {
        return Err(Rejection::NameTaken);
    }
    Ok(())
}
