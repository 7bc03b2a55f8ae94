//! Business logic, one service per domain area. Services own no HTTP
//! concerns; handlers translate their `ServiceError`s into responses.

pub mod addresses;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod discounts;
pub mod inventory;
pub mod orders;
pub mod users;
pub mod wishlists;

use uuid::Uuid;

/// Owner of session-scoped storefront state (carts, recently-viewed).
/// Anonymous visitors are keyed by session, signed-in users by user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    User(Uuid),
    Session(Uuid),
}

impl Owner {
    /// Resolves the effective owner for a request: the user when signed in,
    /// the session otherwise.
    pub fn from_identity(user_id: Option<Uuid>, session_id: Uuid) -> Self {
        match user_id {
            Some(id) => Owner::User(id),
            None => Owner::Session(session_id),
        }
    }
}

/// Normalizes (page, limit) query values: page >= 1, limit clamped to 1..=100
/// with a default of 20.
pub(crate) fn normalize_page(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

/// Total page count for pagination metadata. Never zero, so an empty result
/// set still reports one (empty) page.
pub(crate) fn total_pages(total: u64, limit: u64) -> u64 {
    if total == 0 {
        1
    } else {
        total.div_ceil(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_page_applies_defaults_and_caps() {
        assert_eq!(normalize_page(None, None), (1, 20));
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_page(Some(3), Some(500)), (3, 100));
    }

    #[test]
    fn total_pages_is_never_zero() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    #[test]
    fn owner_prefers_user_over_session() {
        let sid = Uuid::new_v4();
        let uid = Uuid::new_v4();
        assert_eq!(Owner::from_identity(Some(uid), sid), Owner::User(uid));
        assert_eq!(Owner::from_identity(None, sid), Owner::Session(sid));
    }
}
