/// Router Module Index
///
/// Splits the API by access level. Every router here is merged under the
/// authentication layer in `create_router`; the split decides what else
/// wraps a route on top of it.

/// Routes listed in `auth::PUBLIC_PATHS`: reachable without a token.
pub mod public;

/// Routes any identified user may call.
pub mod authenticated;

/// Routes additionally gated on the `admin` role.
pub mod admin;
