/// Router Module Index
///
/// Routes are split by the access they require. Authentication is applied
/// as a layer around whole routers in `create_router`; the admin role is
/// checked inside each admin handler.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the `AuthUser` extractor.
pub mod authenticated;

/// Moderation routes, nested under `/admin`.
pub mod admin;
