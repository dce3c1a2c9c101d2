/// Authentication for the HTTP layer
///
/// # Modules
///
/// - [`jwt`]: HS256 access token signing and validation
/// - [`middleware`]: Bearer token checks and the [`middleware::AuthContext`] extractor
///
/// Identity verification against the external provider happens before a
/// token is minted and is not part of this crate.

pub mod jwt;
pub mod middleware;
