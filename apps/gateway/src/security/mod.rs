// Request guards shared by the enhancement and PDF endpoints:
// HMAC signatures, origin allow-listing, client IP resolution and rate limits.

pub mod client_ip;
pub mod origin;
pub mod rate_limit;
pub mod signature;
