pub mod cache_invalidator;
pub mod http_cache_invalidator;
