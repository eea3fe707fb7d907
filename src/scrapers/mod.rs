//! Site scrapers that drive the rotation manager.
//!
//! A scraper works in two phases:
//!
//! 1. **Indexing**: walk the paginated search results and collect opinion URLs
//! 2. **Fetching**: download each opinion page and write it to disk
//!
//! Every page load goes through
//! [`RotationManager::run_with_rotation`](crate::egress::RotationManager::run_with_rotation)
//! with a success predicate that recognises a real result page, so captcha
//! and block pages count as failures and trigger a proxy rotation.

pub mod scholar;
