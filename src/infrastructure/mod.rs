pub mod cache;
pub mod delivery;
pub mod repositories;
