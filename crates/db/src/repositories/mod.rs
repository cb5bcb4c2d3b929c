//! Repositories: one unit struct per table, async functions taking a pool.

pub mod dashboard_repo;
pub mod user_repo;

pub use dashboard_repo::DashboardRepo;
pub use user_repo::UserRepo;
