pub mod refresh;
pub mod snapshot;

pub use refresh::Dashboard;
pub use snapshot::DashboardSnapshot;
