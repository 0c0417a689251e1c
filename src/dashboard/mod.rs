//! Interactive regime dashboard
//!
//! An egui window with a ticker input and window selector driving the cached
//! pipeline. Each interaction recomputes synchronously unless the
//! `(ticker, window)` pair is already cached.

pub mod app;
pub mod state;
pub mod view;

pub use app::{run_dashboard, RegimeDashboardApp};
pub use state::DashboardState;
