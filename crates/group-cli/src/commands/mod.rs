//! Command implementations for group-cli

pub mod apply;
pub mod check;
pub mod delete;
pub mod reconcile;
pub mod run;
pub mod status;

pub use apply::run_apply;
pub use check::run_check;
pub use delete::run_delete;
pub use reconcile::run_reconcile;
pub use run::run_controller;
pub use status::run_status;
