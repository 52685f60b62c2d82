pub mod service;
pub mod sweep;

pub use service::{DlqService, ResolveResult, StoredEntry, dlq_service};
pub use sweep::{SweepReport, reconcile_once, run_reconciliation_sweep};
