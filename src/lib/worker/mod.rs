pub mod api;
pub mod dispatch;
pub mod ledger;
pub mod queue;
pub mod stats;
pub mod types;
pub mod worker;
