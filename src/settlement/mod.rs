pub mod executor;
pub mod models;
pub mod outstanding;
pub mod service;
pub mod traits;
pub mod validator;

pub use service::{SettlementOutcome, SettlementService};
