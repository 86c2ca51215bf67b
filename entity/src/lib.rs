pub mod audit_log;
pub mod devices;
pub mod imeis;
pub mod search_history;
pub mod users;
