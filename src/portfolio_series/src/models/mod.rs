pub mod account;
pub mod activity;
pub mod bar;
pub mod cash_history;
pub(crate) mod de;
pub mod period;
pub mod position;
