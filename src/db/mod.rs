pub mod db;
pub mod error;
pub mod memory;
pub mod query_timeout;
pub mod referraldb;
