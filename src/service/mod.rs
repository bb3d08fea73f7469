pub mod background_jobs;
pub mod error;
pub mod leaderboard_service;
pub mod notification_service;
pub mod ranking;
pub mod referral;
