pub mod leaderboard;
pub mod referrals;
