// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod leaderboard;
pub mod moderation;
pub mod score;
pub mod session;
pub mod store;
pub mod submission;
pub mod web;
