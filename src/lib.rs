pub mod api_client;
pub mod client;
pub mod config;
pub mod cues;
pub mod dispatch;
pub mod game;
pub mod held;
pub mod high_score;
pub mod router;
pub mod session;
pub mod ui;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
