pub mod bets;
pub mod health;
pub mod sessions;
