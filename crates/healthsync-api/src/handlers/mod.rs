pub mod health;
pub mod measurements;
