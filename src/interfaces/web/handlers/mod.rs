pub mod agenda;
pub mod agents;
pub mod health;
pub mod meetings;
pub mod technical;
