pub mod inventory;
pub mod switching;
