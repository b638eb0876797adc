pub mod constants;
pub mod shared_upgrade_game;
pub mod validation;
