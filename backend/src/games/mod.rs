pub mod backend_upgrade_game;
pub mod spin_guard;
