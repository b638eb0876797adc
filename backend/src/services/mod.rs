pub mod catalog;
pub mod inventory_authority;
pub mod inventory_service;
pub mod session_broadcaster;
pub mod settlement;
