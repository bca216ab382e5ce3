pub mod access;
pub mod copy_service;
pub mod directory_service;
pub mod pending_process_service;
pub mod pnl_service;
pub mod strategy_service;
