pub mod directory;
pub mod scheduler;
pub mod service;
pub mod session;
