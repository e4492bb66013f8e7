pub mod fees;
pub mod money;
pub mod ports;
pub mod protocol;
pub mod transfer;
