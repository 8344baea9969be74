pub mod bus_thread;
pub mod config;
pub mod replay;
pub mod serial;
