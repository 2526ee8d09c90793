pub mod db;
pub mod ipc;
pub mod sloper;
pub mod store;
