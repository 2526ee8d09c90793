pub mod core;
pub mod guide;
pub mod sync;
