pub mod paths;
pub mod retry;
