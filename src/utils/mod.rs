pub mod progress;
pub mod retry;
