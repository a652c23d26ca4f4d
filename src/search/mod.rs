pub mod client;
pub mod scheduler;

pub use client::{QBlastClient, QBlastOptions, RemoteSearch};
pub use scheduler::{BatchOptions, BatchResult, BatchScheduler, BatchStream};
