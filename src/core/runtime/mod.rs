pub mod cycle;
pub mod monitor;
pub mod process;
pub mod scheduler;
pub mod session;
pub mod terminal;
pub mod trigger;
pub mod watcher;
