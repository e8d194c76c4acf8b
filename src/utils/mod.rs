pub mod cron;
pub mod fs_atomic;
pub mod locker;

pub use locker::FileLock;
