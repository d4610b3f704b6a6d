//! 核心层：错误分类、优雅关闭

pub mod error;
pub mod shutdown;

pub use error::{sanitize_detail, BotError};
pub use shutdown::{CleanupReport, ShutdownCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason};
