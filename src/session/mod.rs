//! 会话层：每个用户的凭据与工作流步骤

pub mod registry;
pub mod state;

pub use registry::SessionRegistry;
pub use state::{Credentials, Step, UserId, UserSession};
