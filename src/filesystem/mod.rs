// 路径安全模块
//
// 提供沙箱路径守卫，所有文件操作的路径都必须经过守卫校验

mod guard;
mod types;

pub use guard::PathGuard;
pub use types::{FsError, FsErrorCode};
