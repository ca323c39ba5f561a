// Web Files Rust Library
// 沙箱文件区核心库：路径守卫与回收站子系统

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 路径安全模块
pub mod filesystem;

// 回收站（软删除）模块
pub mod trash;

// 导出常用类型
pub use config::AppConfig;
pub use filesystem::{FsError, FsErrorCode, PathGuard};
pub use trash::{
    Janitor, Relocator, TrashEntry, TrashError, TrashErrorCode, TrashListing, TrashService,
};
