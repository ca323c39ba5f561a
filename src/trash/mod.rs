// 回收站（软删除）模块
//
// 把破坏性删除推迟到可恢复的暂存区：软删除把内容移入暂存目录并
// 写入边车元数据，恢复做逆向移动，后台清扫按保留窗口永久回收

mod codec;
mod inventory;
mod janitor;
mod registry;
mod relocator;
mod types;

pub use inventory::list_trash;
pub use janitor::{Janitor, SweepStats};
pub use registry::{EntryGuard, EntryLocks};
pub use relocator::Relocator;
pub use types::{TrashEntry, TrashError, TrashErrorCode, TrashListing};

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::TrashConfig;
use crate::filesystem::PathGuard;

/// 回收站服务
///
/// 显式持有回收站全部状态（守卫、占用注册表、清扫器）的服务对象，
/// 进程启动时构造一次，以 Arc 传给各请求处理器
pub struct TrashService {
    /// 沙箱路径守卫
    guard: Arc<PathGuard>,
    /// 软删除执行器
    relocator: Relocator,
    /// 后台清扫器
    janitor: Mutex<Janitor>,
}

impl TrashService {
    /// 创建回收站服务，暂存目录不存在时创建
    pub fn new(root_dir: impl AsRef<Path>, config: &TrashConfig) -> Result<Self, TrashError> {
        let guard = Arc::new(PathGuard::new(root_dir.as_ref()));
        let trash_root = guard.root().join(&config.folder);
        let locks = EntryLocks::new();

        let relocator = Relocator::new(Arc::clone(&guard), trash_root.clone(), locks.clone())?;
        let janitor = Janitor::new(
            trash_root,
            config.retention(),
            config.sweep_interval(),
            locks,
        );

        Ok(Self {
            guard,
            relocator,
            janitor: Mutex::new(janitor),
        })
    }

    /// 沙箱路径守卫（供其他子系统共用）
    pub fn guard(&self) -> &Arc<PathGuard> {
        &self.guard
    }

    /// 暂存目录路径
    pub fn trash_root(&self) -> &Path {
        self.relocator.trash_root()
    }

    /// 软删除沙箱内的文件或目录
    pub fn soft_delete(&self, original_path: &str) -> Result<(), TrashError> {
        self.relocator.soft_delete(original_path)
    }

    /// 把暂存条目恢复到原始位置
    pub fn restore(&self, staged_name: &str) -> Result<(), TrashError> {
        self.relocator.restore(staged_name)
    }

    /// 列出当前回收站内容
    pub fn list_trash(&self) -> TrashListing {
        inventory::list_trash(self.relocator.trash_root())
    }

    /// 清空回收站
    pub fn empty_all(&self) -> Result<(), TrashError> {
        self.relocator.empty_all()
    }

    /// 启动后台清扫循环（进程启动时调用一次）
    pub fn start_janitor(&self) {
        self.lock_janitor().start();
    }

    /// 立即执行一次清扫
    pub fn sweep_now(&self) -> SweepStats {
        self.lock_janitor().sweep_once()
    }

    /// 停止后台清扫，进程可以干净退出
    pub fn shutdown(&self) {
        self.lock_janitor().stop();
    }

    fn lock_janitor(&self) -> std::sync::MutexGuard<'_, Janitor> {
        self.janitor.lock().unwrap_or_else(|e| e.into_inner())
    }
}
