// 后台清扫
//
// 周期性枚举暂存目录，把超过保留窗口的条目永久删除。循环由
// 取消令牌控制，单个条目的失败只记录日志，绝不终止循环

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::codec::{self, SIDECAR_SUFFIX, SIDECAR_TMP_SUFFIX};
use super::registry::EntryLocks;

/// 单次清扫统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// 永久删除的条目数
    pub reclaimed: usize,
    /// 仍在保留窗口内的条目数
    pub kept: usize,
    /// 因被其他操作占用而跳过的条目数
    pub skipped: usize,
    /// 处理失败（下次清扫重试）的条目数
    pub failed: usize,
}

/// 回收站清扫器
pub struct Janitor {
    /// 暂存目录
    trash_root: PathBuf,
    /// 保留窗口
    retention: Duration,
    /// 清扫间隔
    interval: Duration,
    /// 条目占用注册表（与前台操作共享）
    locks: EntryLocks,
    /// 取消令牌
    cancel_token: CancellationToken,
    /// 清扫任务句柄
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Janitor {
    /// 创建新的清扫器（不启动）
    pub fn new(
        trash_root: PathBuf,
        retention: Duration,
        interval: Duration,
        locks: EntryLocks,
    ) -> Self {
        Self {
            trash_root,
            retention,
            interval,
            locks,
            cancel_token: CancellationToken::new(),
            handle: None,
        }
    }

    /// 启动后台清扫循环
    ///
    /// 首次清扫延迟一个完整间隔，让服务先完成启动再做清扫 I/O
    pub fn start(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("清扫循环已在运行，忽略重复启动");
            return;
        }

        let trash_root = self.trash_root.clone();
        let retention = self.retention;
        let interval = self.interval;
        let locks = self.locks.clone();
        let cancel_token = self.cancel_token.child_token();

        let handle = tokio::spawn(async move {
            tracing::info!(
                "清扫循环已启动: 间隔={:?}, 保留窗口={:?}",
                interval,
                retention
            );
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let stats = sweep(&trash_root, retention, &locks);
                        tracing::info!(
                            "清扫完成: 回收={}, 保留={}, 跳过={}, 失败={}",
                            stats.reclaimed,
                            stats.kept,
                            stats.skipped,
                            stats.failed
                        );
                    }
                    _ = cancel_token.cancelled() => {
                        tracing::info!("清扫循环已取消");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
    }

    /// 立即执行一次清扫（不影响后台循环的节奏）
    pub fn sweep_once(&self) -> SweepStats {
        sweep(&self.trash_root, self.retention, &self.locks)
    }

    /// 清扫循环是否在运行
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// 停止后台清扫循环
    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("清扫任务已停止");
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 执行一次清扫
///
/// 逐条目处理：元数据可解析时以 deleted_at 为回收时钟；元数据
/// 缺失或损坏时退回到内容自身的修改时间，保证无元数据的条目
/// 不会被永远保留。半成品临时元数据和孤儿边车按自身修改时间
/// 回收。任何单条目错误都只记录并跳过
pub(crate) fn sweep(trash_root: &Path, retention: Duration, locks: &EntryLocks) -> SweepStats {
    let mut stats = SweepStats::default();

    let read_dir = match fs::read_dir(trash_root) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            tracing::warn!("清扫读取暂存目录失败: {:?}: {}", trash_root, e);
            return stats;
        }
    };

    let now = Utc::now();

    for entry in read_dir.filter_map(|entry| entry.ok()) {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        // 半成品临时元数据：软删除中途失败的残留
        if name.ends_with(SIDECAR_TMP_SUFFIX) {
            if mtime_age(&entry.path()).map_or(false, |age| age > retention) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => {
                        tracing::info!("清扫回收残留的临时元数据: {}", name);
                        stats.reclaimed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("删除临时元数据失败: {}: {}", name, e);
                        stats.failed += 1;
                    }
                }
            }
            continue;
        }

        // 边车文件：有对应内容的随内容一起处理；孤儿边车单独回收
        if let Some(staged_name) = name.strip_suffix(SIDECAR_SUFFIX) {
            let has_content = codec::content_path(trash_root, staged_name)
                .symlink_metadata()
                .is_ok();
            if !has_content && mtime_age(&entry.path()).map_or(false, |age| age > retention) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => {
                        tracing::info!("清扫回收孤儿元数据: {}", name);
                        stats.reclaimed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("删除孤儿元数据失败: {}: {}", name, e);
                        stats.failed += 1;
                    }
                }
            }
            continue;
        }

        // 内容条目
        let staged_name = name;
        let Some(_entry_lock) = locks.try_acquire(staged_name) else {
            // 该条目正被恢复等操作占用，下次清扫再处理
            tracing::debug!("条目被占用，跳过清扫: {}", staged_name);
            stats.skipped += 1;
            continue;
        };

        let expired = match codec::read_sidecar(trash_root, staged_name) {
            Ok(meta) => now
                .signed_duration_since(meta.deleted_at)
                .to_std()
                .map(|age| age > retention)
                .unwrap_or(false),
            Err(e) => {
                // 元数据不可用，退回到内容的修改时间作为替代时钟
                tracing::debug!("条目元数据不可用，使用修改时间: {}: {}", staged_name, e);
                match mtime_age(&entry.path()) {
                    Ok(age) => age > retention,
                    Err(e) => {
                        tracing::warn!("读取条目修改时间失败: {}: {}", staged_name, e);
                        stats.failed += 1;
                        continue;
                    }
                }
            }
        };

        if !expired {
            stats.kept += 1;
            continue;
        }

        // 永久删除内容与边车
        let content_path = entry.path();
        let remove_result = if content_path.is_dir() {
            fs::remove_dir_all(&content_path)
        } else {
            fs::remove_file(&content_path)
        };
        if let Err(e) = remove_result {
            tracing::warn!("删除过期内容失败: {}: {}", staged_name, e);
            stats.failed += 1;
            continue;
        }

        let sidecar = codec::sidecar_path(trash_root, staged_name);
        if let Err(e) = fs::remove_file(&sidecar) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("删除过期条目的元数据失败: {}: {}", staged_name, e);
            }
        }

        tracing::info!("清扫回收过期条目: {}", staged_name);
        stats.reclaimed += 1;
    }

    stats
}

/// 文件自身修改时间距今的时长（修改时间在未来时视为 0）
fn mtime_age(path: &Path) -> std::io::Result<Duration> {
    let modified = path.symlink_metadata()?.modified()?;
    Ok(modified.elapsed().unwrap_or_default())
}
