// 软删除与恢复
//
// 软删除 = 写入边车元数据 + 把内容移入暂存目录；恢复为其逆操作。
// 原始实现先写正式元数据再移动内容，移动失败会留下孤儿元数据；
// 这里改为临时名元数据 + 内容移动 + 元数据改名三步，任何一步失败
// 都回滚到调用前的状态

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::filesystem::PathGuard;

use super::codec;
use super::registry::EntryLocks;
use super::types::{TrashEntry, TrashError, TrashErrorCode};

/// 软删除执行器
pub struct Relocator {
    /// 沙箱路径守卫
    guard: Arc<PathGuard>,
    /// 暂存目录（位于沙箱根目录下）
    trash_root: PathBuf,
    /// 条目占用注册表（与清扫共享）
    locks: EntryLocks,
}

impl Relocator {
    /// 创建软删除执行器，暂存目录不存在时创建
    pub fn new(
        guard: Arc<PathGuard>,
        trash_root: PathBuf,
        locks: EntryLocks,
    ) -> Result<Self, TrashError> {
        fs::create_dir_all(&trash_root).map_err(|e| {
            TrashError::new(TrashErrorCode::IoError)
                .with_message(format!("创建暂存目录失败: {}", e))
                .with_path(trash_root.to_string_lossy().to_string())
        })?;

        Ok(Self {
            guard,
            trash_root,
            locks,
        })
    }

    /// 暂存目录路径
    pub fn trash_root(&self) -> &Path {
        &self.trash_root
    }

    /// 软删除：把沙箱内的文件或目录移入暂存目录
    ///
    /// 失败时源路径保持原状，暂存目录不残留半成品
    pub fn soft_delete(&self, original_path: &str) -> Result<(), TrashError> {
        let source = self.guard.resolve(original_path)?;

        fs::symlink_metadata(&source)
            .map_err(|e| TrashError::from_io(e).with_path(original_path))?;

        let base_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                TrashError::new(TrashErrorCode::PathRejected).with_path(original_path)
            })?;

        let deleted_at = Utc::now();
        let nanos = deleted_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| deleted_at.timestamp_millis().saturating_mul(1_000_000));
        let staged_name = codec::resolve_staged_name(&self.trash_root, &base_name, nanos);

        // 占用暂存名，阻止清扫在删除进行中触碰该条目
        let _entry_lock = self.locks.try_acquire(&staged_name).ok_or_else(|| {
            TrashError::new(TrashErrorCode::EntryBusy).with_path(staged_name.clone())
        })?;

        let entry = TrashEntry {
            original_path: original_path.to_string(),
            deleted_at,
            staged_name: staged_name.clone(),
        };
        let serialized = codec::encode(&entry)?;

        // 1. 元数据先落盘到临时名，此时内容尚未移动，失败无副作用
        let tmp_sidecar = codec::sidecar_tmp_path(&self.trash_root, &staged_name);
        fs::write(&tmp_sidecar, serialized).map_err(|e| {
            TrashError::new(TrashErrorCode::IoError)
                .with_message(format!("写入元数据失败: {}", e))
                .with_path(staged_name.clone())
        })?;

        // 2. 移动内容
        let content = codec::content_path(&self.trash_root, &staged_name);
        if let Err(e) = fs::rename(&source, &content) {
            let _ = fs::remove_file(&tmp_sidecar);
            return Err(TrashError::from_io(e).with_path(original_path));
        }

        // 3. 元数据改名就位，完成整个逻辑删除
        let sidecar = codec::sidecar_path(&self.trash_root, &staged_name);
        if let Err(e) = fs::rename(&tmp_sidecar, &sidecar) {
            // 把内容移回原处，整体回滚
            if let Err(undo) = fs::rename(&content, &source) {
                tracing::error!(
                    "元数据就位失败且内容回滚失败，暂存目录残留孤儿内容 {}: {} / {}",
                    staged_name,
                    e,
                    undo
                );
            }
            let _ = fs::remove_file(&tmp_sidecar);
            return Err(TrashError::new(TrashErrorCode::IoError)
                .with_message(format!("元数据就位失败: {}", e))
                .with_path(staged_name));
        }

        tracing::info!("软删除完成: {} -> {}", original_path, staged_name);
        Ok(())
    }

    /// 恢复：把暂存条目移回原始位置并删除其元数据
    ///
    /// 目标位置已被占用时拒绝恢复，条目原样保留，调用方处理后可重试
    pub fn restore(&self, staged_name: &str) -> Result<(), TrashError> {
        codec::validate_staged_name(staged_name)?;

        let _entry_lock = self.locks.try_acquire(staged_name).ok_or_else(|| {
            TrashError::new(TrashErrorCode::EntryBusy).with_path(staged_name)
        })?;

        let entry = codec::read_sidecar(&self.trash_root, staged_name)?;

        let destination = self.guard.resolve(&entry.original_path)?;
        if destination.symlink_metadata().is_ok() {
            return Err(TrashError::new(TrashErrorCode::DestinationOccupied)
                .with_path(entry.original_path));
        }

        // 原始父目录可能在条目暂存期间被删除，按需重建
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TrashError::new(TrashErrorCode::IoError)
                    .with_message(format!("重建父目录失败: {}", e))
                    .with_path(entry.original_path.clone())
            })?;
        }

        // 移动失败时元数据保持不动，操作可重试
        let content = codec::content_path(&self.trash_root, staged_name);
        fs::rename(&content, &destination)
            .map_err(|e| TrashError::from_io(e).with_path(staged_name))?;

        let sidecar = codec::sidecar_path(&self.trash_root, staged_name);
        if let Err(e) = fs::remove_file(&sidecar) {
            // 内容已恢复，孤儿边车留给清扫回收
            tracing::warn!("恢复后删除元数据失败: {}: {}", staged_name, e);
        }

        tracing::info!("恢复完成: {} -> {}", staged_name, entry.original_path);
        Ok(())
    }

    /// 清空回收站：整体删除暂存目录后重建
    pub fn empty_all(&self) -> Result<(), TrashError> {
        match fs::remove_dir_all(&self.trash_root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(TrashError::new(TrashErrorCode::IoError)
                    .with_message(format!("清空暂存目录失败: {}", e)));
            }
        }

        fs::create_dir_all(&self.trash_root).map_err(|e| {
            TrashError::new(TrashErrorCode::IoError)
                .with_message(format!("重建暂存目录失败: {}", e))
        })?;

        tracing::info!("回收站已清空");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trash::inventory;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Relocator) {
        let root = tempdir().unwrap();
        let guard = Arc::new(PathGuard::new(root.path()));
        let trash_root = root.path().join(".trash");
        let relocator = Relocator::new(guard, trash_root, EntryLocks::new()).unwrap();
        (root, relocator)
    }

    fn write_file(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_soft_delete_file() {
        let (root, relocator) = setup();
        write_file(root.path(), "docs/report.txt", b"quarterly numbers");

        relocator.soft_delete("docs/report.txt").unwrap();

        // 原始位置不再存在
        assert!(!root.path().join("docs/report.txt").exists());

        // 暂存目录中恰好有一个条目指向原路径
        let listing = inventory::list_trash(relocator.trash_root());
        assert_eq!(listing.entries.len(), 1);
        assert!(listing.corrupt.is_empty());

        let entry = &listing.entries[0];
        assert_eq!(entry.original_path, "docs/report.txt");
        assert!(entry.staged_name.starts_with("report.txt_"));

        // 内容与元数据通过暂存名关联
        let content = relocator.trash_root().join(&entry.staged_name);
        assert_eq!(fs::read(content).unwrap(), b"quarterly numbers");

        // 临时元数据不残留
        assert!(!relocator
            .trash_root()
            .join(format!("{}.json.tmp", entry.staged_name))
            .exists());
    }

    #[test]
    fn test_soft_delete_missing_source() {
        let (_root, relocator) = setup();

        let err = relocator.soft_delete("docs/missing.txt").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::NotFound);

        // 失败的软删除不在暂存目录留下任何东西
        let listing = inventory::list_trash(relocator.trash_root());
        assert!(listing.entries.is_empty());
    }

    #[test]
    fn test_soft_delete_rejects_traversal() {
        let (_root, relocator) = setup();
        let err = relocator.soft_delete("../outside.txt").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::PathRejected);
    }

    #[test]
    fn test_soft_delete_directory_tree() {
        let (root, relocator) = setup();
        write_file(root.path(), "photos/2026/a.jpg", b"aa");
        write_file(root.path(), "photos/2026/b.jpg", b"bb");

        relocator.soft_delete("photos").unwrap();
        assert!(!root.path().join("photos").exists());

        let listing = inventory::list_trash(relocator.trash_root());
        assert_eq!(listing.entries.len(), 1);
        let staged = relocator.trash_root().join(&listing.entries[0].staged_name);
        assert!(staged.join("2026/a.jpg").exists());
        assert!(staged.join("2026/b.jpg").exists());
    }

    #[test]
    fn test_restore_roundtrip() {
        let (root, relocator) = setup();
        write_file(root.path(), "docs/report.txt", b"quarterly numbers");

        relocator.soft_delete("docs/report.txt").unwrap();
        let listing = inventory::list_trash(relocator.trash_root());
        let staged_name = listing.entries[0].staged_name.clone();

        relocator.restore(&staged_name).unwrap();

        // 内容回到原位且未改变
        let restored = root.path().join("docs/report.txt");
        assert_eq!(fs::read(restored).unwrap(), b"quarterly numbers");

        // 条目连同元数据一并消失
        let listing = inventory::list_trash(relocator.trash_root());
        assert!(listing.entries.is_empty());
        assert!(!relocator.trash_root().join(&staged_name).exists());
    }

    #[test]
    fn test_restore_recreates_missing_parent() {
        let (root, relocator) = setup();
        write_file(root.path(), "docs/report.txt", b"x");

        relocator.soft_delete("docs/report.txt").unwrap();
        // 条目在回收站期间，原目录被整个删除
        fs::remove_dir_all(root.path().join("docs")).unwrap();

        let listing = inventory::list_trash(relocator.trash_root());
        relocator.restore(&listing.entries[0].staged_name).unwrap();

        assert!(root.path().join("docs/report.txt").exists());
    }

    #[test]
    fn test_restore_invalid_staged_name() {
        let (_root, relocator) = setup();

        let err = relocator.restore("../escape").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::InvalidStagedName);

        let err = relocator.restore("a/b_123").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::InvalidStagedName);
    }

    #[test]
    fn test_restore_metadata_not_found() {
        let (_root, relocator) = setup();

        // 孤儿内容：有内容无边车
        fs::write(relocator.trash_root().join("a.txt_100"), b"x").unwrap();

        let err = relocator.restore("a.txt_100").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::MetadataNotFound);
    }

    #[test]
    fn test_restore_metadata_corrupt() {
        let (_root, relocator) = setup();

        fs::write(relocator.trash_root().join("a.txt_100"), b"x").unwrap();
        fs::write(relocator.trash_root().join("a.txt_100.json"), b"not json").unwrap();

        let err = relocator.restore("a.txt_100").unwrap_err();
        assert_eq!(err.code, TrashErrorCode::MetadataCorrupt);
    }

    #[test]
    fn test_restore_destination_occupied() {
        let (root, relocator) = setup();
        write_file(root.path(), "docs/report.txt", b"old");

        relocator.soft_delete("docs/report.txt").unwrap();
        let staged_name = inventory::list_trash(relocator.trash_root()).entries[0]
            .staged_name
            .clone();

        // 原位置被新文件占用
        write_file(root.path(), "docs/report.txt", b"new");

        let err = relocator.restore(&staged_name).unwrap_err();
        assert_eq!(err.code, TrashErrorCode::DestinationOccupied);

        // 拒绝恢复时条目原样保留，可在解决冲突后重试
        assert!(relocator.trash_root().join(&staged_name).exists());
        assert_eq!(
            inventory::list_trash(relocator.trash_root()).entries.len(),
            1
        );
        assert_eq!(fs::read(root.path().join("docs/report.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_restore_entry_busy() {
        let (root, _) = setup();
        let guard = Arc::new(PathGuard::new(root.path()));
        let locks = EntryLocks::new();
        let relocator =
            Relocator::new(guard, root.path().join(".trash"), locks.clone()).unwrap();

        write_file(root.path(), "a.txt", b"x");
        relocator.soft_delete("a.txt").unwrap();
        let staged_name = inventory::list_trash(relocator.trash_root()).entries[0]
            .staged_name
            .clone();

        // 模拟另一个操作正持有该条目
        let _held = locks.try_acquire(&staged_name).unwrap();

        let err = relocator.restore(&staged_name).unwrap_err();
        assert_eq!(err.code, TrashErrorCode::EntryBusy);
    }

    #[test]
    fn test_empty_all() {
        let (root, relocator) = setup();
        write_file(root.path(), "a.txt", b"x");
        write_file(root.path(), "b.txt", b"y");
        relocator.soft_delete("a.txt").unwrap();
        relocator.soft_delete("b.txt").unwrap();

        relocator.empty_all().unwrap();

        // 暂存目录被重建且为空
        assert!(relocator.trash_root().is_dir());
        let listing = inventory::list_trash(relocator.trash_root());
        assert!(listing.entries.is_empty());
        assert!(listing.corrupt.is_empty());
    }

    #[test]
    fn test_same_base_name_twice() {
        let (root, relocator) = setup();

        // 同名文件先后两次删除，即使时间戳碰撞也必须产生两个条目
        write_file(root.path(), "a.txt", b"first");
        relocator.soft_delete("a.txt").unwrap();
        write_file(root.path(), "a.txt", b"second");
        relocator.soft_delete("a.txt").unwrap();

        let listing = inventory::list_trash(relocator.trash_root());
        assert_eq!(listing.entries.len(), 2);
        let names: Vec<_> = listing.entries.iter().map(|e| &e.staged_name).collect();
        assert_ne!(names[0], names[1]);
    }
}
