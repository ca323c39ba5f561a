// 路径安全守卫
//
// 提供路径安全检查功能，防止路径穿越攻击

use std::path::{Component, Path, PathBuf};

use super::types::{FsError, FsErrorCode};

/// 路径安全守卫
///
/// 持有沙箱根目录，所有相对路径都解析到根目录之下
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// 创建新的路径守卫
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize_lexically(&root_dir.into()),
        }
    }

    /// 沙箱根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 检查绝对路径是否位于沙箱根目录之下
    ///
    /// 路径不要求存在（恢复目标可能尚未创建），因此使用词法规范化
    /// 而不是 canonicalize
    pub fn is_safe(&self, path: &Path) -> bool {
        normalize_lexically(path).starts_with(&self.root)
    }

    /// 将相对路径解析为沙箱内的绝对路径（防止 ../ 穿越）
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, FsError> {
        if relative.is_empty() {
            return Err(FsError::new(FsErrorCode::InvalidPathFormat));
        }

        // 检查是否包含可疑的穿越序列
        if self.contains_traversal(relative) {
            return Err(FsError::new(FsErrorCode::PathTraversalDetected).with_path(relative));
        }

        // 只接受相对路径
        let rel = Path::new(relative);
        if rel.is_absolute() {
            return Err(FsError::new(FsErrorCode::InvalidPathFormat).with_path(relative));
        }

        let resolved = normalize_lexically(&self.root.join(rel));
        if !self.is_safe(&resolved) {
            return Err(FsError::new(FsErrorCode::PathNotAllowed).with_path(relative));
        }

        Ok(resolved)
    }

    /// 检查路径是否包含穿越序列
    fn contains_traversal(&self, path: &str) -> bool {
        // 检查常见的穿越模式
        let patterns = [
            "..",
            "%2e%2e",     // URL 编码
            "%252e%252e", // 双重 URL 编码
        ];

        let path_lower = path.to_lowercase();
        for pattern in &patterns {
            if path_lower.contains(pattern) {
                return true;
            }
        }

        false
    }
}

/// 词法规范化路径（消去 `.` 和 `..` 分量，不访问文件系统）
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
