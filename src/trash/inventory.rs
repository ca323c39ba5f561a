// 回收站清单
//
// 只读枚举暂存目录中的元数据，供展示层使用

use std::path::Path;

use super::codec::{self, SIDECAR_SUFFIX};
use super::types::TrashListing;

/// 列出当前回收站内容
///
/// 逐个解析边车元数据；损坏的条目不进入 entries，但按暂存名记录
/// 在 corrupt 中，供调用方观察数据完整性漂移。暂存目录不存在时
/// 返回空清单
pub fn list_trash(trash_root: &Path) -> TrashListing {
    let mut listing = TrashListing::default();

    let read_dir = match std::fs::read_dir(trash_root) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("读取暂存目录失败: {:?}: {}", trash_root, e);
            }
            return listing;
        }
    };

    for entry in read_dir.filter_map(|entry| entry.ok()) {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(staged_name) = name.strip_suffix(SIDECAR_SUFFIX) else {
            continue;
        };

        match codec::read_sidecar(trash_root, staged_name) {
            Ok(meta) => listing.entries.push(meta),
            Err(e) => {
                tracing::warn!("回收站元数据无法解析: {}: {}", staged_name, e);
                listing.corrupt.push(staged_name.to_string());
            }
        }
    }

    listing
}
