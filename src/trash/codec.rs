// 元数据编解码
//
// 负责边车元数据文件的序列化/反序列化，以及暂存名的生成

use std::path::{Path, PathBuf};

use super::types::{TrashEntry, TrashError, TrashErrorCode};

/// 边车元数据文件后缀
pub const SIDECAR_SUFFIX: &str = ".json";

/// 边车元数据临时文件后缀（内容移动成功后才改名为正式后缀）
pub const SIDECAR_TMP_SUFFIX: &str = ".json.tmp";

/// 暂存内容路径
pub fn content_path(trash_root: &Path, staged_name: &str) -> PathBuf {
    trash_root.join(staged_name)
}

/// 边车元数据路径
pub fn sidecar_path(trash_root: &Path, staged_name: &str) -> PathBuf {
    trash_root.join(format!("{}{}", staged_name, SIDECAR_SUFFIX))
}

/// 边车元数据临时路径
pub fn sidecar_tmp_path(trash_root: &Path, staged_name: &str) -> PathBuf {
    trash_root.join(format!("{}{}", staged_name, SIDECAR_TMP_SUFFIX))
}

/// 序列化元数据
///
/// 使用带缩进的 JSON，便于直接查看暂存目录排查问题
pub fn encode(entry: &TrashEntry) -> Result<String, TrashError> {
    serde_json::to_string_pretty(entry).map_err(|e| {
        TrashError::new(TrashErrorCode::IoError).with_message(format!("序列化元数据失败: {}", e))
    })
}

/// 反序列化元数据
pub fn decode(content: &str) -> Result<TrashEntry, TrashError> {
    serde_json::from_str(content).map_err(|e| {
        TrashError::new(TrashErrorCode::MetadataCorrupt).with_message(format!("解析元数据失败: {}", e))
    })
}

/// 读取并解析边车元数据
pub fn read_sidecar(trash_root: &Path, staged_name: &str) -> Result<TrashEntry, TrashError> {
    let path = sidecar_path(trash_root, staged_name);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrashError::new(TrashErrorCode::MetadataNotFound).with_path(staged_name)
        } else {
            TrashError::from_io(e).with_path(staged_name)
        }
    })?;
    decode(&content).map_err(|e| e.with_path(staged_name))
}

/// 生成暂存名：`<原始文件名>_<删除时间纳秒>`
pub fn staged_name_for(base_name: &str, timestamp_nanos: i64) -> String {
    format!("{}_{}", base_name, timestamp_nanos)
}

/// 生成不冲突的暂存名
///
/// 同名文件在同一纳秒内被删除两次会产生相同的暂存名，此时
/// 递增纳秒分量直到内容槽位和元数据槽位都空闲，保证第二次
/// 删除仍能成功且不覆盖已有条目
pub fn resolve_staged_name(trash_root: &Path, base_name: &str, timestamp_nanos: i64) -> String {
    let mut nanos = timestamp_nanos;
    loop {
        let candidate = staged_name_for(base_name, nanos);
        let content_taken = content_path(trash_root, &candidate).symlink_metadata().is_ok();
        let sidecar_taken = sidecar_path(trash_root, &candidate).symlink_metadata().is_ok();
        if !content_taken && !sidecar_taken {
            return candidate;
        }
        nanos += 1;
    }
}

/// 校验暂存名
///
/// 暂存名由本系统生成，永远不含路径分隔符；外部传入的名称必须
/// 在这里再次拒绝，防止经由恢复接口穿越暂存目录
pub fn validate_staged_name(staged_name: &str) -> Result<(), TrashError> {
    if staged_name.is_empty()
        || staged_name == "."
        || staged_name == ".."
        || staged_name.contains('/')
        || staged_name.contains('\\')
    {
        return Err(TrashError::new(TrashErrorCode::InvalidStagedName).with_path(staged_name));
    }
    Ok(())
}
