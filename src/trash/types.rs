// 回收站模块数据类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filesystem::FsError;

/// 回收站条目元数据（以边车文件形式持久化，每个暂存项一份）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    /// 删除前相对于沙箱根目录的路径
    #[serde(rename = "originalPath")]
    pub original_path: String,
    /// 软删除时间（ISO-8601），清扫时作为回收时钟
    #[serde(rename = "deletedAt")]
    pub deleted_at: DateTime<Utc>,
    /// 暂存目录内的唯一名称
    #[serde(rename = "filename")]
    pub staged_name: String,
}

/// 回收站列表结果
///
/// 无法解析的边车文件按名称单独上报，而不是静默丢弃
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrashListing {
    /// 可解析的条目（枚举顺序，不保证按时间排序）
    pub entries: Vec<TrashEntry>,
    /// 元数据损坏的暂存名
    pub corrupt: Vec<String>,
}

/// 回收站错误码
/// 错误码范围：51001 - 51099
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashErrorCode {
    /// 源路径或暂存内容不存在
    NotFound = 51001,
    /// 恢复时边车元数据缺失
    MetadataNotFound = 51002,
    /// 边车元数据存在但无法解析
    MetadataCorrupt = 51003,
    /// 文件系统操作失败
    IoError = 51004,
    /// 暂存名非法（包含路径分隔符等）
    InvalidStagedName = 51005,
    /// 恢复目标位置已被占用
    DestinationOccupied = 51006,
    /// 路径未通过沙箱守卫校验
    PathRejected = 51007,
    /// 条目正被其他操作占用
    EntryBusy = 51008,
}

impl TrashErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "源路径或暂存内容不存在",
            Self::MetadataNotFound => "暂存条目的元数据不存在",
            Self::MetadataCorrupt => "暂存条目的元数据无法解析",
            Self::IoError => "文件系统操作失败",
            Self::InvalidStagedName => "暂存名非法",
            Self::DestinationOccupied => "恢复目标位置已被占用",
            Self::PathRejected => "路径未通过沙箱校验",
            Self::EntryBusy => "条目正被其他操作占用",
        }
    }
}

/// 回收站错误
#[derive(Debug)]
pub struct TrashError {
    pub code: TrashErrorCode,
    pub message: String,
    pub path: Option<String>,
}

impl TrashError {
    pub fn new(code: TrashErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 将底层 IO 错误映射为回收站错误
    ///
    /// NotFound 单独映射，便于调用方区分"不存在"和"操作失败"
    pub fn from_io(err: std::io::Error) -> Self {
        let code = if err.kind() == std::io::ErrorKind::NotFound {
            TrashErrorCode::NotFound
        } else {
            TrashErrorCode::IoError
        };
        Self::new(code).with_message(format!("{}: {}", code.message(), err))
    }
}

impl std::fmt::Display for TrashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {}", self.message, path)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for TrashError {}

impl From<FsError> for TrashError {
    fn from(err: FsError) -> Self {
        let mut mapped = TrashError::new(TrashErrorCode::PathRejected).with_message(err.to_string());
        mapped.path = err.path;
        mapped
    }
}
