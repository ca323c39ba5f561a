// 路径安全模块数据类型定义

/// 路径错误码
/// 错误码范围：50001 - 50099
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorCode {
    /// 路径不在沙箱内
    PathNotAllowed = 50001,
    /// 路径穿越攻击
    PathTraversalDetected = 50002,
    /// 路径格式无效
    InvalidPathFormat = 50003,
    /// 文件不存在
    FileNotFound = 50004,
}

impl FsErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::PathNotAllowed => "路径不在允许访问的范围内",
            Self::PathTraversalDetected => "检测到路径穿越攻击",
            Self::InvalidPathFormat => "路径格式无效",
            Self::FileNotFound => "文件不存在",
        }
    }
}

/// 路径错误
#[derive(Debug)]
pub struct FsError {
    pub code: FsErrorCode,
    pub message: String,
    pub path: Option<String>,
}

impl FsError {
    pub fn new(code: FsErrorCode) -> Self {
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
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {}", self.message, path)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for FsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_code() {
        assert_eq!(FsErrorCode::PathNotAllowed.code(), 50001);
        assert_eq!(FsErrorCode::PathTraversalDetected.code(), 50002);
        assert_eq!(FsErrorCode::FileNotFound.code(), 50004);
    }

    #[test]
    fn test_fs_error() {
        let err = FsError::new(FsErrorCode::PathNotAllowed).with_path("/etc/passwd");
        assert_eq!(err.code, FsErrorCode::PathNotAllowed);
        assert!(err.path.is_some());
        assert!(err.to_string().contains("/etc/passwd"));
    }
}
