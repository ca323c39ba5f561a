// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 沙箱配置
    pub sandbox: SandboxConfig,
    /// 回收站配置
    #[serde(default)]
    pub trash: TrashConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 沙箱配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// 沙箱根目录（所有文件操作限定在此目录内）
    pub root_dir: PathBuf,
}

/// 回收站配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// 暂存目录名（位于沙箱根目录下）
    #[serde(default = "default_trash_folder")]
    pub folder: String,
    /// 保留天数（超过后由后台清扫永久删除，默认 30 天）
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// 清扫间隔（秒，默认 1 小时）
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_trash_folder() -> String {
    ".trash".to_string()
}

fn default_retention_days() -> u32 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            folder: default_trash_folder(),
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl TrashConfig {
    /// 保留窗口
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days as u64 * 24 * 60 * 60)
    }

    /// 清扫间隔
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // 默认沙箱根目录：当前工作目录 + files
        let root_dir = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("files");

        Self {
            sandbox: SandboxConfig { root_dir },
            trash: TrashConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        // 沙箱根目录必须是绝对路径，否则守卫的包含性检查无意义
        if !config.sandbox.root_dir.is_absolute() {
            anyhow::bail!(
                "配置文件中的沙箱根目录必须是绝对路径: {:?}",
                config.sandbox.root_dir
            );
        }

        Ok(config)
    }

    /// 加载配置文件，失败时使用默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("已加载配置文件: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("加载配置文件失败，使用默认配置: {}", e);
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}
