//! 日志系统配置
//!
//! 支持控制台输出和文件持久化（按天滚动）

use crate::config::LogConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 日志守卫
///
/// 持有非阻塞写入器的 guard，确保程序退出前日志被刷新
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// 根据配置决定是否启用文件输出：
/// - enabled = false：仅控制台输出
/// - enabled = true：控制台 + 按天滚动的日志文件
pub fn init_logging(config: &LogConfig) -> LogGuard {
    // 环境变量优先，否则使用配置的级别
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    // 控制台输出层
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()));

    if !config.enabled {
        // 只使用控制台输出
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        info!("日志系统初始化完成（仅控制台输出）");

        return LogGuard { _file_guard: None };
    }

    // 确保日志目录存在
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("创建日志目录失败: {}, 回退到仅控制台输出", e);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
        return LogGuard { _file_guard: None };
    }

    // 按天滚动的日志文件写入器
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "web-files.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // 文件输出层（不带 ANSI 颜色）
    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        "日志系统初始化完成: 目录={:?}, 级别={}",
        config.log_dir, config.level
    );

    LogGuard {
        _file_guard: Some(file_guard),
    }
}
