//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出 (可选)
//! - Dispatcher 投递指标记录
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! // FANOUT_LOG_FORMAT / FANOUT_METRICS_PORT 可覆盖默认值
//! init_with_config(ObservabilityConfig::from_env()?)?;
//! observability::metrics::record_write_accepted(WriteMode::Buffered, payload.len());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_metrics, record_pass_completed, record_pass_failed, record_queue_depth,
    record_write_accepted, record_write_rejected,
};

/// 初始化可观测性（默认配置：JSON 日志，不导出指标）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别 (RUST_LOG 优先)
    pub default_log_level: String,
}

impl ObservabilityConfig {
    /// 从环境变量覆盖默认值
    ///
    /// - `FANOUT_LOG_FORMAT`: json | pretty | compact
    /// - `FANOUT_METRICS_PORT`: Prometheus 端口
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(format) = std::env::var("FANOUT_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format)
                .with_context(|| format!("unknown FANOUT_LOG_FORMAT '{format}'"))?;
        }
        if let Ok(port) = std::env::var("FANOUT_METRICS_PORT") {
            config.metrics_port = Some(
                port.parse()
                    .with_context(|| format!("invalid FANOUT_METRICS_PORT '{port}'"))?,
            );
        }
        Ok(config)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl LogFormat {
    /// 从字符串解析 (不区分大小写)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        // 投递事件都在 fanout_pass / delivery_worker_loop span 内，JSON 中保留当前 span
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 安装 Prometheus exporter 并注册 `fanout_*` 指标说明
///
/// Tracing 已由调用方初始化时单独使用。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
