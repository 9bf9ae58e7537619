//! FanoutBlueprint - Config Loader 输出
//!
//! 描述一个 dispatcher 实例：队列容量、默认写入模式、以及输出目标列表。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的分发配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatcher 设置
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// 输出目标列表 (按注册顺序)
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

/// Write mode of a single write call.
///
/// `Buffered` writes return once the payload is queued; `Immediate` writes
/// return after every destination has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Queue the payload for the delivery worker
    #[default]
    Buffered,
    /// Deliver synchronously before returning
    Immediate,
}

impl WriteMode {
    /// Lowercase label, used for log fields and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buffered => "buffered",
            Self::Immediate => "immediate",
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher 运行参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// 缓冲队列容量 (满时写入阻塞)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// `write` 使用的默认模式
    #[serde(default)]
    pub default_mode: WriteMode,

    /// 失败通知通道容量
    #[serde(default = "default_failure_channel_capacity")]
    pub failure_channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            default_mode: WriteMode::default(),
            failure_channel_capacity: default_failure_channel_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_failure_channel_capacity() -> usize {
    64
}

/// 输出目标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// 目标名称 (日志与错误中使用)
    pub name: String,

    /// 目标类型
    pub kind: DestinationKind,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl DestinationConfig {
    /// Look up a type-specific parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// 输出目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// 通过 tracing 输出
    Log,
    /// 追加写入文件 (需要 `path` 参数)
    File,
    /// 标准输出
    Stdout,
    /// 标准错误
    Stderr,
}
