//! 健康检测结果数据结构
//!
//! 定义探针的原始结果、严重级别以及分类后的检测结果

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 严重级别枚举
///
/// 变体的声明顺序即全序：`Healthy < Degraded < Unhealthy`，聚合时取最大值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// 正常
    Healthy,
    /// 降级
    Degraded,
    /// 异常
    Unhealthy,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    /// 规范名称，与对外JSON中的 `status` 字符串一致
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Healthy => "Healthy",
            Severity::Degraded => "Degraded",
            Severity::Unhealthy => "Unhealthy",
        }
    }

    /// 判断是否为健康
    pub fn is_healthy(&self) -> bool {
        matches!(self, Severity::Healthy)
    }
}

/// 探针单次调用的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 成功，附带探针自己测得的延迟
    Success(Duration),
    /// 失败，附带原因描述
    Failure(String),
    /// 在预算内未返回
    TimedOut,
}

impl ProbeOutcome {
    /// 创建失败结果
    pub fn failure(reason: impl Into<String>) -> Self {
        ProbeOutcome::Failure(reason.into())
    }

    /// 判断是否成功
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }
}

/// 分类后的单个探针检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 探针名称
    pub name: String,
    /// 严重级别
    pub severity: Severity,
    /// 描述信息
    pub message: String,
    /// 延迟，失败或超时时为零
    #[serde(with = "duration_serde")]
    pub latency: Duration,
}

impl ProbeResult {
    /// 获取延迟（毫秒）
    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

/// Duration序列化模块（毫秒）
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
