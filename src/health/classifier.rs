//! 结果分类器
//!
//! 把探针的原始结果映射为带严重级别的检测结果，纯函数，无副作用

use crate::health::result::{ProbeOutcome, ProbeResult, Severity};
use std::time::Duration;

/// 分类所需的探针上下文
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// 探针名称
    pub name: &'a str,
    /// 描述标签
    pub label: &'a str,
    /// 健康阈值
    pub healthy_threshold: Duration,
    /// 本次使用的时间预算
    pub budget: Duration,
}

/// 对单个探针结果进行分类
///
/// - 成功且延迟不超过阈值 → `Healthy`
/// - 成功但延迟超过阈值 → `Degraded`
/// - 失败或超时 → `Unhealthy`，延迟记为零
pub fn classify(ctx: &ClassifyContext<'_>, outcome: &ProbeOutcome) -> ProbeResult {
    let (severity, message, latency) = match outcome {
        ProbeOutcome::Success(latency) if *latency <= ctx.healthy_threshold => (
            Severity::Healthy,
            format!("{} took {} ms.", ctx.label, latency.as_millis()),
            *latency,
        ),
        ProbeOutcome::Success(latency) => (
            Severity::Degraded,
            format!(
                "{} took {} ms, above the healthy threshold of {} ms.",
                ctx.label,
                latency.as_millis(),
                ctx.healthy_threshold.as_millis()
            ),
            *latency,
        ),
        ProbeOutcome::Failure(reason) => (
            Severity::Unhealthy,
            format!("{} failed: {}", ctx.label, reason),
            Duration::ZERO,
        ),
        ProbeOutcome::TimedOut => (
            Severity::Unhealthy,
            format!(
                "{} timed out after budget {} ms",
                ctx.label,
                ctx.budget.as_millis()
            ),
            Duration::ZERO,
        ),
    };

    ProbeResult {
        name: ctx.name.to_string(),
        severity,
        message,
        latency,
    }
}
