//! 检测快照
//!
//! 一轮检测的不可变结果，以及对外发布的JSON结构

use crate::health::aggregator::Aggregate;
use crate::health::result::{duration_serde, ProbeResult, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 一轮检测的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 本轮检测ID
    pub cycle_id: Uuid,
    /// 按注册顺序排列的检测结果
    pub results: Vec<ProbeResult>,
    /// 整体严重级别
    pub overall_severity: Severity,
    /// 总延迟
    #[serde(with = "duration_serde")]
    pub total_latency: Duration,
    /// 本轮检测开始时间
    pub generated_at: DateTime<Utc>,
}

impl Snapshot {
    /// 由分类结果和聚合结果组装快照
    pub fn assemble(
        results: Vec<ProbeResult>,
        aggregate: Aggregate,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            results,
            overall_severity: aggregate.overall_severity,
            total_latency: aggregate.total_latency,
            generated_at,
        }
    }

    /// 按名称查找结果
    pub fn result(&self, name: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// 获取总延迟（毫秒）
    pub fn total_latency_ms(&self) -> u64 {
        self.total_latency.as_millis() as u64
    }

    /// 转换为对外发布的报告
    pub fn to_report(&self) -> HealthReport {
        HealthReport::from(self)
    }
}

/// 对外发布的检测报告
///
/// 字段名和结构是现有客户端依赖的契约，不能改动。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// 单项检测
    pub checks: Vec<CheckEntry>,
    /// 整体状态
    pub total_status: Severity,
    /// 总响应时间（毫秒）
    pub total_response_time: u64,
}

/// 报告中的单项检测
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckEntry {
    /// 探针名称
    pub name: String,
    /// 状态
    pub status: Severity,
    /// 响应时间（毫秒）
    pub response_time: u64,
}

impl From<&Snapshot> for HealthReport {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            checks: snapshot
                .results
                .iter()
                .map(|r| CheckEntry {
                    name: r.name.clone(),
                    status: r.severity,
                    response_time: r.latency_ms(),
                })
                .collect(),
            total_status: snapshot.overall_severity,
            total_response_time: snapshot.total_latency_ms(),
        }
    }
}

impl HealthReport {
    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
