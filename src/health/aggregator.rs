//! 结果聚合器
//!
//! 把单个探针的结果归约为整体严重级别和总延迟

use crate::health::result::{ProbeResult, Severity};
use std::time::Duration;

/// 聚合结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    /// 整体严重级别
    pub overall_severity: Severity,
    /// 总延迟
    pub total_latency: Duration,
}

/// 聚合所有探针结果
///
/// 整体级别取最大值，空集合视为 `Healthy`；失败和超时的延迟已经是零，不计入总和。
pub fn aggregate(results: &[ProbeResult]) -> Aggregate {
    let overall_severity = results
        .iter()
        .map(|r| r.severity)
        .max()
        .unwrap_or(Severity::Healthy);
    let total_latency = results.iter().map(|r| r.latency).sum();

    Aggregate {
        overall_severity,
        total_latency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, severity: Severity, latency_ms: u64) -> ProbeResult {
        ProbeResult {
            name: name.to_string(),
            severity,
            message: String::new(),
            latency: Duration::from_millis(latency_ms),
        }
    }

    #[test]
    fn test_empty_set_is_healthy() {
        let aggregate = aggregate(&[]);
        assert_eq!(aggregate.overall_severity, Severity::Healthy);
        assert_eq!(aggregate.total_latency, Duration::ZERO);
    }

    #[test]
    fn test_overall_is_max_severity() {
        let results = vec![
            result("a", Severity::Healthy, 10),
            result("b", Severity::Degraded, 400),
            result("c", Severity::Healthy, 20),
        ];
        assert_eq!(aggregate(&results).overall_severity, Severity::Degraded);

        let results = vec![
            result("a", Severity::Unhealthy, 0),
            result("b", Severity::Degraded, 400),
        ];
        assert_eq!(aggregate(&results).overall_severity, Severity::Unhealthy);
    }

    #[test]
    fn test_total_latency_sums_results() {
        let results = vec![
            result("ping-a", Severity::Healthy, 50),
            result("ping-b", Severity::Degraded, 500),
            result("ping-c", Severity::Unhealthy, 0),
        ];
        assert_eq!(aggregate(&results).total_latency, Duration::from_millis(550));
    }
}
