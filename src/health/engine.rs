//! 健康检测引擎
//!
//! 组合执行器、分类器和聚合器，每轮检测生成一个快照

use crate::health::aggregator::aggregate;
use crate::health::classifier::{classify, ClassifyContext};
use crate::health::executor::{Executor, ExecutorConfig};
use crate::health::probe::CancelSignal;
use crate::health::registry::Registry;
use crate::health::result::ProbeResult;
use crate::health::snapshot::Snapshot;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// 健康检测引擎
///
/// 注册表在构建时移入引擎，之后只读共享，多轮检测之间不做互斥。
#[derive(Debug, Clone)]
pub struct HealthEngine {
    registry: Arc<Registry>,
    executor: Executor,
}

impl HealthEngine {
    /// 创建新的引擎
    ///
    /// # 参数
    /// * `registry` - 已完成注册的探针注册表
    /// * `config` - 执行器配置
    pub fn new(registry: Registry, config: ExecutorConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            executor: Executor::new(config),
        }
    }

    /// 获取注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 获取执行器
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// 执行一轮检测
    pub async fn run_cycle(&self) -> Snapshot {
        self.run_cycle_until(&CancelSignal::never()).await
    }

    /// 执行一轮检测，整轮取消信号触发时返回部分结果
    ///
    /// 未完成的探针在宽限期后记为超时，快照中仍然包含所有探针。
    pub async fn run_cycle_until(&self, shutdown: &CancelSignal) -> Snapshot {
        let generated_at = Utc::now();
        debug!("开始检测轮次，探针数量: {}", self.registry.len());

        let executions = self.executor.execute(&self.registry, shutdown).await;

        let results: Vec<ProbeResult> = self
            .registry
            .descriptors()
            .iter()
            .zip(executions.iter())
            .map(|(descriptor, execution)| {
                let ctx = ClassifyContext {
                    name: &descriptor.name,
                    label: &descriptor.label,
                    healthy_threshold: descriptor.settings.healthy_threshold,
                    budget: execution.budget,
                };
                let result = classify(&ctx, &execution.outcome);
                debug!(
                    "探针 {} 结果 {}，上报延迟 {} ms，实测耗时 {} ms",
                    result.name,
                    result.severity,
                    result.latency_ms(),
                    execution.elapsed.as_millis()
                );
                result
            })
            .collect();

        let aggregate = aggregate(&results);
        let snapshot = Snapshot::assemble(results, aggregate, generated_at);

        info!(
            "检测轮次完成: {} - 整体状态 {}，总响应时间 {} ms",
            snapshot.cycle_id,
            snapshot.overall_severity,
            snapshot.total_latency_ms()
        );

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::{CancelHandle, Probe};
    use crate::health::registry::ProbeSettings;
    use crate::health::result::{ProbeOutcome, Severity};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedProbe(ProbeOutcome);

    #[async_trait]
    impl Probe for FixedProbe {
        async fn check(&self, _cancel: CancelSignal) -> ProbeOutcome {
            self.0.clone()
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl Probe for HangingProbe {
        async fn check(&self, _cancel: CancelSignal) -> ProbeOutcome {
            std::future::pending::<ProbeOutcome>().await
        }
    }

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            default_budget: Duration::from_millis(200),
            grace_period: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_cycle_classifies_and_aggregates() {
        let mut registry = Registry::new();
        registry
            .register(
                "ping-a",
                Arc::new(FixedProbe(ProbeOutcome::Success(Duration::from_millis(50)))),
            )
            .unwrap();
        registry
            .register(
                "ping-b",
                Arc::new(FixedProbe(ProbeOutcome::Success(Duration::from_millis(500)))),
            )
            .unwrap();

        let engine = HealthEngine::new(registry, config());
        let snapshot = engine.run_cycle().await;

        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.results[0].severity, Severity::Healthy);
        assert_eq!(snapshot.results[1].severity, Severity::Degraded);
        assert_eq!(snapshot.overall_severity, Severity::Degraded);
        assert_eq!(snapshot.total_latency_ms(), 550);
    }

    #[tokio::test]
    async fn test_empty_engine_is_healthy() {
        let engine = HealthEngine::new(Registry::new(), config());
        let snapshot = engine.run_cycle().await;

        assert!(snapshot.results.is_empty());
        assert_eq!(snapshot.overall_severity, Severity::Healthy);
        assert_eq!(snapshot.total_latency, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_timeout_message_uses_probe_budget() {
        let mut registry = Registry::new();
        registry
            .register_with_settings(
                "hang",
                Arc::new(HangingProbe),
                ProbeSettings::default().with_budget(Duration::from_millis(30)),
            )
            .unwrap();

        let engine = HealthEngine::new(registry, config());
        let snapshot = engine.run_cycle().await;

        assert_eq!(snapshot.overall_severity, Severity::Unhealthy);
        assert_eq!(snapshot.results[0].message, "hang timed out after budget 30 ms");
    }

    #[tokio::test]
    async fn test_cancelled_cycle_keeps_every_probe() {
        let mut registry = Registry::new();
        registry
            .register(
                "ok",
                Arc::new(FixedProbe(ProbeOutcome::Success(Duration::from_millis(5)))),
            )
            .unwrap();
        registry.register("hang", Arc::new(HangingProbe)).unwrap();

        let engine = HealthEngine::new(
            registry,
            ExecutorConfig {
                default_budget: Duration::from_secs(60),
                grace_period: Duration::from_millis(10),
            },
        );
        let (shutdown, signal) = CancelHandle::new();
        shutdown.cancel();

        let snapshot = engine.run_cycle_until(&signal).await;

        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.results[1].name, "hang");
        assert_eq!(snapshot.results[1].severity, Severity::Unhealthy);
    }

    #[tokio::test]
    async fn test_cycles_produce_distinct_snapshots() {
        let mut registry = Registry::new();
        registry
            .register(
                "ok",
                Arc::new(FixedProbe(ProbeOutcome::Success(Duration::from_millis(5)))),
            )
            .unwrap();
        let engine = HealthEngine::new(registry, config());

        let first = engine.run_cycle().await;
        let second = engine.run_cycle().await;

        assert_ne!(first.cycle_id, second.cycle_id);
        assert!(second.generated_at >= first.generated_at);
        assert_eq!(first.results, second.results);
    }
}
