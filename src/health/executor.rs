//! 探针执行器
//!
//! 并发执行注册表中的所有探针，每个探针有独立的时间预算和宽限期，
//! 单个探针失败、挂起或panic都不会影响其他探针

use crate::health::probe::{CancelHandle, CancelSignal};
use crate::health::registry::{ProbeDescriptor, Registry};
use crate::health::result::ProbeOutcome;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, warn};

/// 默认时间预算（毫秒）
pub const DEFAULT_BUDGET_MS: u64 = 5_000;

/// 默认宽限期（毫秒）
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 1_000;

/// 执行器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// 未单独配置预算的探针使用的预算
    pub default_budget: Duration,
    /// 预算耗尽后等待迟到结果的时长
    pub grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_budget: Duration::from_millis(DEFAULT_BUDGET_MS),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }
}

/// 单个探针的执行记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeExecution {
    /// 探针名称
    pub name: String,
    /// 原始结果
    pub outcome: ProbeOutcome,
    /// 实际耗时（从启动到得出结果）
    pub elapsed: Duration,
    /// 使用的时间预算
    pub budget: Duration,
}

/// 探针执行器
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// 创建新的执行器
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// 获取执行器配置
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// 计算探针的时间预算
    pub fn budget_for(&self, descriptor: &ProbeDescriptor) -> Duration {
        descriptor
            .settings
            .budget
            .unwrap_or(self.config.default_budget)
    }

    /// 执行一轮检测
    ///
    /// # 参数
    /// * `registry` - 探针注册表
    /// * `shutdown` - 整轮取消信号，触发后未完成的探针记为超时
    ///
    /// # 返回
    /// * `Vec<ProbeExecution>` - 与注册顺序一致的执行记录
    pub async fn execute(
        &self,
        registry: &Registry,
        shutdown: &CancelSignal,
    ) -> Vec<ProbeExecution> {
        let runs = registry
            .descriptors()
            .iter()
            .map(|descriptor| self.run_probe(descriptor, shutdown));

        // join_all 按输入顺序返回结果，与完成顺序无关
        futures::future::join_all(runs).await
    }

    /// 在独立任务中运行单个探针
    async fn run_probe(
        &self,
        descriptor: &ProbeDescriptor,
        shutdown: &CancelSignal,
    ) -> ProbeExecution {
        let budget = self.budget_for(descriptor);
        let (cancel, signal) = CancelHandle::new();
        let probe = Arc::clone(&descriptor.probe);
        let started = Instant::now();

        debug!(
            "开始执行探针: {} (预算 {} ms)",
            descriptor.name,
            budget.as_millis()
        );

        let mut task = tokio::spawn(async move { probe.check(signal).await });

        let joined = tokio::select! {
            joined = &mut task => Some(joined),
            _ = sleep(budget) => {
                debug!("探针预算耗尽: {}", descriptor.name);
                None
            }
            _ = shutdown.cancelled() => {
                debug!("整轮检测被取消: {}", descriptor.name);
                None
            }
        };

        let outcome = match joined {
            Some(joined) => Self::outcome_from_join(&descriptor.name, joined),
            None => {
                cancel.cancel();
                match timeout(self.config.grace_period, &mut task).await {
                    Ok(joined) => {
                        debug!("探针在宽限期内返回: {}", descriptor.name);
                        Self::outcome_from_join(&descriptor.name, joined)
                    }
                    Err(_) => {
                        // 丢弃句柄只会分离任务，不会强制终止
                        warn!(
                            "探针在宽限期 {} ms 后仍未返回，记为超时: {}",
                            self.config.grace_period.as_millis(),
                            descriptor.name
                        );
                        ProbeOutcome::TimedOut
                    }
                }
            }
        };

        ProbeExecution {
            name: descriptor.name.clone(),
            outcome,
            elapsed: started.elapsed(),
            budget,
        }
    }

    /// 将任务的汇合结果转换为探针结果
    fn outcome_from_join(name: &str, joined: Result<ProbeOutcome, JoinError>) -> ProbeOutcome {
        match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!("探针panic: {} - {}", name, message);
                ProbeOutcome::Failure(format!("probe panicked: {message}"))
            }
            Err(e) => {
                error!("探针任务异常结束: {} - {}", name, e);
                ProbeOutcome::Failure(format!("probe task failed: {e}"))
            }
        }
    }
}

/// 提取panic负载中的描述信息
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
