//! 健康检测模块
//!
//! 提供探针接口、注册表、并发执行、结果分类与聚合以及周期调度功能

pub mod aggregator;
pub mod classifier;
pub mod engine;
pub mod executor;
pub mod probe;
pub mod registry;
pub mod result;
pub mod scheduler;
pub mod snapshot;

// 重新导出主要类型
pub use aggregator::{aggregate, Aggregate};
pub use classifier::{classify, ClassifyContext};
pub use engine::HealthEngine;
pub use executor::{Executor, ExecutorConfig, ProbeExecution};
pub use probe::{CancelHandle, CancelSignal, Probe};
pub use registry::{ProbeDescriptor, ProbeSettings, Registry};
pub use result::{ProbeOutcome, ProbeResult, Severity};
pub use scheduler::{CycleScheduler, Scheduler, SchedulerStatus};
pub use snapshot::{CheckEntry, HealthReport, Snapshot};
