//! 周期调度器模块
//!
//! 按固定间隔执行检测轮次，轮次之间不重叠，并通过watch通道发布最新快照

use crate::health::engine::HealthEngine;
use crate::health::probe::CancelHandle;
use crate::health::result::Severity;
use crate::health::snapshot::Snapshot;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 快照回调函数类型
pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// 调度器状态
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    /// 调度器是否运行中
    pub is_running: bool,
    /// 已完成的检测轮次
    pub completed_cycles: u64,
    /// 最近一轮的整体状态
    pub last_severity: Option<Severity>,
    /// 最后更新时间
    pub last_update: Option<Instant>,
}

/// 调度器trait，定义调度接口
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// 启动调度器
    async fn start(&self) -> Result<()>;

    /// 停止调度器，正在执行的轮次会被取消并返回部分结果
    async fn stop(&self) -> Result<()>;

    /// 获取调度器状态
    async fn get_status(&self) -> SchedulerStatus;
}

/// 周期调度器实现
pub struct CycleScheduler {
    /// 健康检测引擎
    engine: Arc<HealthEngine>,
    /// 检测间隔
    interval: Duration,
    /// 最新快照发布端
    latest: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
    /// 停止信号
    shutdown: RwLock<Option<CancelHandle>>,
    /// 运行中的任务
    task: RwLock<Option<JoinHandle<()>>>,
    /// 调度器状态
    status: Arc<RwLock<SchedulerStatus>>,
    /// 快照回调
    snapshot_callback: Arc<RwLock<Option<SnapshotCallback>>>,
}

impl CycleScheduler {
    /// 创建新的周期调度器
    ///
    /// # 参数
    /// * `engine` - 健康检测引擎
    /// * `interval` - 检测间隔
    pub fn new(engine: Arc<HealthEngine>, interval: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            engine,
            interval,
            latest: Arc::new(latest),
            shutdown: RwLock::new(None),
            task: RwLock::new(None),
            status: Arc::new(RwLock::new(SchedulerStatus {
                is_running: false,
                completed_cycles: 0,
                last_severity: None,
                last_update: None,
            })),
            snapshot_callback: Arc::new(RwLock::new(None)),
        }
    }

    /// 设置快照回调
    pub async fn set_snapshot_callback(&self, callback: SnapshotCallback) {
        let mut cb = self.snapshot_callback.write().await;
        *cb = Some(callback);
    }

    /// 订阅快照更新
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.latest.subscribe()
    }

    /// 获取最新快照
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.borrow().clone()
    }
}

#[async_trait]
impl Scheduler for CycleScheduler {
    async fn start(&self) -> Result<()> {
        if self.interval.is_zero() {
            bail!("检测间隔不能为0");
        }

        let mut task_slot = self.task.write().await;
        if task_slot.as_ref().is_some_and(|task| !task.is_finished()) {
            bail!("调度器已在运行中");
        }

        info!(
            "启动周期调度器，探针数量: {}，间隔: {} 秒",
            self.engine.registry().len(),
            self.interval.as_secs()
        );

        let (handle, shutdown) = CancelHandle::new();
        *self.shutdown.write().await = Some(handle);

        {
            let mut status = self.status.write().await;
            status.is_running = true;
        }

        let engine = Arc::clone(&self.engine);
        let latest = Arc::clone(&self.latest);
        let status_arc = Arc::clone(&self.status);
        let callback = Arc::clone(&self.snapshot_callback);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.cancelled() => break,
                }

                let snapshot = Arc::new(engine.run_cycle_until(&shutdown).await);

                {
                    let callback_guard = callback.read().await;
                    if let Some(ref callback) = *callback_guard {
                        callback(&snapshot);
                    }
                }

                if !snapshot.overall_severity.is_healthy() {
                    warn!(
                        "检测轮次状态异常: {} - {}",
                        snapshot.cycle_id, snapshot.overall_severity
                    );
                }

                {
                    let mut status = status_arc.write().await;
                    status.completed_cycles += 1;
                    status.last_severity = Some(snapshot.overall_severity);
                    status.last_update = Some(Instant::now());
                }

                latest.send_replace(Some(snapshot));

                if shutdown.is_cancelled() {
                    break;
                }
            }

            {
                let mut status = status_arc.write().await;
                status.is_running = false;
            }
            debug!("周期调度任务退出");
        });

        *task_slot = Some(task);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!("停止周期调度器");

        if let Some(handle) = self.shutdown.write().await.take() {
            handle.cancel();
        }

        if let Some(task) = self.task.write().await.take() {
            if let Err(e) = task.await {
                error!("周期调度任务异常结束: {}", e);
            }
        }

        {
            let mut status = self.status.write().await;
            status.is_running = false;
        }

        info!("周期调度器已停止");
        Ok(())
    }

    async fn get_status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }
}

impl Drop for CycleScheduler {
    fn drop(&mut self) {
        // 不能在drop中await，只发出停止信号
        if let Some(handle) = self.shutdown.get_mut().take() {
            handle.cancel();
        }
    }
}
