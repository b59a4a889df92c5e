//! 探针能力接口
//!
//! 定义探针trait以及传入每次调用的取消信号

use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use tokio::sync::watch;

/// 探针trait，定义单次检测接口
///
/// 实现者需要满足：
/// - 收到取消信号后在宽限期内尽快返回（通常返回 `ProbeOutcome::TimedOut`）
/// - 不与其他探针共享可变状态，每次调用相互独立
/// - 内部错误以 `ProbeOutcome::Failure` 表示，不应panic
#[async_trait]
pub trait Probe: Send + Sync {
    /// 执行一次检测
    ///
    /// # 参数
    /// * `cancel` - 预算耗尽或整轮检测被取消时触发的信号
    ///
    /// # 返回
    /// * `ProbeOutcome` - 原始检测结果
    async fn check(&self, cancel: CancelSignal) -> ProbeOutcome;

    /// 用于结果描述的标签，例如 `ICMP to 10.0.0.1`
    ///
    /// 返回 `None` 时使用注册名称。
    fn label(&self) -> Option<String> {
        None
    }
}

/// 取消信号（接收端）
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

/// 取消信号（发送端）
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// 创建一对取消句柄和信号
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelSignal { receiver })
    }

    /// 触发取消，所有信号副本都会观察到
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// 判断是否已触发
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// 再派生一个信号
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// 永远不会触发的信号
    pub fn never() -> Self {
        let (_sender, receiver) = watch::channel(false);
        Self { receiver }
    }

    /// 判断是否已触发
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 等待信号触发
    ///
    /// 发送端在未触发的情况下被丢弃时，永远挂起。
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
