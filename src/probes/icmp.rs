//! ICMP可达性探针
//!
//! 调用系统 `ping` 发送一个回显请求，解析往返时间

use crate::error::ProbeError;
use crate::health::probe::{CancelSignal, Probe};
use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use regex::Regex;
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

/// 默认单包等待时间（毫秒）
pub const DEFAULT_PACKET_TIMEOUT_MS: u64 = 2_000;

/// ICMP探针
#[derive(Debug, Clone)]
pub struct IcmpProbe {
    /// 目标主机
    host: String,
    /// 单包等待时间，交给 `ping` 自身控制
    packet_timeout: Duration,
}

impl IcmpProbe {
    /// 创建新的ICMP探针
    ///
    /// # 参数
    /// * `host` - 目标主机名或IP地址
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 主机名为空或可能被当作命令行参数时返回错误
    pub fn new(host: impl Into<String>) -> Result<Self, ProbeError> {
        let host = host.into();
        if host.trim().is_empty()
            || host.starts_with('-')
            || host.chars().any(char::is_whitespace)
        {
            return Err(ProbeError::InvalidTarget { target: host });
        }

        Ok(Self {
            host,
            packet_timeout: Duration::from_millis(DEFAULT_PACKET_TIMEOUT_MS),
        })
    }

    /// 设置单包等待时间
    pub fn with_packet_timeout(mut self, packet_timeout: Duration) -> Self {
        self.packet_timeout = packet_timeout;
        self
    }

    /// 目标主机
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `ping` 的参数：只发一个包，并按平台设置等待时间
    fn ping_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5);

        #[cfg(windows)]
        {
            let wait_ms = self.packet_timeout.as_millis().max(1);
            args.extend(["-n".to_string(), "1".to_string()]);
            args.extend(["-w".to_string(), wait_ms.to_string()]);
        }

        #[cfg(target_os = "macos")]
        {
            // macOS 的 -W 以毫秒为单位
            let wait_ms = self.packet_timeout.as_millis().max(1);
            args.extend(["-c".to_string(), "1".to_string()]);
            args.extend(["-W".to_string(), wait_ms.to_string()]);
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        {
            // Linux 的 -W 只接受整秒
            let wait_secs = self.packet_timeout.as_secs_f64().ceil().max(1.0) as u64;
            args.extend(["-c".to_string(), "1".to_string()]);
            args.extend(["-W".to_string(), wait_secs.to_string()]);
        }

        args.push(self.host.clone());
        args
    }

    /// 构建 `ping` 命令
    fn build_command(&self) -> Command {
        let mut command = Command::new("ping");
        command
            .args(self.ping_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Probe for IcmpProbe {
    async fn check(&self, cancel: CancelSignal) -> ProbeOutcome {
        let start_time = Instant::now();

        let child = match self.build_command().spawn() {
            Ok(child) => child,
            Err(e) => return ProbeOutcome::failure(format!("could not run ping: {e}")),
        };

        // 取消时丢弃 wait_with_output，kill_on_drop 会结束子进程
        tokio::select! {
            output = child.wait_with_output() => match output {
                Ok(output) => interpret_output(&output, start_time.elapsed()),
                Err(e) => ProbeOutcome::failure(format!("could not read ping output: {e}")),
            },
            _ = cancel.cancelled() => {
                debug!("ICMP探测被取消: {}", self.host);
                ProbeOutcome::TimedOut
            }
        }
    }

    fn label(&self) -> Option<String> {
        Some(format!("ICMP to {}", self.host))
    }
}

/// 匹配 `time=12.4 ms` 或 `time<1ms`
fn round_trip_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"(?i)time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").ok())
        .as_ref()
}

/// 解析 `ping` 的输出
fn interpret_output(output: &Output, elapsed: Duration) -> ProbeOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    interpret_reply(
        output.status.success(),
        output.status.code(),
        &stdout,
        &stderr,
        elapsed,
    )
}

/// 把一次 `ping` 的退出状态和输出映射为探针结果
///
/// 成功且能解析出往返时间时使用解析值，解析失败退回到实测耗时。
fn interpret_reply(
    success: bool,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
    elapsed: Duration,
) -> ProbeOutcome {
    let combined = format!("{stdout}\n{stderr}");
    let lowered = combined.to_lowercase();

    // Windows 的 ping 在目标不可达时也可能返回0
    if success && !lowered.contains("unreachable") {
        let round_trip = round_trip_regex()
            .and_then(|regex| regex.captures(&combined))
            .and_then(|captures| captures[1].parse::<f64>().ok())
            .map(|ms| Duration::from_micros((ms * 1000.0).round() as u64))
            .unwrap_or(elapsed);
        return ProbeOutcome::Success(round_trip);
    }

    let reason = if lowered.contains("unreachable") {
        "host unreachable".to_string()
    } else if lowered.contains("unknown host")
        || lowered.contains("name or service not known")
        || lowered.contains("could not find host")
        || lowered.contains("cannot resolve")
        || lowered.contains("temporary failure in name resolution")
    {
        "unknown host".to_string()
    } else if lowered.contains("100% packet loss")
        || lowered.contains("100.0% packet loss")
        || lowered.contains("request timed out")
        || lowered.contains("100% loss")
    {
        "no reply".to_string()
    } else if let Some(line) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        line.trim().to_string()
    } else {
        match exit_code {
            Some(code) => format!("ping exited with status {code}"),
            None => "ping terminated by signal".to_string(),
        }
    };

    ProbeOutcome::Failure(reason)
}
