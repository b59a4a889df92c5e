//! TCP连接探针
//!
//! 测量与目标端口建立TCP连接所需的时间

use crate::error::ProbeError;
use crate::health::probe::{CancelSignal, Probe};
use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// TCP探针
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
}

impl TcpProbe {
    /// 创建新的TCP探针
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ProbeError> {
        let host = host.into();
        if host.trim().is_empty() || port == 0 {
            return Err(ProbeError::InvalidTarget {
                target: format!("{host}:{port}"),
            });
        }
        Ok(Self { host, port })
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self, cancel: CancelSignal) -> ProbeOutcome {
        let start_time = Instant::now();

        tokio::select! {
            connected = TcpStream::connect((self.host.as_str(), self.port)) => match connected {
                Ok(stream) => {
                    let latency = start_time.elapsed();
                    drop(stream);
                    ProbeOutcome::Success(latency)
                }
                Err(e) => ProbeOutcome::Failure(describe_connect_error(&e)),
            },
            _ = cancel.cancelled() => ProbeOutcome::TimedOut,
        }
    }

    fn label(&self) -> Option<String> {
        Some(format!("TCP to {}:{}", self.host, self.port))
    }
}

fn describe_connect_error(error: &std::io::Error) -> String {
    match error.kind() {
        ErrorKind::ConnectionRefused => "connection refused".to_string(),
        ErrorKind::TimedOut => "connect timed out".to_string(),
        ErrorKind::AddrNotAvailable => "address not available".to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port).unwrap();
        let outcome = probe.check(CancelSignal::never()).await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // 绑定后立即释放，端口大概率无人监听
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpProbe::new("127.0.0.1", port).unwrap();
        let outcome = probe.check(CancelSignal::never()).await;

        assert!(matches!(outcome, ProbeOutcome::Failure(_)));
    }

    #[test]
    fn test_invalid_target() {
        assert!(TcpProbe::new("", 80).is_err());
        assert!(TcpProbe::new("localhost", 0).is_err());
    }

    #[test]
    fn test_label() {
        let probe = TcpProbe::new("db.internal", 5432).unwrap();
        assert_eq!(probe.label(), Some("TCP to db.internal:5432".to_string()));
    }

    #[test]
    fn test_describe_connect_error() {
        let refused = std::io::Error::from(ErrorKind::ConnectionRefused);
        assert_eq!(describe_connect_error(&refused), "connection refused");
    }
}
