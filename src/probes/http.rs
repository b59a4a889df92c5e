//! HTTP探针实现
//!
//! 发送一次HTTP请求，状态码符合期望时以响应时间作为延迟

use crate::error::ProbeError;
use crate::health::probe::{CancelSignal, Probe};
use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// HTTP探针
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP客户端
    client: Client,
    /// 目标URL
    url: String,
    /// HTTP方法
    method: Method,
    /// 请求头
    headers: HashMap<String, String>,
    /// 期望的状态码列表
    expected_status_codes: Vec<u16>,
}

impl HttpProbe {
    /// 创建新的HTTP探针
    ///
    /// # 参数
    /// * `url` - 目标URL
    /// * `method` - HTTP方法
    /// * `request_timeout` - 客户端级超时，作为取消信号之外的兜底
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 探针实例
    pub fn new(
        url: impl Into<String>,
        method: &str,
        request_timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProbeError::InvalidTarget { target: url });
        }

        let method =
            Method::from_str(&method.to_uppercase()).map_err(|_| ProbeError::InvalidMethod {
                method: method.to_string(),
            })?;

        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            url,
            method,
            headers: HashMap::new(),
            expected_status_codes: vec![200],
        })
    }

    /// 设置请求头
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// 设置期望的状态码
    pub fn with_expected_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.expected_status_codes = codes;
        self
    }

    /// 构建HTTP请求
    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut request = self.client.request(self.method.clone(), &self.url);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request
    }

    /// 验证响应状态码
    fn validate_status_code(&self, status_code: u16) -> bool {
        self.expected_status_codes.contains(&status_code)
    }

    /// 执行单次请求
    async fn perform_request(&self) -> ProbeOutcome {
        let start_time = Instant::now();

        match self.build_request().send().await {
            Ok(response) => {
                let response_time = start_time.elapsed();
                let status = response.status();
                if self.validate_status_code(status.as_u16()) {
                    ProbeOutcome::Success(response_time)
                } else {
                    ProbeOutcome::Failure(describe_status(status))
                }
            }
            Err(e) => ProbeOutcome::Failure(format_request_error(&e)),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, cancel: CancelSignal) -> ProbeOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ProbeOutcome::TimedOut,
            outcome = self.perform_request() => outcome,
        }
    }

    fn label(&self) -> Option<String> {
        Some(format!("HTTP {} {}", self.method, self.url))
    }
}

fn describe_status(status: StatusCode) -> String {
    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// 格式化请求错误信息，使其更加清晰易读
fn format_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection refused".to_string()
    } else if error.is_request() {
        "invalid request".to_string()
    } else if let Some(status) = error.status() {
        describe_status(status)
    } else if error.is_decode() {
        "response decode error".to_string()
    } else {
        let error_str = error.to_string();
        let lowered = error_str.to_lowercase();
        if lowered.contains("dns") {
            "DNS resolution failed".to_string()
        } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl")
        {
            "SSL/TLS certificate error".to_string()
        } else {
            format!("request failed: {error_str}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expected_status_is_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let probe = HttpProbe::new(
            format!("{}/health", server.url()),
            "GET",
            Duration::from_secs(5),
        )
        .unwrap();
        let outcome = probe.check(CancelSignal::never()).await;

        assert!(outcome.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unexpected_status_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let probe = HttpProbe::new(
            format!("{}/health", server.url()),
            "GET",
            Duration::from_secs(5),
        )
        .unwrap();
        let outcome = probe.check(CancelSignal::never()).await;

        assert_eq!(
            outcome,
            ProbeOutcome::failure("HTTP 503 Service Unavailable")
        );
    }

    #[tokio::test]
    async fn test_custom_method_headers_and_codes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/ready")
            .match_header("x-probe", "vitals")
            .with_status(204)
            .create_async()
            .await;

        let mut headers = HashMap::new();
        headers.insert("x-probe".to_string(), "vitals".to_string());
        let probe = HttpProbe::new(
            format!("{}/ready", server.url()),
            "head",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_headers(headers)
        .with_expected_status_codes(vec![200, 204]);

        assert!(probe.check(CancelSignal::never()).await.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = HttpProbe::new(
            format!("http://127.0.0.1:{port}/"),
            "GET",
            Duration::from_secs(2),
        )
        .unwrap();

        let outcome = probe.check(CancelSignal::never()).await;
        assert!(matches!(outcome, ProbeOutcome::Failure(_)));
    }

    #[tokio::test]
    async fn test_cancelled_request_times_out() {
        let probe = HttpProbe::new("http://198.51.100.1/", "GET", Duration::from_secs(30)).unwrap();
        let (handle, signal) = crate::health::probe::CancelHandle::new();
        handle.cancel();

        assert_eq!(probe.check(signal).await, ProbeOutcome::TimedOut);
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            HttpProbe::new("ftp://example.com", "GET", Duration::from_secs(1)),
            Err(ProbeError::InvalidTarget { .. })
        ));
        assert!(matches!(
            HttpProbe::new("https://example.com", "NOT A METHOD", Duration::from_secs(1)),
            Err(ProbeError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_label() {
        let probe = HttpProbe::new("https://example.com/health", "get", Duration::from_secs(1)).unwrap();
        assert_eq!(
            probe.label(),
            Some("HTTP GET https://example.com/health".to_string())
        );
        assert!(probe.validate_status_code(200));
        assert!(!probe.validate_status_code(404));
    }
}
