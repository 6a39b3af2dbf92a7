//! HTTP 调用器实现 (reqwest)

use async_trait::async_trait;
use tracing::debug;

use crate::collaborators::{HttpCaller, HttpRequest, HttpResponse};
use crate::{ExecutorError, Result};

/// 基于 reqwest 的 HTTP 调用器
pub struct ReqwestCaller {
    client: reqwest::Client,
}

impl ReqwestCaller {
    /// 创建调用器
    pub fn new(timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::ConfigError(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpCaller for ReqwestCaller {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                ExecutorError::ConfigError(format!("非法的 HTTP 方法: {}", request.method))
            })?;

        debug!("HTTP 请求: {} {}", request.method, request.url);

        let mut builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExecutorError::ConnectionError(format!("HTTP 请求失败: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| ExecutorError::ConnectionError(format!("读取响应体失败: {}", e)))?;

        debug!("HTTP 响应: {} ({} 字节)", status, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
