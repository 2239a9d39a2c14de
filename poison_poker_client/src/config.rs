use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

pub const SERVER_URL_VAR: &str = "POISON_POKER_SERVER_URL";
pub const JOIN_RETRY_VAR: &str = "POISON_POKER_JOIN_RETRY_MS";

const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:25917/ws";
const DEFAULT_JOIN_RETRY_MS: u64 = 250;

/// 客户端配置，全部来自环境变量
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: Url,
    /// 加入游戏遇到 NotFound 时，重试前等待的时间
    pub join_retry: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 未设置的变量取默认值，设置了但无法解析的视为配置错误
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = lookup(SERVER_URL_VAR).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = Url::parse(&raw_url).with_context(|| format!("{} 不是合法的地址: {}", SERVER_URL_VAR, raw_url))?;
        if !matches!(server_url.scheme(), "ws" | "wss") {
            anyhow::bail!("{} 必须是 ws:// 或 wss:// 地址: {}", SERVER_URL_VAR, raw_url);
        }

        let join_retry_ms = match lookup(JOIN_RETRY_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} 不是合法的毫秒数: {}", JOIN_RETRY_VAR, raw))?,
            None => DEFAULT_JOIN_RETRY_MS,
        };

        Ok(ClientConfig { server_url, join_retry: Duration::from_millis(join_retry_ms) })
    }
}
