use std::fmt;

/// 与服务器交互时可能出现的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// 游戏或玩家不存在，通常是创建/加入时的竞争，调用方可以重试一次
    NotFound(String),
    /// 服务器拒绝了提交的动作，不自动重试
    ActionRejected(String),
    /// 请求或事件流不可达，对当前对局是致命的
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClientError::NotFound(msg) => write!(f, "not found: {}", msg),
            ClientError::ActionRejected(msg) => write!(f, "action rejected: {}", msg),
            ClientError::Transport(msg) => write!(f, "transport failure: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// 引擎自身的输入闸门拒绝提交的原因，此时不会发出任何网络请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// 已有一个动作在等待服务器确认
    Waiting,
    /// 对局已经结束
    Ended,
    /// 还没有拉取到任何状态
    NoSession,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            SubmitError::Waiting => "input is locked until the server acknowledges the last action",
            SubmitError::Ended => "the game session has ended",
            SubmitError::NoSession => "no game state has been received yet",
        })
    }
}

impl std::error::Error for SubmitError {}
