use crate::error::ClientError;
use crate::state::{GameId, GameState, PlayerId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- 动作 ---

/// 动作可以指向的对象: 牌堆、某位玩家的某张手牌、弃牌堆或赌注
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    Deck,
    /// `card_order` 是该玩家 *当前* 手牌中的位置，下一次状态更新后即失效
    Card { player_id: PlayerId, card_order: usize },
    Discard { player_id: PlayerId },
    Wager { player_id: PlayerId, amount: f64 },
}

/// 服务器给出的合法动作，客户端只会从中挑选，从不自行构造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    Take { object_to_take: Target },
    Protect { object_to_protect: Target },
    Discard { card_order: usize },
}

// --- 请求/响应的数据形状 ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlayerResponse {
    pub player_id: PlayerId,
}

/// create_game / join_game / get_game_state 的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub state: GameState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    #[default]
    Rejected,
}

/// 失败响应 `{"error": "...", "code": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: ErrorCode,
}

impl From<ErrorResponse> for ClientError {
    fn from(resp: ErrorResponse) -> Self {
        match resp.code {
            ErrorCode::NotFound => ClientError::NotFound(resp.error),
            ErrorCode::Rejected => ClientError::ActionRejected(resp.error),
        }
    }
}

/// 把一个响应体解析为成功的结果或对应的错误
pub fn decode_reply<T: DeserializeOwned>(payload: Value) -> Result<T, ClientError> {
    if payload.get("error").is_some_and(Value::is_string) {
        let resp: ErrorResponse = serde_json::from_value(payload)
            .map_err(|e| ClientError::Transport(format!("malformed error reply: {}", e)))?;
        return Err(resp.into());
    }
    serde_json::from_value(payload).map_err(|e| ClientError::Transport(format!("malformed reply: {}", e)))
}

// --- 服务器推送的事件 ---

/// 推送事件。无法识别的类型原样保留并转发，不会被丢弃
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ActionsPerformed { game_id: GameId, action: Value },
    PlayerJoined { game_id: GameId, player_id: PlayerId },
    Unrecognized(Value),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownEvent {
    ActionsPerformed {
        game_id: GameId,
        #[serde(default)]
        action: Value,
    },
    PlayerJoined {
        game_id: GameId,
        player_id: PlayerId,
    },
}

impl ServerEvent {
    pub fn from_payload(payload: Value) -> Self {
        match serde_json::from_value::<KnownEvent>(payload.clone()) {
            Ok(KnownEvent::ActionsPerformed { game_id, action }) => ServerEvent::ActionsPerformed { game_id, action },
            Ok(KnownEvent::PlayerJoined { game_id, player_id }) => ServerEvent::PlayerJoined { game_id, player_id },
            Err(_) => ServerEvent::Unrecognized(payload),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ServerEvent::ActionsPerformed { .. } => "actions_performed",
            ServerEvent::PlayerJoined { .. } => "player_joined",
            ServerEvent::Unrecognized(payload) => payload.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }
}

// --- 客户端 -> 服务器 的消息 ---
// 一条 WebSocket 连接上复用请求和推送，请求靠 request_id 与回复对应。

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientMessage {
    pub request_id: u64,
    pub request: Request,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    CreatePlayer,
    CreateGame { player_id: PlayerId },
    JoinGame { player_id: PlayerId, game_id: GameId },
    GetGameState { game_id: GameId },
    /// 合法动作针对请求里携带的状态计算，保证与刚拉取到的状态一致
    GetLegalActions { player_id: PlayerId, state: GameState },
    PerformAction { player_id: PlayerId, game_id: GameId, action: PlayerAction },
    /// 订阅该玩家的事件推送
    Subscribe { player_id: PlayerId },
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 对某个请求的回复，失败时 payload 为 ErrorResponse
    Reply { request_id: u64, payload: Value },
    /// 服务器主动推送的事件
    Event { payload: Value },
}
