//! 基于 WebSocket 的 `GameApi` 实现
//!
//! 一条连接上复用所有请求和事件推送：写任务把 mpsc 队列里的请求发到 socket，
//! 读任务按 `request_id` 把回复交给等待中的请求，把事件转发到订阅通道。

use futures_util::{SinkExt, Stream, StreamExt};
use poison_poker_core::{
    decode_reply, ClientError, ClientMessage, CreatePlayerResponse, EventStream, GameApi, GameId, GameSnapshot,
    GameState, PlayerAction, PlayerId, Request, ServerEvent, ServerMessage,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

/// 等待回复的请求。连接断开后变为 `None`，之后的请求直接失败
type Pending = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<Value>>>>>;

fn connection_lost() -> ClientError {
    ClientError::Transport("connection to the server was lost".to_string())
}

pub struct WsApi {
    outgoing: mpsc::Sender<ClientMessage>,
    pending: Pending,
    next_id: AtomicU64,
    /// 事件通道的接收端，第一次订阅时被取走
    events: Mutex<Option<EventStream>>,
}

impl WsApi {
    pub async fn connect(url: &Url) -> Result<Self, ClientError> {
        info!("正在连接到: {}", url);
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Transport(format!("cannot connect to {}: {}", url, e)))?;
        info!("连接成功!");

        let (mut write, read) = ws_stream.split();
        let (outgoing, mut rx) = mpsc::channel::<ClientMessage>(32);
        // 事件通道不设上限：读任务一旦阻塞在事件上，回复也就送不出去了
        let (events_tx, events_rx) = mpsc::unbounded_channel::<ServerEvent>();
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));

        // 写任务：所有请求都经过这个队列发出
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let payload = match serde_json::to_string(&msg) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("序列化请求失败: {}", e);
                        continue;
                    }
                };
                if write.send(Message::Text(payload.into())).await.is_err() {
                    // 发送失败，说明连接已断开，退出任务
                    break;
                }
            }
            let _ = write.close().await;
        });

        tokio::spawn(read_loop(read, Arc::clone(&pending), events_tx));

        Ok(WsApi::new(outgoing, pending, events_rx))
    }

    fn new(outgoing: mpsc::Sender<ClientMessage>, pending: Pending, events: EventStream) -> Self {
        WsApi { outgoing, pending, next_id: AtomicU64::new(1), events: Mutex::new(Some(events)) }
    }

    /// 发出一个请求并等待对应的回复
    async fn request<T: DeserializeOwned>(&self, request: Request) -> Result<T, ClientError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(pending) => {
                pending.insert(request_id, tx);
            }
            None => return Err(connection_lost()),
        }

        debug!(request_id, "发送请求");
        if self.outgoing.send(ClientMessage { request_id, request }).await.is_err() {
            if let Some(pending) = self.pending.lock().await.as_mut() {
                pending.remove(&request_id);
            }
            return Err(connection_lost());
        }

        let payload = rx.await.map_err(|_| connection_lost())?;
        decode_reply(payload)
    }
}

#[async_trait::async_trait]
impl GameApi for WsApi {
    async fn create_player(&self) -> Result<PlayerId, ClientError> {
        let response: CreatePlayerResponse = self.request(Request::CreatePlayer).await?;
        Ok(response.player_id)
    }

    async fn create_game(&self, player_id: PlayerId) -> Result<GameSnapshot, ClientError> {
        self.request(Request::CreateGame { player_id }).await
    }

    async fn join_game(&self, player_id: PlayerId, game_id: GameId) -> Result<GameSnapshot, ClientError> {
        self.request(Request::JoinGame { player_id, game_id }).await
    }

    async fn get_game_state(&self, game_id: GameId) -> Result<GameSnapshot, ClientError> {
        self.request(Request::GetGameState { game_id }).await
    }

    async fn get_legal_actions(&self, player_id: PlayerId, state: &GameState) -> Result<Vec<PlayerAction>, ClientError> {
        self.request(Request::GetLegalActions { player_id, state: state.clone() }).await
    }

    async fn perform_action(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        action: PlayerAction,
    ) -> Result<GameState, ClientError> {
        self.request(Request::PerformAction { player_id, game_id, action }).await
    }

    /// 一条连接只对应一个玩家，所以只能订阅一次
    async fn subscribe_events(&self, player_id: PlayerId) -> Result<EventStream, ClientError> {
        let mut events = self.events.lock().await;
        if events.is_none() {
            return Err(ClientError::Transport("this connection is already subscribed".to_string()));
        }
        let _: Value = self.request(Request::Subscribe { player_id }).await?;
        info!("玩家 {} 订阅了事件推送", player_id);
        events.take().ok_or_else(connection_lost)
    }
}

/// 读任务：直到连接断开为止分发收到的每条消息。
///
/// 退出时让所有等待中的请求失败，并关闭事件通道。
async fn read_loop<S, E>(mut read: S, pending: Pending, events: mpsc::UnboundedSender<ServerEvent>)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => route(&text, &pending, &events).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("接收消息时出错: {}", e);
                break;
            }
        }
    }

    // 丢弃所有 oneshot 发送端，等待中的请求会收到连接断开的错误
    if let Some(abandoned) = pending.lock().await.take() {
        if !abandoned.is_empty() {
            warn!("连接断开，{} 个请求未得到回复", abandoned.len());
        }
    }
    info!("服务器连接关闭");
}

async fn route(text: &str, pending: &Pending, events: &mpsc::UnboundedSender<ServerEvent>) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Reply { request_id, payload }) => {
            let waiter = pending.lock().await.as_mut().and_then(|p| p.remove(&request_id));
            match waiter {
                // 请求方可能已经放弃等待
                Some(tx) => {
                    let _ = tx.send(payload);
                }
                None => warn!(request_id, "收到无人等待的回复"),
            }
        }
        Ok(ServerMessage::Event { payload }) => {
            let event = ServerEvent::from_payload(payload);
            if events.send(event).is_err() {
                debug!("没有订阅者，丢弃推送事件");
            }
        }
        Err(e) => warn!("解析服务器消息失败: {}", e),
    }
}
