use crate::error::ClientError;
use crate::message::{GameSnapshot, PlayerAction, ServerEvent};
use crate::state::{GameId, GameState, PlayerId};
use tokio::sync::mpsc;

/// 一个玩家的事件推送通道，丢弃接收端即取消订阅
pub type EventStream = mpsc::UnboundedReceiver<ServerEvent>;

/// 客户端核心唯一依赖的服务器接口。
///
/// 与具体传输方式无关：终端客户端用 WebSocket 实现它，测试里用内存中的脚本实现。
#[async_trait::async_trait]
pub trait GameApi: Send + Sync {
    async fn create_player(&self) -> Result<PlayerId, ClientError>;

    async fn create_game(&self, player_id: PlayerId) -> Result<GameSnapshot, ClientError>;

    async fn join_game(&self, player_id: PlayerId, game_id: GameId) -> Result<GameSnapshot, ClientError>;

    async fn get_game_state(&self, game_id: GameId) -> Result<GameSnapshot, ClientError>;

    /// 针对给定状态计算该玩家的合法动作
    async fn get_legal_actions(&self, player_id: PlayerId, state: &GameState) -> Result<Vec<PlayerAction>, ClientError>;

    /// 提交动作。引擎不等待它的结果来解锁输入，确认通过推送事件到达
    async fn perform_action(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        action: PlayerAction,
    ) -> Result<GameState, ClientError>;

    async fn subscribe_events(&self, player_id: PlayerId) -> Result<EventStream, ClientError>;
}
