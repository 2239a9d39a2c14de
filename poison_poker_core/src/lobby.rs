use crate::api::GameApi;
use crate::error::ClientError;
use crate::message::GameSnapshot;
use crate::state::{GameId, PlayerId};
use std::time::Duration;
use tracing::{info, warn};

/// 进入对局前确定下来的身份
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub game_id: GameId,
}

impl Session {
    fn new(player_id: PlayerId, snapshot: GameSnapshot) -> Self {
        Session { player_id, game_id: snapshot.game_id }
    }
}

/// 创建一个新玩家并开一局新游戏
pub async fn create_session<A: GameApi + ?Sized>(api: &A) -> Result<Session, ClientError> {
    let player_id = api.create_player().await?;
    let snapshot = api.create_game(player_id).await?;
    info!("玩家 {} 创建了新游戏 {}", player_id, snapshot.game_id);
    Ok(Session::new(player_id, snapshot))
}

/// 创建一个新玩家并加入已有的游戏
///
/// 刚创建的游戏可能还没在服务器上就绪，`NotFound` 会在 `retry_delay` 后重试一次，
/// 其他错误不重试。
pub async fn join_session<A: GameApi + ?Sized>(
    api: &A,
    game_id: GameId,
    retry_delay: Duration,
) -> Result<Session, ClientError> {
    let player_id = api.create_player().await?;
    let snapshot = match api.join_game(player_id, game_id).await {
        Err(e) if e.is_not_found() => {
            warn!("加入游戏 {} 失败 ({})，稍后重试一次", game_id, e);
            tokio::time::sleep(retry_delay).await;
            api.join_game(player_id, game_id).await?
        }
        other => other?,
    };
    info!("玩家 {} 加入了游戏 {}", player_id, snapshot.game_id);
    Ok(Session::new(player_id, snapshot))
}
