//! # 状态同步引擎
//!
//! 引擎持有服务器状态在本地的唯一镜像 (状态 + 本地玩家的合法动作)，
//! 在首次加载和每个推送事件后重新拉取两者，先状态后动作地通知渲染层；
//! 同时维护 `Idle`/`Waiting` 两态的输入闸门，防止重复提交。
//!
//! 引擎从不自行绘制任何东西，所有副作用都通过 [`Renderer`] 回调宣布。

use crate::api::{EventStream, GameApi};
use crate::card::{compare, try_evaluate, Card};
use crate::error::{ClientError, SubmitError};
use crate::message::{PlayerAction, ServerEvent};
use crate::resolve::{resolve, Mode, ResolveContext};
use crate::scene::{ObjectRef, SceneLookup};
use crate::state::{GameId, GameState, PlayerId, Side};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// 输入闸门的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 接受输入
    Idle,
    /// 输入被锁定：首次加载未完成、对手未加入，或有一个动作等待确认
    Waiting,
}

/// 对局结束的方式，结束后客户端回到主菜单
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// 拉取失败或连接中断，本地镜像已不可信
    Abandoned(String),
    /// 牌堆耗尽后的比牌结论
    Showdown(String),
    Eliminated(Side),
    /// 本地主动关闭了对局
    TornDown,
}

/// 渲染层需要实现的边界。
///
/// 渲染层同时维护画面索引 ([`SceneLookup`])，引擎通过它把点击解析成合法动作。
pub trait Renderer: SceneLookup {
    fn on_state_changed(&mut self, state: &GameState);
    fn on_legal_actions_changed(&mut self, actions: &[PlayerAction]);
    fn on_eliminated(&mut self, which: Side);
    fn on_showdown(&mut self, message: &str);
    fn on_fatal_error(&mut self, message: &str);

    /// 无法识别的推送事件，原样转发
    fn on_raw_event(&mut self, _payload: &Value) {}
    fn on_phase_changed(&mut self, _phase: Phase) {}
    /// 一个动作已经发出，`object` 是触发它的画面对象 (如果有)
    fn on_submitted(&mut self, _object: Option<ObjectRef>, _action: &PlayerAction) {}
    /// 非致命的提示，例如服务器拒绝了动作
    fn on_notice(&mut self, _message: &str) {}
    fn on_protect_mode_changed(&mut self, _on: bool) {}
}

/// 同一次拉取得到的 状态 + 合法动作，总是整体替换
#[derive(Debug, Clone, PartialEq)]
pub struct Mirror {
    pub state: GameState,
    pub legal_actions: Vec<PlayerAction>,
}

/// 渲染层发给引擎的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Gesture(ObjectRef),
    SetProtectMode(bool),
    ToggleProtectMode,
}

/// 关闭对局用的句柄。单纯丢弃句柄不会关闭对局
#[derive(Debug)]
pub struct SessionHandle {
    shutdown: watch::Sender<bool>,
}

impl SessionHandle {
    /// 关闭对局：正在进行的拉取结果会被丢弃，`run` 随即返回
    pub fn teardown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// 一次提交的结果，由后台任务送回引擎
#[derive(Debug)]
struct SubmitOutcome {
    submission: u64,
    action: PlayerAction,
    result: Result<(), ClientError>,
}

pub struct SyncEngine<A, R> {
    api: Arc<A>,
    renderer: R,
    player_id: PlayerId,
    game_id: GameId,
    phase: Phase,
    mirror: Option<Arc<Mirror>>,
    protect_mode: bool,
    /// 已发出但尚未被推送事件确认的动作，连同它的提交序号
    pending: Option<(u64, PlayerAction)>,
    submissions: u64,
    ended: Option<Termination>,
    outcomes_tx: mpsc::UnboundedSender<SubmitOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<SubmitOutcome>,
    shutdown: watch::Receiver<bool>,
}

/// 直到句柄显式关闭对局才完成
async fn closed(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|closed| *closed).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl<A, R> SyncEngine<A, R>
where
    A: GameApi + 'static,
    R: Renderer,
{
    pub fn new(api: Arc<A>, renderer: R, player_id: PlayerId, game_id: GameId) -> (Self, SessionHandle) {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = watch::channel(false);
        let engine = SyncEngine {
            api,
            renderer,
            player_id,
            game_id,
            phase: Phase::Waiting,
            mirror: None,
            protect_mode: false,
            pending: None,
            submissions: 0,
            ended: None,
            outcomes_tx,
            outcomes_rx,
            shutdown,
        };
        (engine, SessionHandle { shutdown: shutdown_tx })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mirror(&self) -> Option<&Mirror> {
        self.mirror.as_deref()
    }

    pub fn pending(&self) -> Option<&PlayerAction> {
        self.pending.as_ref().map(|(_, action)| action)
    }

    pub fn protect_mode(&self) -> bool {
        self.protect_mode
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.ended.as_ref()
    }

    // --- 同步 ---

    /// 首次加载：拉取并发布，双方都在时解锁输入
    pub async fn start(&mut self) {
        if self.reconcile().await {
            self.unlock();
        }
    }

    /// 处理一个推送事件。每个事件 (包括无法识别的) 都会触发一次完整的同步
    pub async fn handle_event(&mut self, event: ServerEvent) {
        debug!(kind = event.kind(), "收到推送事件");
        if let ServerEvent::Unrecognized(payload) = &event {
            self.renderer.on_raw_event(payload);
        }
        if !self.reconcile().await {
            return;
        }

        match event {
            ServerEvent::ActionsPerformed { .. } => {
                if self.phase == Phase::Waiting {
                    self.pending = None;
                    self.unlock();
                }
            }
            ServerEvent::PlayerJoined { player_id, .. } => {
                info!("玩家 {} 加入了游戏 {}", player_id, self.game_id);
                if self.phase == Phase::Waiting && self.pending.is_none() {
                    self.unlock();
                }
            }
            ServerEvent::Unrecognized(_) => {}
        }
        self.enforce_player_count();
    }

    /// 同步一次：先把状态和合法动作都拉回来，再依次发布，最后检查终局。
    ///
    /// 返回对局是否仍在进行。对局已关闭时，拉取结果会被直接丢弃。
    async fn reconcile(&mut self) -> bool {
        if self.ended.is_some() {
            return false;
        }

        let fetched = tokio::select! {
            biased;
            _ = closed(self.shutdown.clone()) => None,
            fetched = fetch_mirror(&*self.api, self.player_id, self.game_id) => Some(fetched),
        };
        if *self.shutdown.borrow() {
            debug!("对局已关闭，丢弃拉取结果");
            self.finish(Termination::TornDown);
            return false;
        }

        match fetched {
            Some(Ok(mirror)) => self.publish(mirror),
            Some(Err(e)) => {
                self.abandon(e);
                false
            }
            None => {
                self.finish(Termination::TornDown);
                false
            }
        }
    }

    fn publish(&mut self, mirror: Mirror) -> bool {
        let mirror = Arc::new(mirror);
        self.mirror = Some(Arc::clone(&mirror));
        self.renderer.on_state_changed(&mirror.state);
        self.renderer.on_legal_actions_changed(&mirror.legal_actions);

        match self.terminal_condition(&mirror.state) {
            Some(end) => {
                self.finish(end);
                false
            }
            None => true,
        }
    }

    /// 淘汰优先于牌堆耗尽
    fn terminal_condition(&mut self, state: &GameState) -> Option<Termination> {
        let me = state.player(&self.player_id);
        let opponent = state.opponent_of(&self.player_id);

        if me.is_some_and(|p| p.eliminated) {
            self.renderer.on_eliminated(Side::Me);
            return Some(Termination::Eliminated(Side::Me));
        }
        if opponent.is_some_and(|p| p.eliminated) {
            self.renderer.on_eliminated(Side::Opponent);
            return Some(Termination::Eliminated(Side::Opponent));
        }
        if let (Some(me), Some(opponent)) = (me, opponent) {
            if state.deck_exhausted() {
                let message = showdown_message(&me.hand_cards(), &opponent.hand_cards());
                info!("牌堆耗尽，比牌: {}", message);
                self.renderer.on_showdown(&message);
                return Some(Termination::Showdown(message));
            }
        }
        None
    }

    /// 不足两名玩家时不可能有合法动作，强制锁定输入
    fn enforce_player_count(&mut self) {
        if !self.has_two_players() {
            self.set_phase(Phase::Waiting);
        }
    }

    /// 解锁输入。不足两名玩家时保持锁定，`Idle` 不会被宣布
    fn unlock(&mut self) {
        let phase = if self.has_two_players() { Phase::Idle } else { Phase::Waiting };
        self.set_phase(phase);
    }

    fn has_two_players(&self) -> bool {
        self.mirror.as_ref().is_some_and(|m| m.state.is_full())
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(?phase, "输入闸门切换");
            self.phase = phase;
            self.renderer.on_phase_changed(phase);
        }
    }

    fn abandon(&mut self, err: ClientError) {
        warn!("同步失败，放弃对局: {}", err);
        let message = format!("Lost track of the game ({}). Returning to the menu.", err);
        self.renderer.on_fatal_error(&message);
        self.finish(Termination::Abandoned(message));
    }

    fn finish(&mut self, end: Termination) {
        if self.ended.is_none() {
            info!(?end, "对局 {} 结束", self.game_id);
            self.set_phase(Phase::Waiting);
            self.ended = Some(end);
        }
    }

    // --- 输入 ---

    pub fn set_protect_mode(&mut self, on: bool) {
        if self.protect_mode != on {
            self.protect_mode = on;
            self.renderer.on_protect_mode_changed(on);
        }
    }

    pub fn toggle_protect_mode(&mut self) {
        self.set_protect_mode(!self.protect_mode);
    }

    /// 把点击解析成合法动作 (不提交)，闸门关闭与否都可以调用，例如用于悬停高亮
    pub fn resolve_gesture(&self, object: ObjectRef) -> Option<PlayerAction> {
        let mirror = self.mirror.as_ref()?;
        let ctx = ResolveContext {
            me: self.player_id,
            opponent: mirror.state.opponent_of(&self.player_id).map(|p| p.id),
            state: &mirror.state,
            lookup: &self.renderer,
        };
        resolve(object, &mirror.legal_actions, Mode { protect: self.protect_mode }, &ctx)
    }

    /// 处理一次点击：闸门打开且能解析出合法动作时提交它。
    /// 点到没有意义的东西返回 `Ok(None)`。
    pub fn submit_gesture(&mut self, object: ObjectRef) -> Result<Option<PlayerAction>, SubmitError> {
        self.check_gate()?;
        let Some(action) = self.resolve_gesture(object) else {
            return Ok(None);
        };
        self.dispatch(action.clone(), Some(object));
        Ok(Some(action))
    }

    /// 直接提交一个动作。闸门关闭时在发出任何网络请求之前就被拒绝
    pub fn submit(&mut self, action: PlayerAction) -> Result<(), SubmitError> {
        self.check_gate()?;
        self.dispatch(action, None);
        Ok(())
    }

    fn check_gate(&self) -> Result<(), SubmitError> {
        if self.ended.is_some() {
            return Err(SubmitError::Ended);
        }
        if self.mirror.is_none() {
            return Err(SubmitError::NoSession);
        }
        if self.phase == Phase::Waiting {
            return Err(SubmitError::Waiting);
        }
        Ok(())
    }

    /// 发出请求后立即返回，结果由后台任务送回 `run` 循环
    fn dispatch(&mut self, action: PlayerAction, object: Option<ObjectRef>) {
        self.submissions += 1;
        let submission = self.submissions;
        info!(submission, ?action, "提交动作");
        self.set_phase(Phase::Waiting);
        self.pending = Some((submission, action.clone()));
        self.renderer.on_submitted(object, &action);

        let api = Arc::clone(&self.api);
        let outcomes = self.outcomes_tx.clone();
        let (player_id, game_id) = (self.player_id, self.game_id);
        tokio::spawn(async move {
            let result = api.perform_action(player_id, game_id, action.clone()).await.map(|_| ());
            // 引擎已经退出时没有人关心结果
            let _ = outcomes.send(SubmitOutcome { submission, action, result });
        });
    }

    async fn handle_outcome(&mut self, outcome: SubmitOutcome) {
        match outcome.result {
            Ok(()) => debug!(action = ?outcome.action, "动作已被接受，等待推送确认"),
            Err(ClientError::ActionRejected(reason)) => {
                // 只有仍在等待确认的那次提交被拒绝时才解锁，迟到的结果不能放行更新的提交
                if self.pending.as_ref().map(|(id, _)| *id) != Some(outcome.submission) {
                    warn!(submission = outcome.submission, "过期的提交被拒绝，忽略: {}", reason);
                    return;
                }
                warn!(action = ?outcome.action, "服务器拒绝了动作: {}", reason);
                self.renderer.on_notice(&format!("The server rejected that move: {}", reason));
                self.pending = None;
                // 本地的合法动作已经过期，重新同步后再解锁
                if self.reconcile().await {
                    self.unlock();
                }
            }
            Err(e) => self.abandon(e),
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Gesture(object) => match self.submit_gesture(object) {
                Ok(Some(_)) => {}
                Ok(None) => debug!(?object, "点击没有对应的合法动作"),
                Err(e) => debug!(?object, "忽略点击: {}", e),
            },
            Input::SetProtectMode(on) => self.set_protect_mode(on),
            Input::ToggleProtectMode => self.toggle_protect_mode(),
        }
    }

    // --- 事件循环 ---

    /// 驱动整个对局直到结束。
    ///
    /// 依次处理推送事件 (一个事件的同步完整结束后才取下一个)、渲染层输入、
    /// 提交结果和关闭请求。返回时订阅通道已被释放。
    pub async fn run(mut self, mut events: EventStream, mut inputs: mpsc::Receiver<Input>) -> Termination {
        if self.mirror.is_none() {
            self.start().await;
        }

        while self.ended.is_none() {
            tokio::select! {
                biased;
                _ = closed(self.shutdown.clone()) => self.finish(Termination::TornDown),
                Some(outcome) = self.outcomes_rx.recv() => self.handle_outcome(outcome).await,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => self.abandon(ClientError::Transport("event stream closed".to_string())),
                },
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => self.finish(Termination::TornDown),
                },
            }
        }

        drop(events);
        self.ended.take().unwrap_or(Termination::TornDown)
    }
}

async fn fetch_mirror<A: GameApi + ?Sized>(api: &A, player_id: PlayerId, game_id: GameId) -> Result<Mirror, ClientError> {
    let snapshot = api.get_game_state(game_id).await?;
    let legal_actions = api.get_legal_actions(player_id, &snapshot.state).await?;
    Ok(Mirror { state: snapshot.state, legal_actions })
}

/// 摊牌结论。空手牌 (以及超出评估范围的手牌) 不会交给评估器
pub fn showdown_message(mine: &[Card], theirs: &[Card]) -> String {
    match (try_evaluate(mine), try_evaluate(theirs)) {
        (None, None) => "It's a tie: neither player holds any cards.".to_string(),
        (None, Some(theirs)) => format!("You lost with no cards against {}.", theirs),
        (Some(mine), None) => format!("You won with {} against no cards.", mine),
        (Some(_), Some(_)) => compare(mine, theirs).message,
    }
}
