//! 测试共用的固定数据、脚本化的服务器接口和记录型渲染器

use crate::api::{EventStream, GameApi};
use crate::card::{Card, HeldCard};
use crate::error::ClientError;
use crate::message::{GameSnapshot, PlayerAction, ServerEvent};
use crate::scene::{ObjectRef, SceneIndex, SceneLookup, SceneObject};
use crate::state::*;
use crate::sync::{Phase, Renderer};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

pub const ME: PlayerId = Uuid::from_u128(0x1);
pub const OPPONENT: PlayerId = Uuid::from_u128(0x2);
pub const GAME: GameId = Uuid::from_u128(0x9);

fn held(rank: u8, suit: u8) -> HeldCard {
    HeldCard::new(Card::new(rank, suit))
}

pub fn player(id: PlayerId, suit: u8, hand_cards: usize) -> Player {
    Player {
        id,
        hand: Hand { cards: (0..hand_cards).map(|i| held(i as u8 + 2, suit)).collect(), protected: false },
        discard_pile: DiscardPile { cards: vec![held(13, suit)], protected: false },
        stack: Stack { value: 16.0 },
        wager: Wager { amount: 4.0, protected: false },
        eliminated: false,
    }
}

/// 双方各有弃牌和赌注，牌堆非空；`players[0]` 是本地玩家
pub fn two_player_state(mine: usize, theirs: usize) -> GameState {
    GameState {
        players: vec![player(ME, 1, mine), player(OPPONENT, 2, theirs)],
        deck: Deck { cards: vec![Card::new(12, 3), Card::new(11, 3), Card::new(10, 4)], protected: false },
    }
}

pub fn one_player_state() -> GameState {
    let mut state = two_player_state(2, 0);
    state.players.truncate(1);
    state
}

// --- 脚本化的服务器 ---

pub struct ScriptedApi {
    state: Mutex<Result<GameState, ClientError>>,
    actions: Mutex<Result<Vec<PlayerAction>, ClientError>>,
    perform: Mutex<Result<(), ClientError>>,
    create: Mutex<Result<(), ClientError>>,
    join_failures: Mutex<usize>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedApi {
    pub fn new(state: GameState, actions: Vec<PlayerAction>) -> Self {
        ScriptedApi {
            state: Mutex::new(Ok(state)),
            actions: Mutex::new(Ok(actions)),
            perform: Mutex::new(Ok(())),
            create: Mutex::new(Ok(())),
            join_failures: Mutex::new(0),
            gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn two_players() -> Self {
        Self::new(two_player_state(2, 2), vec![PlayerAction::Discard { card_order: 0 }])
    }

    pub fn set_state(&self, state: GameState) {
        *self.state.lock().unwrap() = Ok(state);
    }

    pub fn fail_state(&self, err: ClientError) {
        *self.state.lock().unwrap() = Err(err);
    }

    pub fn set_actions(&self, actions: Vec<PlayerAction>) {
        *self.actions.lock().unwrap() = Ok(actions);
    }

    pub fn fail_actions(&self, err: ClientError) {
        *self.actions.lock().unwrap() = Err(err);
    }

    pub fn fail_perform(&self, err: ClientError) {
        *self.perform.lock().unwrap() = Err(err);
    }

    pub fn fail_create(&self, err: ClientError) {
        *self.create.lock().unwrap() = Err(err);
    }

    pub fn fail_joins(&self, times: usize) {
        *self.join_failures.lock().unwrap() = times;
    }

    /// 之后的状态拉取会一直挂起，直到 `gate` 被通知
    pub fn gate_state_fetch(&self, gate: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn snapshot(&self) -> Result<GameSnapshot, ClientError> {
        let state = self.state.lock().unwrap().clone()?;
        Ok(GameSnapshot { game_id: GAME, state })
    }
}

#[async_trait::async_trait]
impl GameApi for ScriptedApi {
    async fn create_player(&self) -> Result<PlayerId, ClientError> {
        self.record("create_player");
        Ok(ME)
    }

    async fn create_game(&self, _player_id: PlayerId) -> Result<GameSnapshot, ClientError> {
        self.record("create_game");
        self.create.lock().unwrap().clone()?;
        self.snapshot()
    }

    async fn join_game(&self, _player_id: PlayerId, game_id: GameId) -> Result<GameSnapshot, ClientError> {
        self.record("join_game");
        {
            let mut failures = self.join_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ClientError::NotFound(format!("game {} not found", game_id)));
            }
        }
        self.snapshot()
    }

    async fn get_game_state(&self, _game_id: GameId) -> Result<GameSnapshot, ClientError> {
        self.record("get_game_state");
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.snapshot()
    }

    async fn get_legal_actions(&self, _player_id: PlayerId, _state: &GameState) -> Result<Vec<PlayerAction>, ClientError> {
        self.record("get_legal_actions");
        self.actions.lock().unwrap().clone()
    }

    async fn perform_action(
        &self,
        _player_id: PlayerId,
        _game_id: GameId,
        _action: PlayerAction,
    ) -> Result<GameState, ClientError> {
        self.record("perform_action");
        self.perform.lock().unwrap().clone()?;
        self.state.lock().unwrap().clone()
    }

    async fn subscribe_events(&self, _player_id: PlayerId) -> Result<EventStream, ClientError> {
        self.record("subscribe_events");
        let (_tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
        Ok(rx)
    }
}

// --- 记录型渲染器 ---

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    State(GameState),
    Actions(Vec<PlayerAction>),
    Eliminated(Side),
    Showdown(String),
    Fatal(String),
    Raw(Value),
    Phase(Phase),
    Submitted(PlayerAction),
    Notice(String),
    ProtectMode(bool),
}

/// 像真正的渲染器一样在每次状态更新时重建画面索引，同时记录收到的所有回调。
/// 克隆出的副本共享同一份记录。
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Call>>>,
    index: Arc<Mutex<SceneIndex>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn published_actions(&self) -> Vec<Vec<PlayerAction>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Actions(actions) => Some(actions),
                _ => None,
            })
            .collect()
    }

    pub fn handle_of(&self, object: SceneObject) -> ObjectRef {
        self.index.lock().unwrap().handle_of(&object).expect("object is not on screen")
    }

    fn push(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl SceneLookup for Recorder {
    fn locate(&self, object: ObjectRef) -> Option<SceneObject> {
        self.index.lock().unwrap().locate(object)
    }
}

impl Renderer for Recorder {
    fn on_state_changed(&mut self, state: &GameState) {
        self.index.lock().unwrap().rebuild(state, &ME);
        self.push(Call::State(state.clone()));
    }

    fn on_legal_actions_changed(&mut self, actions: &[PlayerAction]) {
        self.push(Call::Actions(actions.to_vec()));
    }

    fn on_eliminated(&mut self, which: Side) {
        self.push(Call::Eliminated(which));
    }

    fn on_showdown(&mut self, message: &str) {
        self.push(Call::Showdown(message.to_string()));
    }

    fn on_fatal_error(&mut self, message: &str) {
        self.push(Call::Fatal(message.to_string()));
    }

    fn on_raw_event(&mut self, payload: &Value) {
        self.push(Call::Raw(payload.clone()));
    }

    fn on_phase_changed(&mut self, phase: Phase) {
        self.push(Call::Phase(phase));
    }

    fn on_submitted(&mut self, _object: Option<ObjectRef>, action: &PlayerAction) {
        self.push(Call::Submitted(action.clone()));
    }

    fn on_notice(&mut self, message: &str) {
        self.push(Call::Notice(message.to_string()));
    }

    fn on_protect_mode_changed(&mut self, on: bool) {
        self.push(Call::ProtectMode(on));
    }
}
