//! 终端渲染器：把引擎发布的状态画成带编号的文本，编号就是可以点击的对象句柄

use poison_poker_core::{
    is_actionable, GameState, Mode, ObjectRef, Phase, Player, PlayerAction, PlayerId, Renderer, ResolveContext,
    SceneIndex, SceneLookup, SceneObject, Side, Target,
};
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;

pub struct TerminalRenderer {
    me: PlayerId,
    index: SceneIndex,
    state: Option<GameState>,
    legal_actions: Vec<PlayerAction>,
    protect_mode: bool,
}

impl TerminalRenderer {
    pub fn new(me: PlayerId) -> Self {
        TerminalRenderer { me, index: SceneIndex::new(), state: None, legal_actions: Vec::new(), protect_mode: false }
    }

    /// 当前画面的完整文本
    pub fn render(&self) -> String {
        let Some(state) = &self.state else {
            return "(no game state yet)\n".to_string();
        };
        let mut out = String::new();
        let opponent = state.opponent_of(&self.me);
        let ctx = ResolveContext { me: self.me, opponent: opponent.map(|p| p.id), state, lookup: &self.index };
        let mode = Mode { protect: self.protect_mode };
        // 可以点击的对象在编号后面加 *
        let tag = |object: SceneObject| match self.index.handle_of(&object) {
            Some(handle) if is_actionable(handle, &self.legal_actions, mode, &ctx) => format!("[{}*]", handle.0),
            Some(handle) => format!("[{}]", handle.0),
            None => String::new(),
        };

        let _ = writeln!(out, "----------------------------------------");
        match opponent {
            Some(opponent) => self.render_player(&mut out, opponent, "Opponent", !state.deck_exhausted(), &tag),
            None => {
                let _ = writeln!(out, "Opponent: waiting for someone to join...");
            }
        }

        let deck = &state.deck;
        if deck.cards.is_empty() {
            let _ = writeln!(out, "Deck: empty");
        } else {
            let poisoned = if deck.protected { " (poisoned)" } else { "" };
            let _ = writeln!(out, "Deck: {} cards{} {}", deck.cards.len(), poisoned, tag(SceneObject::Deck));
        }

        if let Some(me) = state.player(&self.me) {
            self.render_player(&mut out, me, "You", false, &tag);
        }
        let _ = writeln!(out, "----------------------------------------");

        if self.protect_mode {
            let _ = writeln!(out, "Poison mode is ON: clicks protect instead of take/discard.");
        }
        if !self.legal_actions.is_empty() {
            let _ = writeln!(out, "Legal moves:");
            for action in &self.legal_actions {
                let _ = writeln!(out, "  - {}", describe_action(action, &self.me));
            }
        }
        out
    }

    fn render_player(
        &self,
        out: &mut String,
        player: &Player,
        label: &str,
        face_down: bool,
        tag: &dyn Fn(SceneObject) -> String,
    ) {
        let owner = player.id;
        let eliminated = if player.eliminated { " ELIMINATED" } else { "" };
        let _ = writeln!(out, "{}: stack {}{}", label, player.stack.value, eliminated);

        if player.wager.amount > 0.0 {
            let poisoned = if player.wager.protected { " (poisoned)" } else { "" };
            let _ = writeln!(out, "  wager: {}{} {}", player.wager.amount, poisoned, tag(SceneObject::Wager { owner }));
        }

        match player.discard_top() {
            Some(top) => {
                let poisoned = if top.protected || player.discard_pile.protected { " (poisoned)" } else { "" };
                let _ = writeln!(
                    out,
                    "  discard: {}{}, {} in pile {}",
                    top,
                    poisoned,
                    player.discard_pile.cards.len(),
                    tag(SceneObject::DiscardPile { owner })
                );
            }
            None => {
                let _ = writeln!(out, "  discard: empty");
            }
        }

        let _ = write!(out, "  hand:");
        if player.hand.cards.is_empty() {
            let _ = write!(out, " empty");
        }
        for (position, held) in player.hand.cards.iter().enumerate() {
            let face = if face_down { "??".to_string() } else { held.to_string() };
            let poisoned = if held.protected && !face_down { " (poisoned)" } else { "" };
            let _ = write!(out, " {} {}{}", tag(SceneObject::HandCard { owner, position }), face, poisoned);
        }
        let _ = writeln!(out);
    }
}

/// 一个动作的人类可读描述
pub fn describe_action(action: &PlayerAction, me: &PlayerId) -> String {
    match action {
        PlayerAction::Take { object_to_take } => format!("take {}", describe_target(object_to_take, me)),
        PlayerAction::Protect { object_to_protect } => format!("poison {}", describe_target(object_to_protect, me)),
        PlayerAction::Discard { card_order } => format!("discard card {} from your hand", card_order + 1),
    }
}

fn describe_target(target: &Target, me: &PlayerId) -> String {
    let whose = |id: &PlayerId| if id == me { "your" } else { "the opponent's" };
    match target {
        Target::Deck => "the top of the deck".to_string(),
        Target::Card { player_id, card_order } => format!("card {} of {} hand", card_order + 1, whose(player_id)),
        Target::Discard { player_id } => format!("the top of {} discard pile", whose(player_id)),
        Target::Wager { player_id, amount } => format!("{} from {} wager", amount, whose(player_id)),
    }
}

impl SceneLookup for TerminalRenderer {
    fn locate(&self, object: ObjectRef) -> Option<SceneObject> {
        self.index.locate(object)
    }
}

impl Renderer for TerminalRenderer {
    fn on_state_changed(&mut self, state: &GameState) {
        self.index.rebuild(state, &self.me);
        self.state = Some(state.clone());
    }

    /// 合法动作总是紧跟在状态之后发布，所以在这里统一重画
    fn on_legal_actions_changed(&mut self, actions: &[PlayerAction]) {
        self.legal_actions = actions.to_vec();
        print!("{}", self.render());
    }

    fn on_eliminated(&mut self, which: Side) {
        match which {
            Side::Me => println!("You have been eliminated."),
            Side::Opponent => println!("Your opponent has been eliminated. You win!"),
        }
    }

    fn on_showdown(&mut self, message: &str) {
        println!("The deck is empty. Showdown!");
        println!("{}", message);
    }

    fn on_fatal_error(&mut self, message: &str) {
        println!("!! {}", message);
    }

    fn on_raw_event(&mut self, payload: &Value) {
        debug!(%payload, "未识别的推送事件");
    }

    fn on_phase_changed(&mut self, phase: Phase) {
        match phase {
            Phase::Idle => println!("Your move. Enter the number of an object marked with *."),
            Phase::Waiting => println!("Waiting for the server..."),
        }
    }

    fn on_submitted(&mut self, _object: Option<ObjectRef>, action: &PlayerAction) {
        println!("> {}", describe_action(action, &self.me));
    }

    fn on_notice(&mut self, message: &str) {
        println!("{}", message);
    }

    fn on_protect_mode_changed(&mut self, on: bool) {
        self.protect_mode = on;
        println!("Poison mode {}.", if on { "ON" } else { "OFF" });
        if self.state.is_some() {
            print!("{}", self.render());
        }
    }
}
