use crate::message::{PlayerAction, Target};
use crate::scene::{ObjectRef, SceneLookup, SceneObject};
use crate::state::{GameState, PlayerId};
use tracing::debug;

/// 界面上的保护模式开关
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    pub protect: bool,
}

/// 把点击翻译成领域坐标所需的上下文
pub struct ResolveContext<'a> {
    /// 当前操作的 (本地) 玩家
    pub me: PlayerId,
    pub opponent: Option<PlayerId>,
    /// 合法动作所对应的那份状态，用来识别已经失效的手牌位置
    pub state: &'a GameState,
    pub lookup: &'a dyn SceneLookup,
}

impl ResolveContext<'_> {
    fn is_known_player(&self, id: &PlayerId) -> bool {
        *id == self.me || Some(*id) == self.opponent
    }
}

/// 把一次点击映射到唯一的一个合法动作
///
/// 按合法动作列表的顺序逐个匹配，第一个匹配的胜出：
/// - 保护模式下只考虑 `protect` 动作；
/// - 否则 `discard` 只匹配自己手牌的对应位置，`take` 匹配牌堆、
///   指定玩家的弃牌堆/赌注或指定玩家指定位置的手牌。
///
/// 点击到未被跟踪的对象、已失效的手牌位置，或者没有任何动作匹配时返回 `None`，
/// 这是“点了一个此刻没有意义的东西”的正常情况，不是错误。
pub fn resolve(
    object: ObjectRef,
    legal_actions: &[PlayerAction],
    mode: Mode,
    ctx: &ResolveContext,
) -> Option<PlayerAction> {
    let Some(located) = ctx.lookup.locate(object) else {
        debug!(?object, "gesture on an untracked object");
        return None;
    };

    match located {
        SceneObject::Deck => {}
        SceneObject::HandCard { owner, position } => {
            let len = ctx.is_known_player(&owner).then(|| ctx.state.hand_len(&owner)).flatten();
            if !len.is_some_and(|len| position < len) {
                debug!(?object, %owner, position, "stale hand position, ignoring gesture");
                return None;
            }
        }
        SceneObject::DiscardPile { owner } | SceneObject::Wager { owner } => {
            if !ctx.is_known_player(&owner) || ctx.state.player(&owner).is_none() {
                debug!(?object, %owner, "gesture on an object of an unknown player");
                return None;
            }
        }
    }

    legal_actions
        .iter()
        .find(|action| matches_action(action, &located, mode, ctx))
        .cloned()
}

/// 这个点击此刻是否对应某个合法动作 (用于悬停高亮)
pub fn is_actionable(object: ObjectRef, legal_actions: &[PlayerAction], mode: Mode, ctx: &ResolveContext) -> bool {
    resolve(object, legal_actions, mode, ctx).is_some()
}

fn matches_action(action: &PlayerAction, object: &SceneObject, mode: Mode, ctx: &ResolveContext) -> bool {
    match (mode.protect, action) {
        (true, PlayerAction::Protect { object_to_protect }) => targets(object_to_protect, object),
        // 弃牌只能弃自己的牌，点到对手的同一位置不算
        (false, PlayerAction::Discard { card_order }) => matches!(
            object,
            SceneObject::HandCard { owner, position } if *owner == ctx.me && position == card_order
        ),
        (false, PlayerAction::Take { object_to_take }) => targets(object_to_take, object),
        _ => false,
    }
}

/// 目标与点击的对象是否是同一个东西，玩家一律按 id 比较
fn targets(target: &Target, object: &SceneObject) -> bool {
    match (target, object) {
        (Target::Deck, SceneObject::Deck) => true,
        (Target::Card { player_id, card_order }, SceneObject::HandCard { owner, position }) => {
            player_id == owner && card_order == position
        }
        (Target::Discard { player_id }, SceneObject::DiscardPile { owner }) => player_id == owner,
        (Target::Wager { player_id, .. }, SceneObject::Wager { owner }) => player_id == owner,
        _ => false,
    }
}
