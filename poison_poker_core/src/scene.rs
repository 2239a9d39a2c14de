use crate::state::{GameState, PlayerId};
use std::collections::HashMap;

/// 渲染层给每个可点击对象分配的句柄，本身没有任何领域含义
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef(pub u32);

/// 句柄背后的稳定标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneObject {
    Deck,
    HandCard { owner: PlayerId, position: usize },
    DiscardPile { owner: PlayerId },
    Wager { owner: PlayerId },
}

/// 从句柄反查稳定标识；句柄未被跟踪时返回 `None`，而不是报错
pub trait SceneLookup {
    fn locate(&self, object: ObjectRef) -> Option<SceneObject>;
}

/// 渲染层维护的 句柄 <-> 稳定标识 双向映射
///
/// 每次状态更新都整体重建。编号在重建之间继续递增、从不复用，
/// 所以上一帧的句柄只会查不到，而不会指向新画面里的另一个对象。
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    by_ref: HashMap<ObjectRef, SceneObject>,
    by_object: HashMap<SceneObject, ObjectRef>,
    next: u32,
}

impl SceneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一份状态建立全新的索引，见 [`SceneIndex::rebuild`]
    pub fn build(state: &GameState, me: &PlayerId) -> Self {
        let mut index = Self::new();
        index.rebuild(state, me);
        index
    }

    /// 丢弃所有旧句柄，按照画面上的布局顺序为当前状态里所有可点击的对象重新编号:
    /// 牌堆，然后自己的弃牌堆、赌注、手牌，最后是对手的。
    /// 空牌堆、空弃牌堆和为零的赌注不会被画出来，也就不会得到句柄。
    pub fn rebuild(&mut self, state: &GameState, me: &PlayerId) {
        self.by_ref.clear();
        self.by_object.clear();

        if !state.deck_exhausted() {
            self.insert(SceneObject::Deck);
        }
        let players = state.player(me).into_iter().chain(state.opponent_of(me));
        for player in players {
            let owner = player.id;
            if !player.discard_pile.cards.is_empty() {
                self.insert(SceneObject::DiscardPile { owner });
            }
            if player.wager.amount > 0.0 {
                self.insert(SceneObject::Wager { owner });
            }
            for position in 0..player.hand.cards.len() {
                self.insert(SceneObject::HandCard { owner, position });
            }
        }
    }

    /// 注册一个对象并返回它的句柄；重复注册返回已有句柄
    pub fn insert(&mut self, object: SceneObject) -> ObjectRef {
        if let Some(existing) = self.by_object.get(&object) {
            return *existing;
        }
        self.next += 1;
        let handle = ObjectRef(self.next);
        self.by_ref.insert(handle, object);
        self.by_object.insert(object, handle);
        handle
    }

    pub fn handle_of(&self, object: &SceneObject) -> Option<ObjectRef> {
        self.by_object.get(object).copied()
    }
}

impl SceneLookup for SceneIndex {
    fn locate(&self, object: ObjectRef) -> Option<SceneObject> {
        self.by_ref.get(&object).copied()
    }
}
