use crate::card::{Card, HeldCard};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GameId = Uuid;
pub type PlayerId = Uuid;

/// 一局游戏的完整快照，由服务器持有，客户端只读地镜像
///
/// 每次拉取都会整体替换，不做增量修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub players: Vec<Player>,
    pub deck: Deck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub hand: Hand,
    pub discard_pile: DiscardPile,
    pub stack: Stack,
    pub wager: Wager,
    pub eliminated: bool,
}

/// 中间的牌堆，`protected` 表示整个牌堆被下毒
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub cards: Vec<Card>,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub cards: Vec<HeldCard>,
    #[serde(default)]
    pub protected: bool,
}

/// 弃牌堆，`cards[0]` 是最上面的牌 (服务器把新弃的牌插到最前面)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardPile {
    pub cards: Vec<HeldCard>,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    pub amount: f64,
    #[serde(default)]
    pub protected: bool,
}

/// 从本地玩家的视角区分双方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Me,
    Opponent,
}

// --- GameState 的实现方法 ---

impl GameState {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// 两人游戏中除 `me` 以外的那位玩家
    pub fn opponent_of(&self, me: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id != *me)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn deck_exhausted(&self) -> bool {
        self.deck.cards.is_empty()
    }

    /// 某位玩家当前手牌的张数，玩家不存在时为 `None`
    pub fn hand_len(&self, id: &PlayerId) -> Option<usize> {
        self.player(id).map(|p| p.hand.cards.len())
    }
}

impl Player {
    /// 手牌中不带保护标记的纯牌面，用于摊牌评估
    pub fn hand_cards(&self) -> Vec<Card> {
        self.hand.cards.iter().map(|held| held.card).collect()
    }

    pub fn discard_top(&self) -> Option<&HeldCard> {
        self.discard_pile.cards.first()
    }
}
