use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

// --- 核心数据结构定义 ---

/// 点数: 1 = Ace, 11 = Jack, 12 = Queen, 13 = King
pub type Rank = u8;
/// 花色: 1..=4
pub type Suit = u8;

pub const ACE: Rank = 1;
pub const KING: Rank = 13;
/// 顺子里 Ace 作为最大牌时记作 14
pub const ACE_HIGH: Rank = 14;

/// 参与评估的最多牌数
pub const MAX_HAND_CARDS: usize = 7;
/// 少于这个牌数时只能组成 高牌 / 对子 / 三条
const SHAPED_HAND_MIN: usize = 3;

/// 单张扑克牌 (Card)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

/// 手牌和弃牌堆里的牌，服务器会单独标记它是否被下毒保护
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct HeldCard {
    #[serde(flatten)]
    pub card: Card,
    #[serde(default)]
    pub protected: bool,
}

impl HeldCard {
    pub fn new(card: Card) -> HeldCard {
        HeldCard { card, protected: false }
    }
}

/// 牌型类别，数值越大越强
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard = 1,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

/// 评估结果: 牌型类别 + 从大到小的比较序列
///
/// 比较时先比类别，再逐位比较 `tiebreakers`，缺失的位置按 0 处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedHand {
    pub category: HandCategory,
    pub tiebreakers: Vec<Rank>,
}

impl PartialEq for EvaluatedHand {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EvaluatedHand {}

impl PartialOrd for EvaluatedHand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvaluatedHand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category.cmp(&other.category).then_with(|| {
            let len = self.tiebreakers.len().max(other.tiebreakers.len());
            (0..len)
                .map(|i| {
                    let a = self.tiebreakers.get(i).copied().unwrap_or(0);
                    let b = other.tiebreakers.get(i).copied().unwrap_or(0);
                    a.cmp(&b)
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        })
    }
}

/// 比牌结论，`result` 以第一手牌的视角给出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub result: Ordering,
    pub message: String,
}

// --- 实现辅助功能 ---

/// 牌面名称 (Ace, 2..10, Jack, Queen, King)
pub fn card_name(rank: Rank) -> String {
    match rank {
        ACE | ACE_HIGH => "Ace".to_string(),
        11 => "Jack".to_string(),
        12 => "Queen".to_string(),
        KING => "King".to_string(),
        n => n.to_string(),
    }
}

fn suit_name(suit: Suit) -> &'static str {
    match suit {
        1 => "red",
        2 => "black",
        3 => "blue",
        4 => "green",
        _ => "?",
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", card_name(self.rank), suit_name(self.suit))
    }
}

impl fmt::Display for HeldCard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.card)
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            HandCategory::HighCard => "High card",
            HandCategory::Pair => "Pair",
            HandCategory::TwoPair => "Two pair",
            HandCategory::ThreeOfAKind => "Three of a kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full house",
            HandCategory::FourOfAKind => "Four of a kind",
            HandCategory::StraightFlush => "Straight flush",
        })
    }
}

impl fmt::Display for EvaluatedHand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = |i: usize| card_name(self.tiebreakers.get(i).copied().unwrap_or(0));
        match self.category {
            HandCategory::StraightFlush => write!(f, "a straight flush with high card {}", name(0)),
            HandCategory::FourOfAKind => write!(f, "four of a kind, {}s", name(0)),
            HandCategory::FullHouse => write!(f, "a full house, {}s over {}s", name(0), name(1)),
            HandCategory::Flush => write!(f, "a flush with high card {}", name(0)),
            HandCategory::Straight => write!(f, "a straight with high card {}", name(0)),
            HandCategory::ThreeOfAKind => write!(f, "three of a kind, {}s", name(0)),
            HandCategory::TwoPair => write!(f, "two pair, {}s and {}s", name(0), name(1)),
            HandCategory::Pair => write!(f, "a pair of {}s", name(0)),
            HandCategory::HighCard => write!(f, "high card {}", name(0)),
        }
    }
}

// --- 牌型评估逻辑 ---

/// 评估 1 到 7 张牌的牌力
///
/// 牌局可能在牌堆耗尽时以不足 5 张的手牌结束，因此同花和顺子只要求
/// 至少 3 张并且所有牌都参与组成；少于 3 张时只可能是三条、对子或高牌。
///
/// # Panics
/// 如果牌数为 0 或多于 7，则会 panic。
pub fn evaluate(cards: &[Card]) -> EvaluatedHand {
    assert!(
        (1..=MAX_HAND_CARDS).contains(&cards.len()),
        "hand must hold between 1 and {} cards, got {}",
        MAX_HAND_CARDS,
        cards.len()
    );

    // 从大到小排列的全部点数
    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_by(|a, b| b.cmp(a));

    // 统计点数出现次数，按 (次数, 点数) 从大到小排序
    let mut counts: HashMap<Rank, u8> = HashMap::new();
    for rank in &ranks {
        *counts.entry(*rank).or_insert(0) += 1;
    }
    let mut sorted_counts: Vec<(u8, Rank)> = counts.into_iter().map(|(r, c)| (c, r)).collect();
    sorted_counts.sort_by(|a, b| b.cmp(a));

    let grouped: Vec<Rank> = sorted_counts.iter().map(|&(_, r)| r).collect();
    let top = sorted_counts[0].0;
    let second = sorted_counts.get(1).map_or(0, |&(c, _)| c);

    let hand = |category: HandCategory, tiebreakers: Vec<Rank>| EvaluatedHand { category, tiebreakers };

    if cards.len() < SHAPED_HAND_MIN {
        return match top {
            3 => hand(HandCategory::ThreeOfAKind, grouped),
            2 => hand(HandCategory::Pair, grouped),
            _ => hand(HandCategory::HighCard, ranks),
        };
    }

    let is_flush = cards.windows(2).all(|w| w[0].suit == w[1].suit);
    let straight_high = straight_high_card(&ranks);

    match (straight_high, is_flush) {
        (Some(high), true) => return hand(HandCategory::StraightFlush, vec![high]),
        _ if top == 4 => return hand(HandCategory::FourOfAKind, grouped),
        _ if top == 3 && second == 2 => return hand(HandCategory::FullHouse, grouped),
        (_, true) => return hand(HandCategory::Flush, ranks),
        (Some(high), false) => return hand(HandCategory::Straight, vec![high]),
        (None, false) => {}
    }

    match (top, second) {
        (3, _) => hand(HandCategory::ThreeOfAKind, grouped),
        (2, 2) => hand(HandCategory::TwoPair, grouped),
        (2, _) => hand(HandCategory::Pair, grouped),
        _ => hand(HandCategory::HighCard, ranks),
    }
}

/// 同 [`evaluate`]，但空手牌或牌数过多时返回 `None`
pub fn try_evaluate(cards: &[Card]) -> Option<EvaluatedHand> {
    (1..=MAX_HAND_CARDS).contains(&cards.len()).then(|| evaluate(cards))
}

/// 检查 (从大到小排好的) 点数是否构成顺子，返回顺子的最大牌
///
/// 所有牌点数互不相同且连续。Ace 默认为 1，因此 A-2-3-4-5 自然以 5 为最大牌；
/// 只有在 Ace 当作 14 时才连续的情况 (例如 10-J-Q-K-A) 以 14 为最大牌。
fn straight_high_card(ranks: &[Rank]) -> Option<Rank> {
    let is_run = |rs: &[Rank]| rs.windows(2).all(|w| w[0] == w[1] + 1);

    if is_run(ranks) {
        return Some(ranks[0]);
    }
    if ranks.contains(&ACE) {
        let mut ace_high: Vec<Rank> = ranks
            .iter()
            .map(|&r| if r == ACE { ACE_HIGH } else { r })
            .collect();
        ace_high.sort_by(|a, b| b.cmp(a));
        if is_run(&ace_high) {
            return Some(ACE_HIGH);
        }
    }
    None
}

// --- 牌力比较 ---

/// 以 `a` 的视角比较两手牌，并给出描述胜负的句子
///
/// # Panics
/// 任意一手牌为空或多于 7 张时 panic，见 [`evaluate`]。
pub fn compare(a: &[Card], b: &[Card]) -> Verdict {
    let eval_a = evaluate(a);
    let eval_b = evaluate(b);
    let result = eval_a.cmp(&eval_b);

    let message = match result {
        Ordering::Greater => format!("You won with {} against {}.", eval_a, eval_b),
        Ordering::Less => format!("You lost with {} against {}.", eval_a, eval_b),
        Ordering::Equal => format!("It's a tie: both have {}.", eval_a),
    };
    Verdict { result, message }
}

// --- 单元测试 ---
