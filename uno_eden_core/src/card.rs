use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// --- 核心数据结构定义 ---

/// 一副标准 UNO 牌的张数
pub const DECK_SIZE: usize = 108;

/// 颜色 (Color)
/// 万能牌本身没有颜色，所以 `Card` 中用 `Option<Color>` 表示
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];
}

/// 牌面 (CardKind)
/// 数字牌携带 0-9 的点数，其余都是功能牌。
/// 两张牌"点数相同"指的就是牌面相同，例如 跳过 可以接 跳过。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum CardKind {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

impl CardKind {
    pub fn is_wild(self) -> bool {
        matches!(self, CardKind::Wild | CardKind::WildDrawFour)
    }
}

/// 单张 UNO 牌 (Card)
///
/// 字段私有，只能通过构造函数创建，从而保证：
/// 颜色为空 当且仅当 牌面是 Wild / WildDrawFour。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    kind: CardKind,
    color: Option<Color>,
}

impl Card {
    /// 数字牌
    ///
    /// # Panics
    /// 点数大于 9 时 panic。
    pub fn number(color: Color, value: u8) -> Card {
        assert!(value <= 9, "数字牌的点数必须在0到9之间");
        Card { kind: CardKind::Number(value), color: Some(color) }
    }

    pub fn skip(color: Color) -> Card {
        Card { kind: CardKind::Skip, color: Some(color) }
    }

    pub fn reverse(color: Color) -> Card {
        Card { kind: CardKind::Reverse, color: Some(color) }
    }

    pub fn draw_two(color: Color) -> Card {
        Card { kind: CardKind::DrawTwo, color: Some(color) }
    }

    pub fn wild() -> Card {
        Card { kind: CardKind::Wild, color: None }
    }

    pub fn wild_draw_four() -> Card {
        Card { kind: CardKind::WildDrawFour, color: None }
    }

    pub fn kind(&self) -> CardKind {
        self.kind
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn is_wild(&self) -> bool {
        self.kind.is_wild()
    }

    /// 出牌合法性判断：
    /// 颜色等于当前颜色，或与弃牌堆顶牌牌面相同，或者是万能牌。
    pub fn matches(&self, top: &Card, current_color: Color) -> bool {
        self.is_wild() || self.color == Some(current_color) || self.kind == top.kind
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Color::Red => "🔴",
            Color::Blue => "🔵",
            Color::Green => "🟢",
            Color::Yellow => "🟡",
        })
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CardKind::Number(v) => write!(f, "{}", v),
            CardKind::Skip => write!(f, "⊘"),
            CardKind::Reverse => write!(f, "⇄"),
            CardKind::DrawTwo => write!(f, "+2"),
            CardKind::Wild => write!(f, "W"),
            CardKind::WildDrawFour => write!(f, "W+4"),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.color {
            Some(color) => write!(f, "{}{}", color, self.kind),
            None => write!(f, "⚫{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无法识别的颜色: {0}")]
pub struct ParseColorError(String);

/// 控制台客户端用，接受 `red` / `r` 这样的写法，不区分大小写
impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(Color::Red),
            "blue" | "b" => Ok(Color::Blue),
            "green" | "g" => Ok(Color::Green),
            "yellow" | "y" => Ok(Color::Yellow),
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

// --- 牌组生成 ---

/// 创建一副完整的 108 张 UNO 牌，顺序固定（未洗牌）
///
/// 每种颜色：一张 0，1-9 各两张，跳过/反转/+2 各两张；
/// 另外 4 张万能牌和 4 张 +4 万能牌。
pub fn build_standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for &color in &Color::ALL {
        deck.push(Card::number(color, 0));
        for value in 1..=9 {
            deck.push(Card::number(color, value));
            deck.push(Card::number(color, value));
        }
        for make in [Card::skip, Card::reverse, Card::draw_two] {
            deck.push(make(color));
            deck.push(make(color));
        }
    }
    for _ in 0..4 {
        deck.push(Card::wild());
        deck.push(Card::wild_draw_four());
    }
    deck
}

/// 原地洗牌 (Fisher–Yates)，随机源由调用方注入，测试里可以传固定种子
pub fn shuffle<R: Rng + ?Sized>(deck: &mut [Card], rng: &mut R) {
    deck.shuffle(rng);
}

// --- 单元测试 ---
