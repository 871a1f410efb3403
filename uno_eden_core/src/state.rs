use crate::card::{Card, Color};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// 一个连接的唯一标识，连接建立时由服务器分配
pub type PlayerId = Uuid;
/// 四位数字的房间号，例如 "4821"
pub type RoomCode = String;

/// 每名玩家开局的手牌数
pub const HAND_SIZE: usize = 7;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// 连接标识 -> 显示名称 的映射。
/// 由外部的登录/聊天模块提供，这里只读不写。
pub trait NameDirectory {
    fn display_name(&self, id: &PlayerId) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Active,
    GameOver, // 终态，直到所有人离开房间
}

/// 出牌方向，对应成员列表中的 +1 / -1
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn flip(self) -> Direction {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// 在长度为 `len` 的环上从 `idx` 走一步
    pub fn step(self, idx: usize, len: usize) -> usize {
        match self {
            Direction::Clockwise => (idx + 1) % len,
            Direction::CounterClockwise => (idx + len - 1) % len,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: PlayerId,
    pub name: String, // 加入房间时从 NameDirectory 读到的名称
}

impl Member {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Member { id, name: name.into() }
    }
}

/// 单个房间的权威状态
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    // 成员顺序即出牌顺序，members[0] 是房主
    pub members: Vec<Member>,
    pub status: RoomStatus,
    // 牌堆，从末尾摸牌
    pub deck: Vec<Card>,
    pub hands: HashMap<PlayerId, Vec<Card>>,
    // 弃牌堆，最后一张是顶牌
    pub discard_pile: Vec<Card>,
    pub current_player: Option<PlayerId>,
    pub current_color: Option<Color>,
    pub direction: Direction,
    // 最近一次喊了 UNO 的玩家
    pub uno_caller: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    // 最后一名成员离开后置位，此后任何人都不能再加入
    pub closed: bool,
}

/// 大厅里展示的房间信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub owner: String,
    pub players: Vec<String>,
    pub player_count: usize,
}

/// 发给某一位玩家的游戏快照。
/// 只包含他自己的手牌，其他人只能看到手牌数量。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameView {
    pub room_code: RoomCode,
    pub status: RoomStatus,
    pub top_card: Option<Card>,
    pub current_player: Option<String>,
    pub current_color: Option<Color>,
    pub direction: Direction,
    pub hand: Vec<Card>,
    pub opponent_hand_sizes: BTreeMap<String, usize>,
    pub deck_size: usize,
    pub uno_caller: Option<String>,
    pub winner: Option<String>,
}

// --- Room 的实现方法 ---

impl Room {
    pub fn new(code: RoomCode, owner: Member) -> Self {
        Room {
            code,
            members: vec![owner],
            status: RoomStatus::Waiting,
            deck: Vec::new(),
            hands: HashMap::new(),
            discard_pile: Vec::new(),
            current_player: None,
            current_color: None,
            direction: Direction::Clockwise,
            uno_caller: None,
            winner: None,
            closed: false,
        }
    }

    pub fn owner(&self) -> Option<&Member> {
        self.members.first()
    }

    pub fn is_member(&self, id: &PlayerId) -> bool {
        self.members.iter().any(|m| m.id == *id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_index(&self, id: &PlayerId) -> Option<usize> {
        self.members.iter().position(|m| m.id == *id)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// 玩家的显示名称；已经离开的玩家返回占位名
    pub fn name_of(&self, id: &PlayerId) -> String {
        self.members
            .iter()
            .find(|m| m.id == *id)
            .map_or_else(|| "未知玩家".to_string(), |m| m.name.clone())
    }

    pub fn top_card(&self) -> Option<Card> {
        self.discard_pile.last().copied()
    }

    pub fn hand_of(&self, id: &PlayerId) -> Option<&[Card]> {
        self.hands.get(id).map(Vec::as_slice)
    }

    /// 牌堆 + 弃牌堆 + 所有手牌，开局后恒为 108
    pub fn total_cards(&self) -> usize {
        self.deck.len() + self.discard_pile.len() + self.hands.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_joinable(&self) -> bool {
        !self.closed && self.status == RoomStatus::Waiting && self.members.len() < MAX_PLAYERS
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            owner: self.owner().map_or_else(String::new, |m| m.name.clone()),
            players: self.member_names(),
            player_count: self.members.len(),
        }
    }

    pub fn view_for(&self, viewer: &PlayerId) -> GameView {
        let opponent_hand_sizes = self
            .members
            .iter()
            .filter(|m| m.id != *viewer)
            .filter_map(|m| self.hands.get(&m.id).map(|h| (m.name.clone(), h.len())))
            .collect();

        GameView {
            room_code: self.code.clone(),
            status: self.status,
            top_card: self.top_card(),
            current_player: self.current_player.map(|id| self.name_of(&id)),
            current_color: self.current_color,
            direction: self.direction,
            hand: self.hands.get(viewer).cloned().unwrap_or_default(),
            opponent_hand_sizes,
            deck_size: self.deck.len(),
            uno_caller: self.uno_caller.map(|id| self.name_of(&id)),
            winner: self.winner.map(|id| self.name_of(&id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with(names: &[&str]) -> (Room, Vec<PlayerId>) {
        let ids: Vec<PlayerId> = names.iter().map(|_| Uuid::new_v4()).collect();
        let mut room = Room::new("1234".to_string(), Member::new(ids[0], names[0]));
        for (id, name) in ids.iter().zip(names).skip(1) {
            room.members.push(Member::new(*id, *name));
        }
        (room, ids)
    }

    #[test]
    fn test_direction_step_wraps() {
        assert_eq!(Direction::Clockwise.step(2, 3), 0);
        assert_eq!(Direction::CounterClockwise.step(0, 3), 2);
        assert_eq!(Direction::Clockwise.flip(), Direction::CounterClockwise);
    }

    #[test]
    fn test_new_room_is_waiting_with_owner() {
        let (room, ids) = room_with(&["alice"]);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.owner().map(|m| m.id), Some(ids[0]));
        assert!(room.is_joinable());
    }

    #[test]
    fn test_full_room_is_not_joinable() {
        let (room, _) = room_with(&["a", "b", "c", "d"]);
        assert!(!room.is_joinable());
    }

    #[test]
    fn test_summary() {
        let (room, _) = room_with(&["alice", "bob"]);
        let summary = room.summary();
        assert_eq!(summary.owner, "alice");
        assert_eq!(summary.players, vec!["alice", "bob"]);
        assert_eq!(summary.player_count, 2);
    }

    #[test]
    fn test_view_hides_opponent_cards() {
        let (mut room, ids) = room_with(&["alice", "bob", "carol"]);
        room.hands.insert(ids[0], vec![Card::number(Color::Red, 1)]);
        room.hands.insert(ids[1], vec![Card::wild(), Card::skip(Color::Blue)]);
        room.hands.insert(ids[2], vec![Card::number(Color::Green, 9); 3]);
        room.current_player = Some(ids[1]);

        let view = room.view_for(&ids[0]);
        assert_eq!(view.hand, vec![Card::number(Color::Red, 1)]);
        assert_eq!(view.opponent_hand_sizes.len(), 2);
        assert_eq!(view.opponent_hand_sizes["bob"], 2);
        assert_eq!(view.opponent_hand_sizes["carol"], 3);
        assert!(!view.opponent_hand_sizes.contains_key("alice"));
        assert_eq!(view.current_player.as_deref(), Some("bob"));
    }

    #[test]
    fn test_view_for_spectator_has_empty_hand() {
        let (room, _) = room_with(&["alice"]);
        let view = room.view_for(&Uuid::new_v4());
        assert!(view.hand.is_empty());
        assert_eq!(view.opponent_hand_sizes.len(), 0);
    }
}
