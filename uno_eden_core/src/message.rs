use crate::card::{Card, Color};
use crate::error::GameError;
use crate::logic::GameEvent;
use crate::state::{GameView, PlayerId, Room, RoomCode, RoomStatus, RoomSummary};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 每个变体对应网关里的一次房间或游戏操作。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// 请求大厅里可加入的房间列表
    ListRooms,
    /// 创建新房间，自己成为房主
    CreateRoom,
    JoinRoom { room_code: RoomCode },
    LeaveRoom { room_code: RoomCode },
    /// 房主开始游戏
    StartGame { room_code: RoomCode },
    /// 打出手牌中第 `hand_index` 张，万能牌必须指定颜色
    PlayCard {
        room_code: RoomCode,
        hand_index: usize,
        #[serde(default)]
        chosen_color: Option<Color>,
    },
    DrawCard { room_code: RoomCode },
    CallUno { room_code: RoomCode },
    /// 质疑 `target` 只剩一张牌却没有喊 UNO
    ChallengeUno { room_code: RoomCode, target: String },
}

/// 操作类型，用于给发起者回执
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListRooms,
    CreateRoom,
    JoinRoom,
    LeaveRoom,
    StartGame,
    PlayCard,
    DrawCard,
    CallUno,
    ChallengeUno,
}

impl ClientMessage {
    pub fn action(&self) -> Action {
        match self {
            ClientMessage::ListRooms => Action::ListRooms,
            ClientMessage::CreateRoom => Action::CreateRoom,
            ClientMessage::JoinRoom { .. } => Action::JoinRoom,
            ClientMessage::LeaveRoom { .. } => Action::LeaveRoom,
            ClientMessage::StartGame { .. } => Action::StartGame,
            ClientMessage::PlayCard { .. } => Action::PlayCard,
            ClientMessage::DrawCard { .. } => Action::DrawCard,
            ClientMessage::CallUno { .. } => Action::CallUno,
            ClientMessage::ChallengeUno { .. } => Action::ChallengeUno,
        }
    }
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 连接建立后私密地发给该连接
    Welcome { your_id: PlayerId, name: String },

    // --- 房间管理消息 ---
    RoomList { rooms: Vec<RoomSummary> },
    /// 只发给创建者
    RoomCreated { room_code: RoomCode, players: Vec<String> },
    /// 只发给加入者
    RoomJoined { room_code: RoomCode, players: Vec<String> },
    /// 只发给离开者
    RoomLeft { room_code: RoomCode },
    /// 成员或状态变化，发给房间内所有人
    RoomUpdated { room_code: RoomCode, players: Vec<String>, status: RoomStatus },
    /// 可加入的房间列表可能变了，发给所有连接，客户端可以重新拉取列表
    RoomsUpdated,

    // --- 游戏状态更新消息 ---
    /// 开局快照，每个人只看得到自己的手牌
    GameStarted(GameView),
    /// 每次出牌/摸牌后的快照，同样按接收者过滤
    GameState(GameView),
    /// 只发给摸牌的人
    CardDrawn { drawn: Vec<Card>, hand: Vec<Card> },
    UnoCalled { player: String },
    ChallengeResult {
        challenger: String,
        target: String,
        succeeded: bool,
        penalized: String,
        penalty: usize,
    },
    GameOver { winner: String },

    /// 操作成功的回执
    Accepted { action: Action },
    /// 服务器向特定客户端发送错误信息
    Error { error: GameError, message: String },
}

impl ServerMessage {
    pub fn error(error: GameError) -> Self {
        ServerMessage::Error { error, message: error.to_string() }
    }
}

/// 消息的接收者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Player(PlayerId),
    /// 所有在线连接，仅用于大厅通知
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Recipient,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn to_player(id: PlayerId, message: ServerMessage) -> Self {
        Outbound { to: Recipient::Player(id), message }
    }

    pub fn to_everyone(message: ServerMessage) -> Self {
        Outbound { to: Recipient::Everyone, message }
    }
}

impl Room {
    /// 把一组事件转换成具体发给每个成员的消息。
    /// 必须在修改房间的同一把锁内调用，保证消息和已提交的状态一致。
    pub fn render(&self, events: &[GameEvent]) -> Vec<Outbound> {
        let mut out = Vec::new();
        for event in events {
            match event {
                GameEvent::RosterChanged => {
                    self.broadcast(&mut out, ServerMessage::RoomUpdated {
                        room_code: self.code.clone(),
                        players: self.member_names(),
                        status: self.status,
                    });
                }
                GameEvent::GameStarted => {
                    for m in &self.members {
                        out.push(Outbound::to_player(m.id, ServerMessage::GameStarted(self.view_for(&m.id))));
                    }
                }
                GameEvent::StateChanged => {
                    for m in &self.members {
                        out.push(Outbound::to_player(m.id, ServerMessage::GameState(self.view_for(&m.id))));
                    }
                }
                GameEvent::CardsDrawn { player, count } => {
                    if let Some(hand) = self.hand_of(player) {
                        let drawn = hand[hand.len().saturating_sub(*count)..].to_vec();
                        out.push(Outbound::to_player(*player, ServerMessage::CardDrawn {
                            drawn,
                            hand: hand.to_vec(),
                        }));
                    }
                }
                GameEvent::UnoCalled { player } => {
                    self.broadcast(&mut out, ServerMessage::UnoCalled { player: self.name_of(player) });
                }
                GameEvent::ChallengeResolved { challenger, target, succeeded, penalized, count } => {
                    self.broadcast(&mut out, ServerMessage::ChallengeResult {
                        challenger: self.name_of(challenger),
                        target: self.name_of(target),
                        succeeded: *succeeded,
                        penalized: self.name_of(penalized),
                        penalty: *count,
                    });
                }
                GameEvent::GameOver { winner } => {
                    self.broadcast(&mut out, ServerMessage::GameOver { winner: self.name_of(winner) });
                }
            }
        }
        out
    }

    fn broadcast(&self, out: &mut Vec<Outbound>, message: ServerMessage) {
        for m in &self.members {
            out.push(Outbound::to_player(m.id, message.clone()));
        }
    }
}
