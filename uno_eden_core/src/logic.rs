use crate::card::*;
use crate::error::GameError;
use crate::state::*;
use rand::Rng;
use std::collections::HashMap;

/// 一次操作产生的领域事件，由 `Room::render` 转换成发给各个连接的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// 成员列表或房间状态变化
    RosterChanged,
    GameStarted,
    /// 顶牌、当前玩家、颜色或手牌数量变化
    StateChanged,
    CardsDrawn { player: PlayerId, count: usize },
    UnoCalled { player: PlayerId },
    ChallengeResolved {
        challenger: PlayerId,
        target: PlayerId,
        succeeded: bool,
        penalized: PlayerId,
        count: usize,
    },
    GameOver { winner: PlayerId },
}

type Events = Result<Vec<GameEvent>, GameError>;

// --- 房间成员管理 ---

impl Room {
    /// 加入等待中的房间，成员追加在队尾
    pub fn join(&mut self, member: Member) -> Events {
        if self.closed {
            return Err(GameError::RoomNotFound);
        }
        if self.status != RoomStatus::Waiting {
            return Err(GameError::RoomNotJoinable);
        }
        if self.members.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        if self.is_member(&member.id) {
            return Err(GameError::AlreadyInRoom);
        }
        // 对手手牌数和质疑目标都按名字查找
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(GameError::NameTaken);
        }
        self.members.push(member);
        Ok(vec![GameEvent::RosterChanged])
    }

    /// 离开房间。不是成员时什么也不做。
    ///
    /// 对局中离开：
    /// - 手牌放回牌堆底部，保证总牌数不变；
    /// - 如果轮到的正是他，行动权按当前方向交给下一位；
    /// - 剩下不足两人时游戏结束，剩下的那位获胜。
    pub fn leave(&mut self, id: &PlayerId) -> Vec<GameEvent> {
        let Some(idx) = self.member_index(id) else {
            return vec![];
        };
        let was_current = self.current_player == Some(*id);
        self.members.remove(idx);

        if let Some(mut hand) = self.hands.remove(id) {
            hand.append(&mut self.deck);
            self.deck = hand;
        }
        if self.uno_caller == Some(*id) {
            self.uno_caller = None;
        }

        let mut events = vec![GameEvent::RosterChanged];
        if self.members.is_empty() {
            self.current_player = None;
            self.closed = true;
            return events;
        }

        if self.status == RoomStatus::Active {
            if self.members.len() < MIN_PLAYERS {
                let winner = self.members[0].id;
                self.finish(winner);
                events.push(GameEvent::StateChanged);
                events.push(GameEvent::GameOver { winner });
                return events;
            }
            if was_current {
                // 顺时针时，原先排在他后面的人现在正好占据 idx
                let len = self.members.len();
                let next = match self.direction {
                    Direction::Clockwise => idx % len,
                    Direction::CounterClockwise => (idx + len - 1) % len,
                };
                self.current_player = Some(self.members[next].id);
            }
            events.push(GameEvent::StateChanged);
        }
        events
    }
}

// --- 核心游戏流程 ---

impl Room {
    /// 开始游戏
    ///
    /// - 只有房主可以开始，且至少需要两名成员；
    /// - 新建一副牌并洗牌，每人按顺序一次发 7 张；
    /// - 翻开一张作为弃牌堆顶牌，颜色取顶牌颜色（万能牌默认红色）；
    /// - 房主先出，方向为顺时针。
    pub fn start_game<R: Rng + ?Sized>(&mut self, caller: &PlayerId, rng: &mut R) -> Events {
        if self.owner().map(|m| m.id) != Some(*caller) {
            return Err(GameError::NotOwner);
        }
        if self.status != RoomStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if self.members.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut deck = build_standard_deck();
        shuffle(&mut deck, rng);

        let mut hands = HashMap::with_capacity(self.members.len());
        for member in &self.members {
            let at = deck.len().saturating_sub(HAND_SIZE);
            hands.insert(member.id, deck.split_off(at));
        }

        let top = deck.pop();
        self.deck = deck;
        self.hands = hands;
        self.discard_pile = top.into_iter().collect();
        self.current_color = Some(top.and_then(|c| c.color()).unwrap_or(Color::Red));
        self.current_player = self.owner().map(|m| m.id);
        self.direction = Direction::Clockwise;
        self.uno_caller = None;
        self.winner = None;
        self.status = RoomStatus::Active;

        Ok(vec![GameEvent::RosterChanged, GameEvent::GameStarted])
    }

    /// 出牌
    ///
    /// 校验全部通过后才修改状态，任何错误都不会改动房间。
    /// 出完最后一张牌立即获胜，不再结算功能牌效果。
    pub fn play_card<R: Rng + ?Sized>(
        &mut self,
        actor: &PlayerId,
        hand_index: usize,
        chosen_color: Option<Color>,
        rng: &mut R,
    ) -> Events {
        self.ensure_active()?;
        if self.current_player != Some(*actor) {
            return Err(GameError::NotActivePlayer);
        }

        let top = self.discard_pile.last().copied();
        let current_color = self.current_color.unwrap_or(Color::Red);
        let hand = self.hands.get_mut(actor).ok_or(GameError::PlayerNotFound)?;
        let card = *hand.get(hand_index).ok_or(GameError::InvalidCardIndex)?;

        if !top.is_none_or(|top| card.matches(&top, current_color)) {
            return Err(GameError::IllegalPlay);
        }
        let new_color = match card.color() {
            Some(color) => color,
            None => chosen_color.ok_or(GameError::IllegalPlay)?,
        };

        hand.remove(hand_index);
        let emptied = hand.is_empty();
        self.discard_pile.push(card);
        self.current_color = Some(new_color);

        if emptied {
            self.finish(*actor);
            return Ok(vec![GameEvent::StateChanged, GameEvent::GameOver { winner: *actor }]);
        }

        let mut events = vec![GameEvent::StateChanged];
        match card.kind() {
            CardKind::Skip => {
                self.advance_turn();
                self.advance_turn();
            }
            CardKind::Reverse => {
                self.direction = self.direction.flip();
                self.advance_turn();
            }
            CardKind::DrawTwo | CardKind::WildDrawFour => {
                let penalty = if card.kind() == CardKind::DrawTwo { 2 } else { 4 };
                self.advance_turn();
                if let Some(victim) = self.current_player {
                    let count = self.draw_into(&victim, penalty, rng);
                    events.push(GameEvent::CardsDrawn { player: victim, count });
                }
                self.advance_turn();
            }
            CardKind::Number(_) | CardKind::Wild => self.advance_turn(),
        }
        Ok(events)
    }

    /// 摸一张牌，然后轮到下一位
    pub fn draw_card<R: Rng + ?Sized>(&mut self, actor: &PlayerId, rng: &mut R) -> Events {
        self.ensure_active()?;
        if self.current_player != Some(*actor) {
            return Err(GameError::NotActivePlayer);
        }
        if !self.hands.contains_key(actor) {
            return Err(GameError::PlayerNotFound);
        }

        let count = self.draw_into(actor, 1, rng);
        self.advance_turn();
        Ok(vec![GameEvent::CardsDrawn { player: *actor, count }, GameEvent::StateChanged])
    }

    /// 喊 UNO，任何时候都可以喊，但手上必须正好剩一张牌
    pub fn call_uno(&mut self, actor: &PlayerId) -> Events {
        self.ensure_active()?;
        let hand = self.hands.get(actor).ok_or(GameError::PlayerNotFound)?;
        if hand.len() != 1 {
            return Err(GameError::InvalidUnoCall);
        }
        self.uno_caller = Some(*actor);
        Ok(vec![GameEvent::UnoCalled { player: *actor }])
    }

    /// 质疑某位只剩一张牌的玩家没有喊 UNO。
    ///
    /// 对方已经喊过：质疑失败，质疑者罚摸 1 张；
    /// 否则质疑成功，被质疑者罚摸 2 张。
    pub fn challenge_uno<R: Rng + ?Sized>(&mut self, challenger: &PlayerId, target_name: &str, rng: &mut R) -> Events {
        self.ensure_active()?;
        if !self.hands.contains_key(challenger) {
            return Err(GameError::PlayerNotFound);
        }
        let target = self
            .members
            .iter()
            .find(|m| m.name == target_name && self.hands.contains_key(&m.id))
            .map(|m| m.id)
            .ok_or(GameError::TargetNotFound)?;
        if target == *challenger || self.hands.get(&target).map_or(0, Vec::len) != 1 {
            return Err(GameError::InvalidChallenge);
        }

        let called = self.uno_caller == Some(target);
        let (penalized, penalty) = if called { (*challenger, 1) } else { (target, 2) };
        let count = self.draw_into(&penalized, penalty, rng);

        Ok(vec![
            GameEvent::ChallengeResolved {
                challenger: *challenger,
                target,
                succeeded: !called,
                penalized,
                count,
            },
            GameEvent::CardsDrawn { player: penalized, count },
            GameEvent::StateChanged,
        ])
    }

    /// 按方向把行动权交给下一位成员。
    /// 当前玩家已不在成员列表中时，从房主重新开始。
    pub fn advance_turn(&mut self) {
        let len = self.members.len();
        if len == 0 {
            self.current_player = None;
            return;
        }
        let next = match self.current_player.and_then(|id| self.member_index(&id)) {
            Some(idx) => self.direction.step(idx, len),
            None => 0,
        };
        self.current_player = Some(self.members[next].id);
    }

    /// 把弃牌堆除顶牌以外的牌洗回牌堆，顶牌留在弃牌堆
    pub fn recycle_discard_pile<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(top) = self.discard_pile.pop() else {
            return;
        };
        let mut recycled = std::mem::take(&mut self.discard_pile);
        shuffle(&mut recycled, rng);
        self.deck.append(&mut recycled);
        self.discard_pile.push(top);
    }
}

// --- 辅助逻辑函数 ---

impl Room {
    fn ensure_active(&self) -> Result<(), GameError> {
        match self.status {
            RoomStatus::Active => Ok(()),
            RoomStatus::GameOver => Err(GameError::GameOver),
            RoomStatus::Waiting => Err(GameError::RoomNotActive),
        }
    }

    fn finish(&mut self, winner: PlayerId) {
        self.status = RoomStatus::GameOver;
        self.winner = Some(winner);
        self.current_player = None;
    }

    /// 给玩家摸 `count` 张牌，牌堆空了就回收弃牌堆。
    /// 牌彻底摸完时提前停止，返回实际摸到的张数。
    fn draw_into<R: Rng + ?Sized>(&mut self, player: &PlayerId, count: usize, rng: &mut R) -> usize {
        let mut drawn = 0;
        for _ in 0..count {
            if self.deck.is_empty() {
                self.recycle_discard_pile(rng);
            }
            let Some(card) = self.deck.pop() else {
                break;
            };
            self.hands.entry(*player).or_default().push(card);
            drawn += 1;
        }
        if drawn > 0 && self.uno_caller == Some(*player) {
            self.uno_caller = None;
        }
        drawn
    }
}

// --- 单元测试 ---
