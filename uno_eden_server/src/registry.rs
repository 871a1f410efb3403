//! 房间注册表：房间号 -> 房间。
//!
//! 重要‼️：加锁顺序
//! - `rooms` 的分片锁只在查找/插入/删除时短暂持有，持有期间不会去锁房间；
//! - 唯一的嵌套是创建房间时 `rooms` -> `memberships`；
//! - 房间锁内可以删除 `rooms` / `memberships` 中的条目，但反过来绝不在分片锁内锁房间。

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rand::Rng;
use tracing::info;

use uno_eden_core::{GameError, Member, Outbound, PlayerId, Room, RoomCode, RoomSummary};

pub type SharedRoom = Arc<Mutex<Room>>;

// 房间号冲突时的最大重试次数
const CODE_ATTEMPTS: usize = 64;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomCode, SharedRoom>,
    // 每个连接最多属于一个房间
    memberships: DashMap<PlayerId, RoomCode>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_of(&self, id: &PlayerId) -> Option<RoomCode> {
        self.memberships.get(id).map(|c| c.value().clone())
    }

    fn get(&self, code: &str) -> Option<SharedRoom> {
        self.rooms.get(code).map(|r| Arc::clone(r.value()))
    }

    // 所有房间的快照，遍历时不持有分片锁
    fn snapshot(&self) -> Vec<(RoomCode, SharedRoom)> {
        self.rooms.iter().map(|e| (e.key().clone(), Arc::clone(e.value()))).collect()
    }

    fn claim(&self, id: PlayerId, code: &RoomCode) -> Result<(), GameError> {
        match self.memberships.entry(id) {
            Entry::Occupied(_) => Err(GameError::AlreadyInRoom),
            Entry::Vacant(slot) => {
                slot.insert(code.clone());
                Ok(())
            }
        }
    }

    /// 创建房间，返回房间号和成员名单
    pub fn create_room<R: Rng + ?Sized>(&self, owner: Member, rng: &mut R) -> Result<(RoomCode, Vec<String>), GameError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = rng.random_range(1000..=9999).to_string();
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                self.claim(owner.id, &code)?;
                info!("玩家 {} 创建了新房间 {}", owner.name, code);
                let room = Room::new(code.clone(), owner);
                let players = room.member_names();
                slot.insert(Arc::new(Mutex::new(room)));
                return Ok((code, players));
            }
        }
        Err(GameError::RoomCodesExhausted)
    }

    /// 加入房间，返回新的成员名单和要发给房间内成员的消息
    pub fn join_room(&self, code: &RoomCode, member: Member) -> Result<(Vec<String>, Vec<Outbound>), GameError> {
        let id = member.id;
        self.claim(id, code)?;

        let result = self.get(code).ok_or(GameError::RoomNotFound).and_then(|room| {
            let mut room = room.lock();
            let name = member.name.clone();
            let events = room.join(member)?;
            info!("玩家 {} 加入了房间 {}", name, code);
            Ok((room.member_names(), room.render(&events)))
        });

        if result.is_err() {
            self.memberships.remove_if(&id, |_, c| c == code);
        }
        result
    }

    /// 离开房间；不是成员时什么也不做
    pub fn leave_room(&self, code: &RoomCode, id: &PlayerId) -> Result<Vec<Outbound>, GameError> {
        let room = self.get(code).ok_or(GameError::RoomNotFound)?;
        Ok(self.depart(code, &room, id).unwrap_or_default())
    }

    /// 连接断开时调用，从所有包含该连接的房间中移除
    pub fn remove_identity_from_all_rooms(&self, id: &PlayerId) -> Vec<(RoomCode, Vec<Outbound>)> {
        self.snapshot()
            .into_iter()
            .filter_map(|(code, room)| self.depart(&code, &room, id).map(|out| (code, out)))
            .collect()
    }

    /// 在房间锁内执行一次操作
    pub fn with_room<T>(&self, code: &RoomCode, f: impl FnOnce(&mut Room) -> Result<T, GameError>) -> Result<T, GameError> {
        let room = self.get(code).ok_or(GameError::RoomNotFound)?;
        let mut room = room.lock();
        if room.closed {
            return Err(GameError::RoomNotFound);
        }
        f(&mut room)
    }

    /// 大厅列表：等待中且未满的房间，按房间号排序
    pub fn list_available_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .snapshot()
            .into_iter()
            .filter_map(|(_, room)| {
                let room = room.lock();
                room.is_joinable().then(|| room.summary())
            })
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    // 返回 None 表示 id 不是该房间成员
    fn depart(&self, code: &RoomCode, room: &SharedRoom, id: &PlayerId) -> Option<Vec<Outbound>> {
        let (outbound, emptied) = {
            let mut guard = room.lock();
            if !guard.is_member(id) {
                return None;
            }
            let events = guard.leave(id);
            (guard.render(&events), guard.is_empty())
        };

        self.memberships.remove_if(id, |_, c| c == code);
        if emptied {
            self.rooms.remove_if(code, |_, r| Arc::ptr_eq(r, room));
            info!("房间 {} 已空，已被移除", code);
        }
        Some(outbound)
    }
}
