use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uno_eden_core::{GameError, NameDirectory, PlayerId};

/// 在线连接的显示名称。
/// 连接建立时登记，断开时注销；房间和游戏逻辑只通过 `NameDirectory` 读取。
/// 同一时刻一个名字只能属于一个连接。
#[derive(Default)]
pub struct Identities {
    names: DashMap<PlayerId, String>,
    // 名字 -> 连接，用于唯一性检查
    taken: DashMap<String, PlayerId>,
}

impl Identities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: PlayerId, name: impl Into<String>) -> Result<(), GameError> {
        let name = name.into();
        match self.taken.entry(name.clone()) {
            Entry::Occupied(_) => Err(GameError::NameTaken),
            Entry::Vacant(slot) => {
                slot.insert(id);
                self.names.insert(id, name);
                Ok(())
            }
        }
    }

    pub fn unregister(&self, id: &PlayerId) {
        if let Some((_, name)) = self.names.remove(id) {
            self.taken.remove_if(&name, |_, owner| owner == id);
        }
    }

    pub fn online(&self) -> usize {
        self.names.len()
    }
}

impl NameDirectory for Identities {
    fn display_name(&self, id: &PlayerId) -> Option<String> {
        self.names.get(id).map(|n| n.value().clone())
    }
}
