//! 会话网关：把客户端消息翻译成一次注册表或房间操作，
//! 并给出要投递的全部消息（回执、错误、房间广播、大厅通知）。
//! 这里不做任何网络 IO，投递由 `ws` 模块完成。

use rand::Rng;
use tracing::debug;

use uno_eden_core::{
    ClientMessage, GameError, GameEvent, Member, NameDirectory, Outbound, PlayerId, Room, RoomCode, ServerMessage,
};

use crate::identity::Identities;
use crate::registry::RoomRegistry;

pub struct Gateway<D: NameDirectory = Identities> {
    pub registry: RoomRegistry,
    pub directory: D,
}

impl<D: NameDirectory> Gateway<D> {
    pub fn new(directory: D) -> Self {
        Gateway { registry: RoomRegistry::new(), directory }
    }

    /// 处理一条客户端消息
    pub fn dispatch(&self, conn: PlayerId, msg: ClientMessage) -> Vec<Outbound> {
        self.dispatch_with_rng(conn, msg, &mut rand::rng())
    }

    pub fn dispatch_with_rng<R: Rng + ?Sized>(&self, conn: PlayerId, msg: ClientMessage, rng: &mut R) -> Vec<Outbound> {
        let action = msg.action();
        debug!("连接 {} 请求 {:?}", conn, action);
        match self.handle(conn, msg, rng) {
            Ok(mut out) => {
                out.insert(0, Outbound::to_player(conn, ServerMessage::Accepted { action }));
                out
            }
            Err(e) => {
                debug!("连接 {} 的 {:?} 被拒绝: {}", conn, action, e);
                vec![Outbound::to_player(conn, ServerMessage::error(e))]
            }
        }
    }

    /// 连接断开：退出所有房间并通知其余成员
    pub fn disconnect(&self, conn: &PlayerId) -> Vec<Outbound> {
        let left = self.registry.remove_identity_from_all_rooms(conn);
        if left.is_empty() {
            return vec![];
        }
        let mut out: Vec<Outbound> = left.into_iter().flat_map(|(_, out)| out).collect();
        out.push(Outbound::to_everyone(ServerMessage::RoomsUpdated));
        out
    }

    fn member(&self, conn: PlayerId) -> Result<Member, GameError> {
        let name = self.directory.display_name(&conn).ok_or(GameError::NotLoggedIn)?;
        Ok(Member::new(conn, name))
    }

    fn handle<R: Rng + ?Sized>(&self, conn: PlayerId, msg: ClientMessage, rng: &mut R) -> Result<Vec<Outbound>, GameError> {
        let me = self.member(conn)?;

        match msg {
            ClientMessage::ListRooms => {
                let rooms = self.registry.list_available_rooms();
                Ok(vec![Outbound::to_player(conn, ServerMessage::RoomList { rooms })])
            }
            ClientMessage::CreateRoom => {
                let (room_code, players) = self.registry.create_room(me, rng)?;
                Ok(vec![
                    Outbound::to_player(conn, ServerMessage::RoomCreated { room_code, players }),
                    Outbound::to_everyone(ServerMessage::RoomsUpdated),
                ])
            }
            ClientMessage::JoinRoom { room_code } => {
                let (players, mut room_out) = self.registry.join_room(&room_code, me)?;
                let mut out = vec![Outbound::to_player(conn, ServerMessage::RoomJoined { room_code, players })];
                out.append(&mut room_out);
                out.push(Outbound::to_everyone(ServerMessage::RoomsUpdated));
                Ok(out)
            }
            ClientMessage::LeaveRoom { room_code } => {
                let mut room_out = self.registry.leave_room(&room_code, &conn)?;
                let mut out = vec![Outbound::to_player(conn, ServerMessage::RoomLeft { room_code })];
                out.append(&mut room_out);
                out.push(Outbound::to_everyone(ServerMessage::RoomsUpdated));
                Ok(out)
            }
            ClientMessage::StartGame { room_code } => {
                let mut out = self.in_room(&room_code, |room| room.start_game(&conn, rng))?;
                out.push(Outbound::to_everyone(ServerMessage::RoomsUpdated));
                Ok(out)
            }
            ClientMessage::PlayCard { room_code, hand_index, chosen_color } => {
                self.in_room(&room_code, |room| room.play_card(&conn, hand_index, chosen_color, rng))
            }
            ClientMessage::DrawCard { room_code } => self.in_room(&room_code, |room| room.draw_card(&conn, rng)),
            ClientMessage::CallUno { room_code } => self.in_room(&room_code, |room| room.call_uno(&conn)),
            ClientMessage::ChallengeUno { room_code, target } => {
                self.in_room(&room_code, |room| room.challenge_uno(&conn, &target, rng))
            }
        }
    }

    // 在房间锁内执行操作并渲染消息，保证广播的是已提交的状态
    fn in_room(
        &self,
        code: &RoomCode,
        op: impl FnOnce(&mut Room) -> Result<Vec<GameEvent>, GameError>,
    ) -> Result<Vec<Outbound>, GameError> {
        self.registry.with_room(code, |room| {
            let events = op(room)?;
            Ok(room.render(&events))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uno_eden_core::{Action, Recipient, RoomStatus};
    use uuid::Uuid;

    struct Fixture {
        gateway: Gateway,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture { gateway: Gateway::new(Identities::new()), rng: StdRng::seed_from_u64(3) }
        }

        fn login(&self, name: &str) -> PlayerId {
            let id = Uuid::new_v4();
            self.gateway.directory.register(id, name).unwrap();
            id
        }

        fn send(&mut self, conn: PlayerId, msg: ClientMessage) -> Vec<Outbound> {
            self.gateway.dispatch_with_rng(conn, msg, &mut self.rng)
        }

        fn create(&mut self, conn: PlayerId) -> String {
            let out = self.send(conn, ClientMessage::CreateRoom);
            out.iter()
                .find_map(|o| match &o.message {
                    ServerMessage::RoomCreated { room_code, .. } => Some(room_code.clone()),
                    _ => None,
                })
                .expect("应该创建成功")
        }
    }

    fn messages_for(out: &[Outbound], id: PlayerId) -> Vec<&ServerMessage> {
        out.iter().filter(|o| o.to == Recipient::Player(id)).map(|o| &o.message).collect()
    }

    #[test]
    fn test_not_logged_in() {
        let mut f = Fixture::new();
        let anon = Uuid::new_v4();
        let out = f.send(anon, ClientMessage::CreateRoom);
        assert_eq!(out, vec![Outbound::to_player(anon, ServerMessage::error(GameError::NotLoggedIn))]);
    }

    #[test]
    fn test_duplicate_name_cannot_log_in() {
        let mut f = Fixture::new();
        let host = f.login("host");
        let alice = f.login("alice");
        let impostor = Uuid::new_v4();
        assert_eq!(f.gateway.directory.register(impostor, "alice"), Err(GameError::NameTaken));

        let code = f.create(host);
        f.send(alice, ClientMessage::JoinRoom { room_code: code.clone() });
        let out = f.send(impostor, ClientMessage::JoinRoom { room_code: code.clone() });
        assert_eq!(out, vec![Outbound::to_player(impostor, ServerMessage::error(GameError::NotLoggedIn))]);

        let bob = f.login("bob");
        f.send(bob, ClientMessage::JoinRoom { room_code: code.clone() });
        let out = f.send(host, ClientMessage::StartGame { room_code: code });
        let view = messages_for(&out, host)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::GameStarted(view) => Some(view.clone()),
                _ => None,
            })
            .expect("房主应该收到开局快照");
        assert_eq!(view.opponent_hand_sizes.len(), 2);
        assert_eq!(view.opponent_hand_sizes.get("alice"), Some(&7));
        assert_eq!(view.opponent_hand_sizes.get("bob"), Some(&7));
    }

    #[test]
    fn test_create_and_list() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let out = f.send(alice, ClientMessage::CreateRoom);

        assert_eq!(out[0], Outbound::to_player(alice, ServerMessage::Accepted { action: Action::CreateRoom }));
        assert!(matches!(&out[1].message, ServerMessage::RoomCreated { players, .. } if players == &["alice"]));
        assert_eq!(out[2], Outbound::to_everyone(ServerMessage::RoomsUpdated));

        let bob = f.login("bob");
        let out = f.send(bob, ClientMessage::ListRooms);
        let ServerMessage::RoomList { rooms } = &out[1].message else { panic!("应该收到房间列表") };
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].player_count, 1);
    }

    #[test]
    fn test_join_notifies_room_and_lobby() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let bob = f.login("bob");
        let code = f.create(alice);

        let out = f.send(bob, ClientMessage::JoinRoom { room_code: code.clone() });
        let to_bob = messages_for(&out, bob);
        assert!(matches!(to_bob[0], ServerMessage::Accepted { action: Action::JoinRoom }));
        assert!(matches!(to_bob[1], ServerMessage::RoomJoined { players, .. } if players == &["alice", "bob"]));

        let to_alice = messages_for(&out, alice);
        assert_eq!(to_alice.len(), 1);
        assert!(matches!(to_alice[0], ServerMessage::RoomUpdated { status: RoomStatus::Waiting, .. }));
        assert!(out.contains(&Outbound::to_everyone(ServerMessage::RoomsUpdated)));
    }

    #[test]
    fn test_errors_are_unicast_to_actor() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let bob = f.login("bob");
        let code = f.create(alice);

        let out = f.send(bob, ClientMessage::JoinRoom { room_code: "0000".to_string() });
        assert_eq!(out, vec![Outbound::to_player(bob, ServerMessage::error(GameError::RoomNotFound))]);

        f.send(bob, ClientMessage::JoinRoom { room_code: code.clone() });
        let out = f.send(bob, ClientMessage::StartGame { room_code: code.clone() });
        assert_eq!(out, vec![Outbound::to_player(bob, ServerMessage::error(GameError::NotOwner))]);

        let out = f.send(alice, ClientMessage::DrawCard { room_code: code });
        assert_eq!(out, vec![Outbound::to_player(alice, ServerMessage::error(GameError::RoomNotActive))]);
    }

    #[test]
    fn test_start_and_draw() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let bob = f.login("bob");
        let code = f.create(alice);
        f.send(bob, ClientMessage::JoinRoom { room_code: code.clone() });

        let out = f.send(alice, ClientMessage::StartGame { room_code: code.clone() });
        for id in [alice, bob] {
            let view = messages_for(&out, id)
                .into_iter()
                .find_map(|m| match m {
                    ServerMessage::GameStarted(view) => Some(view.clone()),
                    _ => None,
                })
                .expect("每个人都应该收到开局快照");
            assert_eq!(view.hand.len(), 7);
            assert_eq!(view.deck_size, 108 - 14 - 1);
            assert_eq!(view.current_player.as_deref(), Some("alice"));
        }
        assert!(f.gateway.registry.list_available_rooms().is_empty());

        // 没轮到 bob
        let out = f.send(bob, ClientMessage::DrawCard { room_code: code.clone() });
        assert_eq!(out, vec![Outbound::to_player(bob, ServerMessage::error(GameError::NotActivePlayer))]);

        let out = f.send(alice, ClientMessage::DrawCard { room_code: code });
        let drawn: Vec<_> = out.iter().filter(|o| matches!(o.message, ServerMessage::CardDrawn { .. })).collect();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].to, Recipient::Player(alice));
        assert!(messages_for(&out, bob).iter().any(
            |m| matches!(m, ServerMessage::GameState(view) if view.current_player.as_deref() == Some("bob"))
        ));
    }

    #[test]
    fn test_disconnect_ends_two_player_game() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let bob = f.login("bob");
        let code = f.create(alice);
        f.send(bob, ClientMessage::JoinRoom { room_code: code.clone() });
        f.send(alice, ClientMessage::StartGame { room_code: code.clone() });

        let out = f.gateway.disconnect(&bob);
        let to_alice = messages_for(&out, alice);
        assert!(to_alice.contains(&&ServerMessage::GameOver { winner: "alice".to_string() }));
        assert!(out.contains(&Outbound::to_everyone(ServerMessage::RoomsUpdated)));
        assert_eq!(f.gateway.registry.room_of(&bob), None);

        // 没有房间的连接断开，不产生任何消息
        assert!(f.gateway.disconnect(&bob).is_empty());
    }

    #[test]
    fn test_leave_room() {
        let mut f = Fixture::new();
        let alice = f.login("alice");
        let code = f.create(alice);

        let out = f.send(alice, ClientMessage::LeaveRoom { room_code: code.clone() });
        assert!(matches!(&out[1].message, ServerMessage::RoomLeft { room_code } if room_code == &code));
        assert_eq!(f.gateway.registry.room_count(), 0);

        let out = f.send(alice, ClientMessage::LeaveRoom { room_code: code });
        assert_eq!(out, vec![Outbound::to_player(alice, ServerMessage::error(GameError::RoomNotFound))]);
    }
}
