use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use uno_eden_core::{Card, ClientMessage, Color, GameView, RoomCode, ServerMessage};

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_view(view: &GameView) {
    let top = view.top_card.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
    let color = view.current_color.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
    println!("房间 {} | 顶牌 {} | 当前颜色 {} | 方向 {:?} | 牌堆 {} 张", view.room_code, top, color, view.direction, view.deck_size);
    println!("轮到: {}", view.current_player.as_deref().unwrap_or("-"));
    for (name, size) in &view.opponent_hand_sizes {
        println!("  {}: {} 张", name, size);
    }
    print_hand(&view.hand);
}

fn print_hand(hand: &[Card]) {
    let cards: Vec<String> = hand.iter().enumerate().map(|(i, c)| format!("[{}]{}", i, c)).collect();
    println!("你的手牌: {}", cards.join(" "));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let name = std::env::args().nth(1).unwrap_or_else(|| "新玩家".to_string());
    let server = std::env::var("UNO_SERVER").unwrap_or_else(|_| "ws://127.0.0.1:25917/ws".to_string());
    let mut url = Url::parse(&server)?;
    url.query_pairs_mut().append_pair("name", &name);

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 当前所在的房间，由接收任务根据服务器消息更新
    let (room_tx, room_rx) = watch::channel::<Option<RoomCode>>(None);

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        println!();
                        match server_msg {
                            ServerMessage::RoomCreated { room_code, players }
                            | ServerMessage::RoomJoined { room_code, players } => {
                                println!("<-- 进入房间 {}，成员: {}", room_code, players.join(", "));
                                let _ = room_tx.send(Some(room_code));
                            }
                            ServerMessage::RoomLeft { room_code } => {
                                println!("<-- 已离开房间 {}", room_code);
                                let _ = room_tx.send(None);
                            }
                            ServerMessage::GameStarted(view) => {
                                println!("<-- 游戏开始!");
                                print_view(&view);
                            }
                            ServerMessage::GameState(view) => print_view(&view),
                            ServerMessage::CardDrawn { drawn, hand } => {
                                let drawn: Vec<String> = drawn.iter().map(|c| c.to_string()).collect();
                                println!("<-- 摸到了: {}", drawn.join(" "));
                                print_hand(&hand);
                            }
                            // 回执和大厅通知不打扰用户
                            ServerMessage::Accepted { .. } | ServerMessage::RoomsUpdated => {}
                            ServerMessage::Error { message, .. } => println!("<-- [错误]: {}", message),
                            other => println!("<-- [服务器消息]:\n{:#?}", other),
                        }
                        prompt();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- UNO 客户端 ---");
    println!("可用命令:");
    println!("  rooms                     - 列出可加入的房间");
    println!("  create                    - 创建一个新房间");
    println!("  join <房间号>             - 加入一个房间");
    println!("  start                     - 开始游戏 (仅房主)");
    println!("  play <序号> [颜色]        - 出牌，万能牌需要指定颜色 (red/blue/green/yellow)");
    println!("  draw                      - 摸牌");
    println!("  uno                       - 喊 UNO");
    println!("  challenge <玩家>          - 质疑某位玩家没有喊 UNO");
    println!("  leave                     - 离开房间");
    println!("  exit                      - 退出");

    loop {
        prompt();

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let room = room_rx.borrow().clone();

        // 需要房间号的命令在不在房间时直接提示
        let in_room = |build: &dyn Fn(RoomCode) -> ClientMessage| match &room {
            Some(code) => Some(build(code.clone())),
            None => {
                println!("你还不在任何房间里");
                None
            }
        };

        let client_msg = match parts.first().copied() {
            Some("rooms") => Some(ClientMessage::ListRooms),
            Some("create") => Some(ClientMessage::CreateRoom),
            Some("join") => match parts.get(1) {
                Some(code) => Some(ClientMessage::JoinRoom { room_code: code.to_string() }),
                None => {
                    println!("用法: join <房间号>");
                    continue;
                }
            },
            Some("start") => in_room(&|room_code| ClientMessage::StartGame { room_code }),
            Some("play") => {
                let Some(Ok(hand_index)) = parts.get(1).map(|s| s.parse::<usize>()) else {
                    println!("用法: play <序号> [颜色]");
                    continue;
                };
                let chosen_color = match parts.get(2).map(|s| s.parse::<Color>()) {
                    Some(Ok(color)) => Some(color),
                    Some(Err(e)) => {
                        println!("{}", e);
                        continue;
                    }
                    None => None,
                };
                in_room(&|room_code| ClientMessage::PlayCard { room_code, hand_index, chosen_color })
            }
            Some("draw") => in_room(&|room_code| ClientMessage::DrawCard { room_code }),
            Some("uno") => in_room(&|room_code| ClientMessage::CallUno { room_code }),
            Some("challenge") => match parts.get(1) {
                Some(target) => in_room(&|room_code| ClientMessage::ChallengeUno { room_code, target: target.to_string() }),
                None => {
                    println!("用法: challenge <玩家>");
                    continue;
                }
            },
            Some("leave") => in_room(&|room_code| ClientMessage::LeaveRoom { room_code }),
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            None => continue,
            _ => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        if let Some(msg) = client_msg {
            let payload = serde_json::to_string(&msg)?;
            write.send(Message::Text(payload.into())).await?;
        }
    }

    let _ = write.close().await;
    Ok(())
}
