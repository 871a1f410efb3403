use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 所有对玩家可见的错误。
///
/// 这些都是可恢复的调用方错误：只回复给发起操作的连接，
/// 并且失败的操作不会修改房间状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum GameError {
    // --- 房间管理 ---
    #[error("房间不存在")]
    RoomNotFound,
    #[error("游戏已经开始，无法加入")]
    RoomNotJoinable,
    #[error("房间已满")]
    RoomFull,
    #[error("你已经在一个房间里了")]
    AlreadyInRoom,
    #[error("没有可用的房间号")]
    RoomCodesExhausted,
    #[error("请先登录")]
    NotLoggedIn,
    #[error("这个名字已经被使用了")]
    NameTaken,

    // --- 开局 ---
    #[error("只有房主可以开始游戏")]
    NotOwner,
    #[error("至少需要2名玩家")]
    NotEnoughPlayers,
    #[error("游戏已经开始过了")]
    AlreadyStarted,

    // --- 游戏内 ---
    #[error("游戏尚未开始")]
    RoomNotActive,
    #[error("游戏已经结束")]
    GameOver,
    #[error("还没轮到你")]
    NotActivePlayer,
    #[error("玩家不在本局游戏中")]
    PlayerNotFound,
    #[error("无效的手牌序号")]
    InvalidCardIndex,
    #[error("这张牌现在不能出")]
    IllegalPlay,
    #[error("只有剩一张牌时才能喊 UNO")]
    InvalidUnoCall,
    #[error("找不到被质疑的玩家")]
    TargetNotFound,
    #[error("只能质疑手上只剩一张牌的其他玩家")]
    InvalidChallenge,
}
