//! 游戏核心模块
//!
//! 包含记忆翻牌战斗模拟的核心定义:
//! - `board`: 可复现的棋盘生成器(种子哈希 → 同余流 → Fisher–Yates)
//! - `state`: 实体、连击、回合阶段、对局状态与事件/文字双日志
//! - `resolver`: 配对效果结算(护盾优先、连击加成、职业被动、万能牌)
//! - `specials`: Boss 特性(烧灼/黏液/混乱)与防死局守卫
//! - `items`: 消耗品目录与一次性效果
//! - `rules`: 回合状态机与带取消令牌的待定转移队列
//! - `run`: 楼层推进、敌人名册(提供方回退)与跨局进度聚合
//!
//! 注意:渲染、音效与存储格式由宿主负责,核心只暴露快照与事件流。

pub mod board;
pub mod items;
pub mod resolver;
pub mod rules;
pub mod run;
pub mod specials;
pub mod state;

// Re-export 常用类型(公开 API)。
pub use board::{board_seed, generate_board, BoardRng, Card, Category, EffectKind, DECK_COMPOSITION};
pub use items::{ItemId, ItemSpec, CATALOG};
pub use resolver::{apply_match, classify_pair, PairOutcome};
pub use rules::{TurnEngine, TurnError, TurnResolution};
pub use run::{
    boss_kind_for_seed, fallback_roster, new_run, roster_from_json, EnemySpec, UserProgress,
    FLOORS_PER_RUN, PLAYER_MAX_HP,
};
pub use state::{
    BossKind, ClassId, Combo, Difficulty, EncounterFlags, EncounterState, Entity, GameEvent,
    IntegrityError, LogEntry, LogKind, MemoryEntry, Outcome, PendingKind, PendingTransition, Side,
    TurnPhase,
};
