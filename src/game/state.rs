use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::str::FromStr;

use super::board::{Card, EffectKind};
use super::items::ItemId;

/// 回合归属方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

/// 敌人难度档位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" | "boss" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

/// Boss 特性,由玩家配对失败触发。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BossKind {
    Burn,
    Slime,
    Confusion,
}

/// 玩家职业,被动效果见结算模块。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassId {
    Warden,
    Acolyte,
    Oracle,
    Appraiser,
}

impl FromStr for ClassId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warden" => Ok(ClassId::Warden),
            "acolyte" => Ok(ClassId::Acolyte),
            "oracle" => Ok(ClassId::Oracle),
            "appraiser" => Ok(ClassId::Appraiser),
            _ => Err(()),
        }
    }
}

/// 战斗实体:玩家或某一层的敌人。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub max_hp: i32,
    pub current_hp: i32,
    #[serde(default)]
    pub shield: i32,
    #[serde(default)]
    pub coins: i32,
    #[serde(default)]
    pub trinkets: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visual: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss: Option<BossKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_encountered: Option<String>,
}

impl Entity {
    pub fn new_player(name: impl Into<String>, max_hp: i32, class: Option<ClassId>) -> Self {
        Self {
            name: name.into(),
            max_hp,
            current_hp: max_hp,
            shield: 0,
            coins: 0,
            trinkets: 0,
            description: String::new(),
            visual: "🧙".into(),
            difficulty: Difficulty::Easy,
            boss: None,
            class,
            date_encountered: None,
        }
    }

    /// 结算一次伤害:护盾先吸收,剩余溢出到生命值,生命值不低于 0。
    /// 返回 (护盾吸收量, 生命损失量)。
    pub fn take_damage(&mut self, amount: i32) -> (i32, i32) {
        if amount <= 0 {
            return (0, 0);
        }
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let spill = amount - absorbed;
        let hp_loss = spill.min(self.current_hp);
        self.current_hp -= hp_loss;
        (absorbed, hp_loss)
    }

    /// 治疗,不超过生命上限。返回实际恢复量。
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let applied = amount.min(self.max_hp - self.current_hp);
        self.current_hp += applied;
        applied
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0
    }
}

/// 连击状态:连续配对次数与归属方,任一次配对失败即归零。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Combo {
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Side>,
}

impl Combo {
    /// 连击加成:floor(base * (1 + streak * 0.5)),整数算术实现。
    pub fn scaled(&self, base: i32) -> i32 {
        base * (2 + self.streak as i32) / 2
    }

    /// 日志用的倍率文本,如 "x1.5"、"x2"。
    pub fn multiplier_text(&self) -> String {
        let halves = 2 + self.streak;
        if halves % 2 == 0 {
            format!("x{}", halves / 2)
        } else {
            format!("x{}.5", halves / 2)
        }
    }
}

/// 回合阶段(有限状态机)。Victory/Defeat 为终态,此后一切变更被丢弃。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    Loading,
    PlayerTurn,
    EnemyThinking,
    EnemyActing,
    LevelComplete,
    Merchant,
    Victory,
    Defeat,
}

impl Default for TurnPhase {
    fn default() -> Self {
        TurnPhase::Loading
    }
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Victory | TurnPhase::Defeat)
    }

    /// 战斗进行中,结算与 AI 才允许改写棋盘和实体。
    pub fn in_combat(self) -> bool {
        matches!(
            self,
            TurnPhase::PlayerTurn | TurnPhase::EnemyThinking | TurnPhase::EnemyActing
        )
    }
}

/// 对局结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
}

/// 一局内的临时控制标志,集中存放而不是散落的可变单元。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EncounterFlags {
    pub mercy_active: bool,
    pub mirror_active: bool,
    pub enemy_skipped: bool,
    pub ai_mistake_made: bool,
    pub boss_mistake_budget: u32,
    pub burn_stacks: u32,
    pub enemy_matches_in_turn: u32,
    pub foretell_armed: bool,
    pub round: u32,
}

/// 对手对已见牌面的记忆。公平规则:任何一方造成的翻面都会写入,
/// 配对成功的位置立即清除。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryEntry {
    pub effect: EffectKind,
    pub wild: bool,
}

/// 人类可读日志的分类。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Player,
    Enemy,
    Heal,
    Burn,
    Item,
}

/// 人类可读的战斗日志条目,id 单调递增,只追加不修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub id: u64,
    pub message: String,
    pub kind: LogKind,
}

/// 结构化事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CardFlipped {
        by: Side,
        index: usize,
    },
    CardsUnflipped {
        indices: Vec<usize>,
    },
    PairMatched {
        by: Side,
        indices: [usize; 2],
        effect: EffectKind,
    },
    DamageDealt {
        target: Side,
        amount: i32,
        absorbed: i32,
    },
    Healed {
        target: Side,
        amount: i32,
    },
    ShieldGained {
        target: Side,
        amount: i32,
    },
    CoinsFound {
        amount: i32,
    },
    TrinketFound {
        amount: i32,
    },
    ComboBroken {
        #[serde(skip_serializing_if = "Option::is_none")]
        owner: Option<Side>,
    },
    TurnPassed {
        to: Side,
    },
    EnemyTurnSkipped,
    MercyConsumed,
    MirrorConsumed,
    BurnTick {
        stacks_left: u32,
    },
    CardsDisabled {
        indices: Vec<usize>,
    },
    CardsRecovered {
        indices: Vec<usize>,
    },
    CardsConfused {
        indices: [usize; 2],
    },
    CardsRevealed {
        indices: Vec<usize>,
        window_ms: u32,
    },
    CardsHidden {
        indices: Vec<usize>,
    },
    CardTurnedWild {
        index: usize,
    },
    MemoryErased,
    ItemUsed {
        item: ItemId,
    },
    BoardReshuffled {
        round: u32,
    },
    FloorCleared {
        floor: usize,
    },
    EncounterResolved {
        outcome: Outcome,
    },
}

/// 排程中的状态转移。延迟只是节奏数据,真正的契约是顺序与可取消性:
/// 进入终态时整个队列被清空,过期令牌静默失效。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PendingKind {
    ResolveMatch {
        first: usize,
        second: usize,
        by: Side,
    },
    ResolveMismatch {
        first: usize,
        second: usize,
        by: Side,
    },
    EnemyThink,
    EnemySecondFlip {
        first: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        planned: Option<usize>,
    },
    HideRevealed {
        indices: Vec<usize>,
    },
    CommitConfusion {
        first: usize,
        second: usize,
    },
    Reshuffle {
        resume: Side,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingTransition {
    pub token: u32,
    pub delay_ms: u32,
    pub kind: PendingKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    SelectionOverflow { count: usize },
    HpOutOfRange { side: Side, value: i32 },
    DuplicateCardId { id: String },
    FloorOutOfRange { floor: usize },
}

/// 对局整体状态:棋盘、双方实体、回合阶段、连击与各类日志。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncounterState {
    pub base_seed: String,
    pub floor: usize,
    #[serde(default)]
    pub cards: Vec<Card>,
    pub player: Entity,
    #[serde(default)]
    pub enemies: Vec<Entity>,
    pub phase: TurnPhase,
    #[serde(default)]
    pub combo: Combo,
    #[serde(default)]
    pub flags: EncounterFlags,
    #[serde(default)]
    pub flipped: Vec<usize>,
    #[serde(default)]
    pub ai_memory: BTreeMap<usize, MemoryEntry>,
    #[serde(default)]
    pub event_log: Vec<GameEvent>,
    #[serde(default)]
    pub text_log: Vec<LogEntry>,
    #[serde(default)]
    pub next_log_id: u64,
    #[serde(default)]
    pub match_history: Vec<String>,
    #[serde(default)]
    pub pending: Vec<PendingTransition>,
    #[serde(default)]
    pub next_token: u32,
}

impl EncounterState {
    pub fn new(base_seed: impl Into<String>, player: Entity, enemies: Vec<Entity>) -> Self {
        Self {
            base_seed: base_seed.into(),
            floor: 0,
            cards: Vec::new(),
            player,
            enemies,
            phase: TurnPhase::Loading,
            combo: Combo::default(),
            flags: EncounterFlags::default(),
            flipped: Vec::new(),
            ai_memory: BTreeMap::new(),
            event_log: Vec::new(),
            text_log: Vec::new(),
            next_log_id: 0,
            match_history: Vec::new(),
            pending: Vec::new(),
            next_token: 0,
        }
    }

    pub fn enemy(&self) -> &Entity {
        &self.enemies[self.floor]
    }

    pub fn enemy_mut(&mut self) -> &mut Entity {
        let floor = self.floor;
        &mut self.enemies[floor]
    }

    pub fn entity_mut(&mut self, side: Side) -> &mut Entity {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => self.enemy_mut(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn log(&mut self, message: impl Into<String>, kind: LogKind) {
        let id = self.next_log_id;
        self.next_log_id += 1;
        self.text_log.push(LogEntry {
            id,
            message: message.into(),
            kind,
        });
    }

    /// 翻面的统一入口:公平规则保证记忆与可见性同一瞬间更新。
    pub fn reveal(&mut self, index: usize) {
        if let Some(card) = self.cards.get_mut(index) {
            card.face_up = true;
            let entry = MemoryEntry {
                effect: card.effect,
                wild: card.wild,
            };
            self.ai_memory.insert(index, entry);
        }
    }

    pub fn purge_memory(&mut self, indices: &[usize]) {
        for index in indices {
            self.ai_memory.remove(index);
        }
    }

    /// 排入一个待定转移并返回令牌。
    pub fn schedule(&mut self, kind: PendingKind, delay_ms: u32) -> u32 {
        self.next_token += 1;
        let token = self.next_token;
        self.pending.push(PendingTransition {
            token,
            delay_ms,
            kind,
        });
        token
    }

    /// 取出指定令牌的转移;令牌已失效时返回 None。
    pub fn take_pending(&mut self, token: u32) -> Option<PendingTransition> {
        let position = self.pending.iter().position(|entry| entry.token == token)?;
        Some(self.pending.remove(position))
    }

    /// 原子地取消所有未完成的转移(终局时的唯一取消机制)。
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }

    /// 有窗口打开时拒绝新的玩家输入。
    pub fn window_open(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn selectable_positions(&self) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.selectable())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn hidden_positions(&self) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.hidden())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn unmatched_count(&self) -> usize {
        self.cards.iter().filter(|card| !card.matched).count()
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.cards.iter().all(|card| card.matched)
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.floor >= self.enemies.len() {
            return Err(IntegrityError::FloorOutOfRange { floor: self.floor });
        }
        if self.flipped.len() > 2 {
            return Err(IntegrityError::SelectionOverflow {
                count: self.flipped.len(),
            });
        }
        if self.player.current_hp < 0 || self.player.current_hp > self.player.max_hp {
            return Err(IntegrityError::HpOutOfRange {
                side: Side::Player,
                value: self.player.current_hp,
            });
        }
        let enemy = self.enemy();
        if enemy.current_hp < 0 || enemy.current_hp > enemy.max_hp {
            return Err(IntegrityError::HpOutOfRange {
                side: Side::Enemy,
                value: enemy.current_hp,
            });
        }
        let mut seen = HashSet::new();
        for card in &self.cards {
            if !seen.insert(card.id.as_str()) {
                return Err(IntegrityError::DuplicateCardId {
                    id: card.id.clone(),
                });
            }
        }
        Ok(())
    }
}
