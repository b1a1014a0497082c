use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::ai::{FirstDecision, OpponentAi};

use super::board::{board_seed, generate_board};
use super::items::{self, ItemFollowUp, ItemId};
use super::resolver::{apply_match, classify_pair};
use super::run::UserProgress;
use super::specials::{self, BossReaction};
use super::state::{
    ClassId, EncounterState, GameEvent, IntegrityError, LogKind, Outcome, PendingKind, Side,
    TurnPhase,
};

// 节奏窗口。时长只是展示节拍,契约在于顺序与可取消性。
const DELAY_RESOLVE_PLAYER_MS: u32 = 500;
const DELAY_RESOLVE_ENEMY_MS: u32 = 800;
const DELAY_MISMATCH_MS: u32 = 1000;
const DELAY_ENEMY_THINK_MS: u32 = 1500;
const DELAY_ENEMY_CONTINUE_MS: u32 = 1000;
const DELAY_ENEMY_SECOND_MS: u32 = 800;
const DELAY_RESHUFFLE_MS: u32 = 1500;
const DELAY_FORETELL_MS: u32 = 2500;
const DELAY_CONFUSION_MS: u32 = 600;

/// 层间休整的治疗量与满血奖励。
const REST_HEAL: i32 = 3;
const FULL_HP_BONUS_COINS: i32 = 5;
/// 商人插曲出现在打通这一层之后。
const MERCHANT_AFTER_FLOOR: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TurnError {
    EncounterFinished,
    NotPlayerTurn,
    WindowOpen,
    SelectionFull,
    CardNotFound { index: usize },
    CardUnavailable { index: usize },
    ItemNotOwned { item: ItemId },
    ItemUnusable,
    NotEnoughCoins { required: i32, available: i32 },
    WrongPhase { expected: TurnPhase, actual: TurnPhase },
    RosterExhausted,
    IntegrityViolation { error: IntegrityError },
}

/// 每次操作后返回给呈现层的完整快照与本次事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResolution {
    pub state: EncounterState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl TurnResolution {
    pub fn new(state: &EncounterState, events: Vec<GameEvent>) -> Self {
        let outcome = match state.phase {
            TurnPhase::Victory => Some(Outcome::Victory),
            TurnPhase::Defeat => Some(Outcome::Defeat),
            _ => None,
        };
        Self {
            state: state.clone(),
            events,
            outcome,
        }
    }
}

/// 回合状态机。随机流作为显式依赖注入,支持确定性重放。
pub struct TurnEngine {
    rng: SmallRng,
    ai: OpponentAi,
}

impl Default for TurnEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnEngine {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            ai: OpponentAi::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            ai: OpponentAi::with_seed(seed ^ 0x9e37_79b9),
        }
    }

    fn ensure_live(state: &EncounterState) -> Result<(), TurnError> {
        if state.is_finished() {
            return Err(TurnError::EncounterFinished);
        }
        state
            .integrity_check()
            .map_err(|error| TurnError::IntegrityViolation { error })
    }

    /// 从 Loading 进入第一层。Loading 是唯一不可重入的初始阶段。
    pub fn begin(&mut self, state: &mut EncounterState) -> Result<Vec<GameEvent>, TurnError> {
        if state.phase != TurnPhase::Loading {
            return Err(TurnError::WrongPhase {
                expected: TurnPhase::Loading,
                actual: state.phase,
            });
        }
        self.install_floor(state);
        Ok(Vec::new())
    }

    fn install_floor(&mut self, state: &mut EncounterState) {
        let floor = state.floor;
        let difficulty = state.enemy().difficulty;
        let name = state.enemy().name.clone();
        let description = state.enemy().description.clone();

        state.flags = Default::default();
        state.flags.foretell_armed = true;
        state.flags.boss_mistake_budget =
            crate::ai::AiProfile::roll_planned_mistakes(difficulty, &mut self.rng);
        state.combo = Default::default();
        state.flipped.clear();
        state.ai_memory.clear();
        state.cancel_pending();
        state.cards = generate_board(&board_seed(&state.base_seed, floor, 0), 0);
        state.phase = TurnPhase::PlayerTurn;

        state.log(format!("Floor {}: {name} appears!", floor + 1), LogKind::Enemy);
        if description.is_empty() {
            state.log("Prepare for battle!", LogKind::Info);
        } else {
            state.log(description, LogKind::Info);
        }
    }

    /// 呈现层唯一的对局输入:选中位置 P 的牌。
    pub fn select_card(
        &mut self,
        state: &mut EncounterState,
        index: usize,
    ) -> Result<Vec<GameEvent>, TurnError> {
        Self::ensure_live(state)?;
        if state.phase != TurnPhase::PlayerTurn {
            return Err(TurnError::NotPlayerTurn);
        }
        if state.window_open() {
            return Err(TurnError::WindowOpen);
        }
        if state.flipped.len() >= 2 {
            return Err(TurnError::SelectionFull);
        }
        let card = state
            .cards
            .get(index)
            .ok_or(TurnError::CardNotFound { index })?;
        if !card.selectable() || card.face_up {
            return Err(TurnError::CardUnavailable { index });
        }

        state.reveal(index);
        state.flipped.push(index);
        let event = GameEvent::CardFlipped {
            by: Side::Player,
            index,
        };
        state.record_event(event.clone());
        let mut events = vec![event];

        if state.flipped.len() == 2 {
            let first = state.flipped[0];
            let second = state.flipped[1];
            let class = state.player.class;
            let is_match =
                classify_pair(&state.cards[first], &state.cards[second], class).is_some();
            if is_match {
                state.schedule(
                    PendingKind::ResolveMatch {
                        first,
                        second,
                        by: Side::Player,
                    },
                    DELAY_RESOLVE_PLAYER_MS,
                );
            } else {
                state.schedule(
                    PendingKind::ResolveMismatch {
                        first,
                        second,
                        by: Side::Player,
                    },
                    DELAY_MISMATCH_MS,
                );
            }
        }

        Ok(events)
    }

    /// 在玩家回合使用一件消耗品。校验失败时不消耗、不改状态。
    pub fn use_item(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
        item: ItemId,
    ) -> Result<Vec<GameEvent>, TurnError> {
        Self::ensure_live(state)?;
        if state.phase != TurnPhase::PlayerTurn {
            return Err(TurnError::NotPlayerTurn);
        }
        if state.window_open() {
            return Err(TurnError::WindowOpen);
        }
        if !progress.has_item(item) {
            return Err(TurnError::ItemNotOwned { item });
        }

        let follow_up = items::apply_item(state, &mut self.rng, item)?;
        progress.take_item(item);

        let event = GameEvent::ItemUsed { item };
        state.record_event(event.clone());
        let mut events = vec![event];

        match follow_up {
            Some(ItemFollowUp::RevealWindow { indices, window_ms }) => {
                state.schedule(PendingKind::HideRevealed { indices }, window_ms);
            }
            Some(ItemFollowUp::ResolvePair { first, second }) => {
                state.schedule(
                    PendingKind::ResolveMatch {
                        first,
                        second,
                        by: Side::Player,
                    },
                    DELAY_RESOLVE_PLAYER_MS,
                );
            }
            None => {}
        }

        Ok(events)
    }

    /// 执行一个到期的待定转移。过期或已取消的令牌静默变成空操作:
    /// 这是终局后吞掉所有在途回调的唯一机制。
    pub fn advance(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
        token: u32,
    ) -> Result<Vec<GameEvent>, TurnError> {
        if state.is_finished() {
            return Ok(Vec::new());
        }
        let Some(entry) = state.take_pending(token) else {
            return Ok(Vec::new());
        };

        match entry.kind {
            PendingKind::ResolveMatch { first, second, by } => {
                self.resolve_match(state, progress, first, second, by)
            }
            PendingKind::ResolveMismatch { first, second, by } => {
                self.resolve_mismatch(state, progress, first, second, by)
            }
            PendingKind::EnemyThink => self.enemy_think(state),
            PendingKind::EnemySecondFlip { first, planned } => {
                self.enemy_second_flip(state, first, planned)
            }
            PendingKind::HideRevealed { indices } => Ok(Self::hide_revealed(state, &indices)),
            PendingKind::CommitConfusion { first, second } => {
                let mut events = specials::commit_confusion(state, first, second);
                self.hand_over_to_enemy(state, &mut events);
                Ok(events)
            }
            PendingKind::Reshuffle { resume } => Ok(self.reshuffle(state, resume)),
        }
    }

    /// 依次执行队列里的全部转移,直到回到稳定状态。
    /// 无头模拟与测试用;宿主正常应按延迟逐个驱动。
    pub fn fast_forward(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut guard = 0;
        while let Some(entry) = state.pending.first() {
            let token = entry.token;
            match self.advance(state, progress, token) {
                Ok(mut batch) => events.append(&mut batch),
                Err(_) => break,
            }
            guard += 1;
            if guard > 10_000 {
                break;
            }
        }
        events
    }

    fn resolve_match(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
        first: usize,
        second: usize,
        by: Side,
    ) -> Result<Vec<GameEvent>, TurnError> {
        let class = match by {
            Side::Player => state.player.class,
            Side::Enemy => None,
        };
        let Some(outcome) = classify_pair(&state.cards[first], &state.cards[second], class) else {
            return self.resolve_mismatch(state, progress, first, second, by);
        };

        state.cards[first].matched = true;
        state.cards[second].matched = true;
        state.flipped.clear();
        state.purge_memory(&[first, second]);

        let event = GameEvent::PairMatched {
            by,
            indices: [first, second],
            effect: outcome.effect,
        };
        state.record_event(event.clone());
        let mut events = vec![event];

        if state.combo.streak > 0 {
            let shout = match state.combo.streak {
                1 => "COMBO!",
                2 => "SUPER COMBO!",
                3 => "MEGA COMBO!",
                _ => "ULTRA COMBO!",
            };
            state.log(shout, LogKind::Info);
        }

        match by {
            Side::Enemy => state.flags.enemy_matches_in_turn += 1,
            Side::Player => state.flags.enemy_matches_in_turn = 0,
        }

        events.extend(apply_match(state, &outcome, by));
        state.combo.owner = Some(by);
        state.combo.streak += 1;

        if let Some(mut terminal) = self.check_terminal(state, progress) {
            events.append(&mut terminal);
            return Ok(events);
        }

        if state.all_matched() {
            state.schedule(PendingKind::Reshuffle { resume: by }, DELAY_RESHUFFLE_MS);
            return Ok(events);
        }

        match by {
            Side::Player => {
                if state.flags.foretell_armed {
                    state.flags.foretell_armed = false;
                    if let Some(mut revealed) = self.reveal_window(state, 2, DELAY_FORETELL_MS) {
                        state.log(
                            "First match! The cards reveal themselves...",
                            LogKind::Info,
                        );
                        events.append(&mut revealed);
                    }
                } else if state.player.class == Some(ClassId::Oracle)
                    && state.combo.streak >= 2
                    && state.combo.streak % 2 == 0
                {
                    // Oracle 被动:连着两次自配对后偷看一张。
                    if let Some(mut revealed) = self.reveal_window(state, 1, DELAY_FORETELL_MS) {
                        state.log("A vision flickers across the board...", LogKind::Info);
                        events.append(&mut revealed);
                    }
                }
            }
            Side::Enemy => {
                state.phase = TurnPhase::EnemyThinking;
                state.schedule(PendingKind::EnemyThink, DELAY_ENEMY_CONTINUE_MS);
            }
        }

        Ok(events)
    }

    fn resolve_mismatch(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
        first: usize,
        second: usize,
        by: Side,
    ) -> Result<Vec<GameEvent>, TurnError> {
        for index in [first, second] {
            if let Some(card) = state.cards.get_mut(index) {
                if !card.matched {
                    card.face_up = false;
                }
            }
        }
        state.flipped.clear();

        let event = GameEvent::CardsUnflipped {
            indices: vec![first, second],
        };
        state.record_event(event.clone());
        let mut events = vec![event];

        let broken_owner = state.combo.owner;
        state.combo = Default::default();
        let event = GameEvent::ComboBroken {
            owner: broken_owner,
        };
        state.record_event(event.clone());
        events.push(event);

        match by {
            Side::Player => {
                // 本轮的预示机会随第一次失误作废。
                state.flags.foretell_armed = false;

                if state.flags.mercy_active {
                    // 仁慈吞掉整次失误:回合不换手,Boss 反应一并豁免。
                    state.flags.mercy_active = false;
                    let event = GameEvent::MercyConsumed;
                    state.record_event(event.clone());
                    events.push(event);
                    state.log("Mercy! Your turn continues.", LogKind::Item);
                    return Ok(events);
                }

                events.extend(specials::recover_disabled(state));

                let mut confusion_pending = false;
                match specials::mismatch_reaction(state, &mut self.rng) {
                    Some(BossReaction::BurnStack) => specials::add_burn_stack(state),
                    Some(BossReaction::DisablePair(pair)) => {
                        events.extend(specials::apply_disable(state, pair));
                    }
                    Some(BossReaction::Confuse(a, b)) => {
                        state.schedule(
                            PendingKind::CommitConfusion { first: a, second: b },
                            DELAY_CONFUSION_MS,
                        );
                        state.log("The cards blur before your eyes...", LogKind::Enemy);
                        confusion_pending = true;
                    }
                    None => {}
                }

                events.extend(specials::burn_tick(state));
                if let Some(mut terminal) = self.check_terminal(state, progress) {
                    events.append(&mut terminal);
                    return Ok(events);
                }
                if confusion_pending {
                    // 换手推迟到交换提交之后。
                    return Ok(events);
                }
                self.hand_over_to_enemy(state, &mut events);
            }
            Side::Enemy => {
                state.phase = TurnPhase::PlayerTurn;
                let event = GameEvent::TurnPassed { to: Side::Player };
                state.record_event(event.clone());
                events.push(event);
            }
        }

        Ok(events)
    }

    fn hand_over_to_enemy(&mut self, state: &mut EncounterState, events: &mut Vec<GameEvent>) {
        if state.flags.enemy_skipped {
            state.flags.enemy_skipped = false;
            let name = state.enemy().name.clone();
            let event = GameEvent::EnemyTurnSkipped;
            state.record_event(event.clone());
            events.push(event);
            state.log(format!("{name} dozes through its turn!"), LogKind::Item);
            state.phase = TurnPhase::PlayerTurn;
            return;
        }

        state.phase = TurnPhase::EnemyThinking;
        state.flags.enemy_matches_in_turn = 0;
        let event = GameEvent::TurnPassed { to: Side::Enemy };
        state.record_event(event.clone());
        events.push(event);
        state.schedule(PendingKind::EnemyThink, DELAY_ENEMY_THINK_MS);
    }

    fn enemy_think(&mut self, state: &mut EncounterState) -> Result<Vec<GameEvent>, TurnError> {
        if !state.phase.in_combat() {
            return Ok(Vec::new());
        }

        match self.ai.decide_first(state) {
            FirstDecision::Pass => {
                let name = state.enemy().name.clone();
                state.log(format!("{name} hesitates and yields the turn."), LogKind::Info);
                state.phase = TurnPhase::PlayerTurn;
                let event = GameEvent::TurnPassed { to: Side::Player };
                state.record_event(event.clone());
                Ok(vec![event])
            }
            FirstDecision::Flip { index, planned } => {
                state.phase = TurnPhase::EnemyActing;
                state.reveal(index);
                state.flipped.push(index);
                let event = GameEvent::CardFlipped {
                    by: Side::Enemy,
                    index,
                };
                state.record_event(event.clone());
                state.schedule(
                    PendingKind::EnemySecondFlip {
                        first: index,
                        planned,
                    },
                    DELAY_ENEMY_SECOND_MS,
                );
                Ok(vec![event])
            }
        }
    }

    fn enemy_second_flip(
        &mut self,
        state: &mut EncounterState,
        first: usize,
        planned: Option<usize>,
    ) -> Result<Vec<GameEvent>, TurnError> {
        let Some((second, _note)) = self.ai.decide_second(state, first, planned) else {
            // 没有第二个可选位置:盖回并让回回合。
            if let Some(card) = state.cards.get_mut(first) {
                card.face_up = false;
            }
            state.flipped.clear();
            let event = GameEvent::CardsUnflipped {
                indices: vec![first],
            };
            state.record_event(event.clone());
            state.phase = TurnPhase::PlayerTurn;
            let passed = GameEvent::TurnPassed { to: Side::Player };
            state.record_event(passed.clone());
            return Ok(vec![event, passed]);
        };

        state.reveal(second);
        state.flipped.push(second);
        let event = GameEvent::CardFlipped {
            by: Side::Enemy,
            index: second,
        };
        state.record_event(event.clone());

        let is_match = classify_pair(&state.cards[first], &state.cards[second], None).is_some();
        if is_match {
            state.schedule(
                PendingKind::ResolveMatch {
                    first,
                    second,
                    by: Side::Enemy,
                },
                DELAY_RESOLVE_ENEMY_MS,
            );
        } else {
            state.schedule(
                PendingKind::ResolveMismatch {
                    first,
                    second,
                    by: Side::Enemy,
                },
                DELAY_MISMATCH_MS,
            );
        }

        Ok(vec![event])
    }

    /// 临时翻开 count 张隐藏牌,窗口结束后自动盖回。
    fn reveal_window(
        &mut self,
        state: &mut EncounterState,
        count: usize,
        window_ms: u32,
    ) -> Option<Vec<GameEvent>> {
        let mut hidden = state.hidden_positions();
        if hidden.is_empty() {
            return None;
        }
        hidden.shuffle(&mut self.rng);
        hidden.truncate(count);
        hidden.sort_unstable();
        for index in &hidden {
            state.reveal(*index);
        }
        let event = GameEvent::CardsRevealed {
            indices: hidden.clone(),
            window_ms,
        };
        state.record_event(event.clone());
        state.schedule(PendingKind::HideRevealed { indices: hidden }, window_ms);
        Some(vec![event])
    }

    fn hide_revealed(state: &mut EncounterState, indices: &[usize]) -> Vec<GameEvent> {
        let mut hidden = Vec::new();
        for &index in indices {
            if let Some(card) = state.cards.get_mut(index) {
                if !card.matched && card.face_up {
                    card.face_up = false;
                    hidden.push(index);
                }
            }
        }
        if hidden.is_empty() {
            return Vec::new();
        }
        let event = GameEvent::CardsHidden { indices: hidden };
        state.record_event(event.clone());
        vec![event]
    }

    fn reshuffle(&mut self, state: &mut EncounterState, resume: Side) -> Vec<GameEvent> {
        state.flags.round += 1;
        let round = state.flags.round;
        let seed = board_seed(&state.base_seed, state.floor, round);
        state.cards = generate_board(&seed, round);
        state.flipped.clear();
        state.ai_memory.clear();
        state.flags.foretell_armed = true;
        state.flags.enemy_matches_in_turn = 0;

        state.log("Board reshuffling...", LogKind::Info);
        let event = GameEvent::BoardReshuffled { round };
        state.record_event(event.clone());
        let mut events = vec![event];

        // 谁清空的棋盘,重洗后回合仍归谁。
        match resume {
            Side::Enemy => {
                let name = state.enemy().name.clone();
                state.log(format!("{name} prepares to continue..."), LogKind::Enemy);
                state.phase = TurnPhase::EnemyThinking;
                state.schedule(PendingKind::EnemyThink, DELAY_ENEMY_THINK_MS);
            }
            Side::Player => {
                state.log("Your turn!", LogKind::Info);
                state.phase = TurnPhase::PlayerTurn;
                let event = GameEvent::TurnPassed { to: Side::Player };
                state.record_event(event.clone());
                events.push(event);
            }
        }
        events
    }

    /// 每次生命值变化后的终局检查。一旦判定,取消全部待定转移,
    /// 此后的任何变更都被静默丢弃(幂等)。
    fn check_terminal(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
    ) -> Option<Vec<GameEvent>> {
        if !state.phase.in_combat() {
            return None;
        }

        if state.player.is_defeated() {
            state.cancel_pending();
            state.phase = TurnPhase::Defeat;
            let event = GameEvent::EncounterResolved {
                outcome: Outcome::Defeat,
            };
            state.record_event(event.clone());
            state.log("You were defeated.", LogKind::Enemy);
            return Some(vec![event]);
        }

        if state.enemy().is_defeated() {
            state.cancel_pending();
            let mut events = Vec::new();

            // 入账与图鉴只在击杀时发生一次。
            let banked = state.player.coins;
            state.player.coins = 0;
            progress.coins += banked;
            let fallen = state.enemy().clone();
            let date = state.base_seed.clone();
            progress.record_bestiary(fallen, date);

            let floor = state.floor;
            let event = GameEvent::FloorCleared { floor };
            state.record_event(event.clone());
            events.push(event);

            if floor + 1 == state.enemies.len() {
                state.phase = TurnPhase::Victory;
                progress.tower_level += 1;
                let event = GameEvent::EncounterResolved {
                    outcome: Outcome::Victory,
                };
                state.record_event(event.clone());
                events.push(event);
                state.log("Tower conquered!", LogKind::Info);
            } else {
                state.phase = TurnPhase::LevelComplete;
                let name = state.enemy().name.clone();
                state.log(format!("{name} falls. The stairs beckon."), LogKind::Info);
            }
            return Some(events);
        }

        None
    }

    /// 离开结算画面,进入下一层(或商人插曲)。
    pub fn advance_floor(
        &mut self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
    ) -> Result<Vec<GameEvent>, TurnError> {
        let _ = progress;
        if state.phase != TurnPhase::LevelComplete {
            return Err(TurnError::WrongPhase {
                expected: TurnPhase::LevelComplete,
                actual: state.phase,
            });
        }
        if state.floor == MERCHANT_AFTER_FLOOR {
            state.phase = TurnPhase::Merchant;
            state.log("A merchant waves you over to a dim stall...", LogKind::Info);
            return Ok(Vec::new());
        }
        self.install_next(state)
    }

    /// 在商人处用已入账的金币购买消耗品。
    pub fn buy_item(
        &self,
        state: &mut EncounterState,
        progress: &mut UserProgress,
        item: ItemId,
    ) -> Result<Vec<GameEvent>, TurnError> {
        if state.phase != TurnPhase::Merchant {
            return Err(TurnError::WrongPhase {
                expected: TurnPhase::Merchant,
                actual: state.phase,
            });
        }
        let spec = items::spec(item);
        if progress.coins < spec.cost {
            return Err(TurnError::NotEnoughCoins {
                required: spec.cost,
                available: progress.coins,
            });
        }
        progress.coins -= spec.cost;
        progress.grant_item(item);
        state.log(format!("Bought {} for {} coins.", spec.name, spec.cost), LogKind::Item);
        Ok(Vec::new())
    }

    pub fn leave_merchant(
        &mut self,
        state: &mut EncounterState,
    ) -> Result<Vec<GameEvent>, TurnError> {
        if state.phase != TurnPhase::Merchant {
            return Err(TurnError::WrongPhase {
                expected: TurnPhase::Merchant,
                actual: state.phase,
            });
        }
        self.install_next(state)
    }

    fn install_next(&mut self, state: &mut EncounterState) -> Result<Vec<GameEvent>, TurnError> {
        if state.floor + 1 >= state.enemies.len() {
            return Err(TurnError::RosterExhausted);
        }
        state.floor += 1;

        let mut events = Vec::new();
        if state.player.current_hp >= state.player.max_hp {
            state.player.coins += FULL_HP_BONUS_COINS;
            let event = GameEvent::CoinsFound {
                amount: FULL_HP_BONUS_COINS,
            };
            state.record_event(event.clone());
            events.push(event);
            state.log("Untouched! +5 coins for the climb.", LogKind::Info);
        } else {
            let healed = state.player.heal(REST_HEAL);
            let event = GameEvent::Healed {
                target: Side::Player,
                amount: healed,
            };
            state.record_event(event.clone());
            events.push(event);
            state.log(format!("A short rest heals {healed} HP."), LogKind::Heal);
        }

        self.install_floor(state);
        Ok(events)
    }
}
