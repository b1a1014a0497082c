use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::board::EffectKind;
use super::state::{BossKind, EncounterState, GameEvent, LogKind};

/// 棋盘上剩余未配对牌数不超过该值时,禁用机制整体跳过,
/// 保证任何时刻都有至少两张可选牌(防死局)。
pub const DISABLE_SUPPRESS_THRESHOLD: usize = 4;
/// 烧灼每层结算 1 点伤害,只有护盾可以抵挡。
const BURN_TICK_DAMAGE: i32 = 1;
/// 每次禁用的牌数:同种一对,保持各种类偶数不变式。
const DISABLE_PAIR_SIZE: usize = 2;

/// Boss 在玩家配对失败时的反应,由规则层执行或排程。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BossReaction {
    BurnStack,
    DisablePair([usize; 2]),
    Confuse(usize, usize),
}

/// 玩家配对失败时计算当前 Boss 的反应。没有 Boss 特性或条件不满足时为 None。
pub fn mismatch_reaction(state: &EncounterState, rng: &mut SmallRng) -> Option<BossReaction> {
    match state.enemy().boss? {
        BossKind::Burn => Some(BossReaction::BurnStack),
        BossKind::Slime => pick_disable_pair(state, rng).map(BossReaction::DisablePair),
        BossKind::Confusion => {
            pick_confusion_pair(state, rng).map(|(first, second)| BossReaction::Confuse(first, second))
        }
    }
}

/// 选出一对同种、背面朝上、未禁用的牌用于黏液禁用。
/// 剩余未配对牌不超过阈值时完全跳过。
fn pick_disable_pair(state: &EncounterState, rng: &mut SmallRng) -> Option<[usize; 2]> {
    if state.unmatched_count() <= DISABLE_SUPPRESS_THRESHOLD {
        return None;
    }

    let mut kinds: Vec<EffectKind> = Vec::new();
    for (index, card) in state.cards.iter().enumerate() {
        if card.hidden() && !card.disabled && !card.wild {
            let duplicate = state.cards.iter().enumerate().any(|(other, candidate)| {
                other != index
                    && candidate.hidden()
                    && !candidate.disabled
                    && !candidate.wild
                    && candidate.effect == card.effect
            });
            if duplicate && !kinds.contains(&card.effect) {
                kinds.push(card.effect);
            }
        }
    }

    let kind = *kinds.choose(rng)?;
    let mut positions: Vec<usize> = state
        .cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.hidden() && !card.disabled && !card.wild && card.effect == kind)
        .map(|(index, _)| index)
        .collect();
    positions.shuffle(rng);
    positions.truncate(DISABLE_PAIR_SIZE);
    if positions.len() < DISABLE_PAIR_SIZE {
        return None;
    }
    Some([positions[0], positions[1]])
}

/// 选出两张身份不同的隐藏牌用于混乱交换。
fn pick_confusion_pair(state: &EncounterState, rng: &mut SmallRng) -> Option<(usize, usize)> {
    let hidden = state.hidden_positions();
    if hidden.len() < 2 {
        return None;
    }
    // 最多尝试几次找到效果不同的两张;全同时交换也无妨。
    for _ in 0..8 {
        let first = hidden[rng.gen_range(0..hidden.len())];
        let second = hidden[rng.gen_range(0..hidden.len())];
        if first == second {
            continue;
        }
        if state.cards[first].effect != state.cards[second].effect
            || state.cards[first].wild != state.cards[second].wild
        {
            return Some((first, second));
        }
    }
    let first = hidden[0];
    let second = hidden[1];
    if first == second {
        None
    } else {
        Some((first, second))
    }
}

/// 执行禁用:两张同种牌在玩家下一回合内不可选中。
pub fn apply_disable(state: &mut EncounterState, pair: [usize; 2]) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for index in pair {
        if let Some(card) = state.cards.get_mut(index) {
            card.disabled = true;
        }
    }
    let enemy_name = state.enemy().name.clone();
    let event = GameEvent::CardsDisabled {
        indices: pair.to_vec(),
    };
    state.record_event(event.clone());
    events.push(event);
    state.log(
        format!("{enemy_name} spits slime over two cards!"),
        LogKind::Enemy,
    );
    events
}

/// 玩家回合结束时,之前被黏住的牌恢复可选。
pub fn recover_disabled(state: &mut EncounterState) -> Vec<GameEvent> {
    let indices: Vec<usize> = state
        .cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.disabled)
        .map(|(index, _)| index)
        .collect();
    if indices.is_empty() {
        return Vec::new();
    }
    for index in &indices {
        state.cards[*index].disabled = false;
    }
    let event = GameEvent::CardsRecovered {
        indices: indices.clone(),
    };
    state.record_event(event.clone());
    state.log("The slime dissolves.", LogKind::Info);
    vec![event]
}

/// 提交混乱交换:两张隐藏牌互换身份(效果与万能标记),位置与 id 不变。
pub fn commit_confusion(state: &mut EncounterState, first: usize, second: usize) -> Vec<GameEvent> {
    if first >= state.cards.len() || second >= state.cards.len() || first == second {
        return Vec::new();
    }
    if !state.cards[first].hidden() || !state.cards[second].hidden() {
        return Vec::new();
    }

    let first_effect = state.cards[first].effect;
    let first_wild = state.cards[first].wild;
    state.cards[first].effect = state.cards[second].effect;
    state.cards[first].wild = state.cards[second].wild;
    state.cards[second].effect = first_effect;
    state.cards[second].wild = first_wild;

    let enemy_name = state.enemy().name.clone();
    let event = GameEvent::CardsConfused {
        indices: [first, second],
    };
    state.record_event(event.clone());
    state.log(
        format!("{enemy_name} twists reality and two cards trade places!"),
        LogKind::Enemy,
    );
    vec![event]
}

/// 玩家回合结束时的烧灼结算:消耗一层,造成 1 点只受护盾减免的伤害。
pub fn burn_tick(state: &mut EncounterState) -> Vec<GameEvent> {
    if state.flags.burn_stacks == 0 {
        return Vec::new();
    }
    state.flags.burn_stacks -= 1;
    let stacks_left = state.flags.burn_stacks;
    state.player.take_damage(BURN_TICK_DAMAGE);
    let event = GameEvent::BurnTick { stacks_left };
    state.record_event(event.clone());
    state.log("The burn sears you for 1 damage.", LogKind::Burn);
    vec![event]
}

/// 烧灼层数累积(玩家在烧灼 Boss 面前配对失败)。
pub fn add_burn_stack(state: &mut EncounterState) {
    state.flags.burn_stacks += 1;
    let enemy_name = state.enemy().name.clone();
    state.log(format!("{enemy_name}'s flames cling to you..."), LogKind::Burn);
}
