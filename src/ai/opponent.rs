use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::board::EffectKind;
use crate::game::state::{Difficulty, EncounterState, LogKind};

/// AI 连续配对的上限:第 3 次必然失手,避免玩家被整轮清场。
const STREAK_CAP: u32 = 2;
/// 计划性失误只在场上还剩这么多张以上时消耗预算。
const PLANNED_MISTAKE_MIN_CARDS: usize = 4;

/// 难度参数:遗忘率 / 二次犹豫率 / 每局一次的保底失误。
/// 最高档位不靠降低数值,而是靠额外的计划性失误预算维持可胜性。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiProfile {
    pub forget_chance: f64,
    pub second_guess_chance: f64,
    pub guaranteed_mistake: bool,
}

impl AiProfile {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                forget_chance: 0.5,
                second_guess_chance: 0.6,
                guaranteed_mistake: true,
            },
            Difficulty::Medium => Self {
                forget_chance: 0.3,
                second_guess_chance: 0.3,
                guaranteed_mistake: true,
            },
            Difficulty::Hard => Self {
                forget_chance: 0.4,
                second_guess_chance: 0.6,
                guaranteed_mistake: true,
            },
        }
    }

    /// Hard 档位每局的计划性失误预算。
    pub fn roll_planned_mistakes(difficulty: Difficulty, rng: &mut SmallRng) -> u32 {
        match difficulty {
            Difficulty::Hard => rng.gen_range(1..=3),
            _ => 0,
        }
    }
}

/// 第一张牌的决策。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirstDecision {
    /// 可选位置不足两个,把回合让回玩家。
    Pass,
    Flip {
        index: usize,
        /// 记忆中已锁定的搭档位置(跳过二次犹豫)。
        planned: Option<usize>,
    },
}

/// 第二张牌的决策与配套的台词分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondNote {
    Planned,
    KnownPair,
    DeliberateMiss,
    Guess,
}

/// 不完美记忆的对手。记忆本身存放在对局状态里(公平规则);
/// 这里只保存决策随机流。
pub struct OpponentAi {
    rng: SmallRng,
}

impl Default for OpponentAi {
    fn default() -> Self {
        Self::new()
    }
}

impl OpponentAi {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// 记忆中找一对:已记住、未配对、未禁用、非万能、同种。
    fn find_memory_pair(&self, state: &EncounterState) -> Option<(usize, usize)> {
        let mut seen: HashMap<EffectKind, usize> = HashMap::new();
        for (&index, entry) in &state.ai_memory {
            let Some(card) = state.cards.get(index) else {
                continue;
            };
            if card.matched || card.disabled || card.face_up || entry.wild {
                continue;
            }
            if let Some(&partner) = seen.get(&entry.effect) {
                return Some((partner, index));
            }
            seen.insert(entry.effect, index);
        }
        None
    }

    /// 每个 AI 回合的第一步。平衡规则依次生效:
    /// 连击封顶、计划性失误预算、遗忘率与保底失误。
    pub fn decide_first(&mut self, state: &mut EncounterState) -> FirstDecision {
        let selectable = state.selectable_positions();
        if selectable.len() < 2 {
            return FirstDecision::Pass;
        }

        let enemy_name = state.enemy().name.clone();
        let difficulty = state.enemy().difficulty;
        let profile = AiProfile::for_difficulty(difficulty);
        let mut candidate = self.find_memory_pair(state);
        let force_streak_end = state.flags.enemy_matches_in_turn >= STREAK_CAP;

        if force_streak_end && candidate.is_some() {
            state.log(
                format!("{enemy_name} gets greedy and loses focus..."),
                LogKind::Info,
            );
            candidate = None;
        }

        if difficulty == Difficulty::Hard
            && state.unmatched_count() > PLANNED_MISTAKE_MIN_CARDS
            && state.flags.boss_mistake_budget > 0
            && candidate.is_some()
            && !force_streak_end
        {
            candidate = None;
            state.flags.boss_mistake_budget -= 1;
            state.log(
                format!("{enemy_name} seems distracted by the chaos..."),
                LogKind::Info,
            );
        }

        if candidate.is_some() {
            let mut force_error = false;
            if profile.guaranteed_mistake && !state.flags.ai_mistake_made {
                force_error = true;
                state.flags.ai_mistake_made = true;
            }
            if force_error || self.rng.gen::<f64>() < profile.forget_chance {
                candidate = None;
            }
        }

        if let Some((first, second)) = candidate {
            return FirstDecision::Flip {
                index: first,
                planned: Some(second),
            };
        }

        // 没有可用记忆对:优先探索没有记忆条目的未知位置。
        let unknown: Vec<usize> = selectable
            .iter()
            .copied()
            .filter(|index| !state.ai_memory.contains_key(index))
            .collect();
        let index = if let Some(&pick) = unknown.as_slice().choose(&mut self.rng) {
            pick
        } else {
            *selectable
                .as_slice()
                .choose(&mut self.rng)
                .expect("selectable checked above")
        };
        FirstDecision::Flip {
            index,
            planned: None,
        }
    }

    /// 第一张翻开后的第二步。返回 None 表示没有第二个可选位置,
    /// 规则层应把第一张盖回并让回回合(防御性守卫)。
    pub fn decide_second(
        &mut self,
        state: &mut EncounterState,
        first: usize,
        planned: Option<usize>,
    ) -> Option<(usize, SecondNote)> {
        if let Some(partner) = planned {
            return Some((partner, SecondNote::Planned));
        }

        let candidates: Vec<usize> = state
            .selectable_positions()
            .into_iter()
            .filter(|&index| index != first && !state.cards[index].face_up)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let enemy_name = state.enemy().name.clone();
        let difficulty = state.enemy().difficulty;
        let profile = AiProfile::for_difficulty(difficulty);
        let first_effect = state.cards[first].effect;
        let force_streak_end = state.flags.enemy_matches_in_turn >= STREAK_CAP;

        // 翻开第一张后再查一次记忆:刚才可能看见过它的搭档。
        let partner = state.ai_memory.iter().find_map(|(&index, entry)| {
            if index == first || entry.wild || entry.effect != first_effect {
                return None;
            }
            let card = state.cards.get(index)?;
            if card.matched || card.disabled || card.face_up {
                return None;
            }
            Some(index)
        });

        if let Some(partner) = partner {
            let mut force_error = false;
            if profile.guaranteed_mistake && !state.flags.ai_mistake_made {
                force_error = true;
                state.flags.ai_mistake_made = true;
            }

            if force_streak_end || force_error || self.rng.gen::<f64>() < profile.second_guess_chance
            {
                let wrong: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&index| index != partner)
                    .collect();
                if let Some(&miss) = wrong.as_slice().choose(&mut self.rng) {
                    state.log(format!("{enemy_name} stumbles!"), LogKind::Info);
                    return Some((miss, SecondNote::DeliberateMiss));
                }
                return Some((partner, SecondNote::KnownPair));
            }

            state.log(format!("{enemy_name} sneers..."), LogKind::Enemy);
            return Some((partner, SecondNote::KnownPair));
        }

        let pick = *candidates
            .as_slice()
            .choose(&mut self.rng)
            .expect("candidates checked above");
        Some((pick, SecondNote::Guess))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::generate_board;
    use crate::game::state::{Entity, EncounterState, MemoryEntry, TurnPhase};

    fn state_with_difficulty(difficulty: Difficulty) -> EncounterState {
        let player = Entity::new_player("Hero", 12, None);
        let mut enemy = Entity::new_player("The Forgotten", 15, None);
        enemy.difficulty = difficulty;
        let mut state = EncounterState::new("2024-1-1", player, vec![enemy]);
        state.cards = generate_board("2024-1-1-floor-0", 0);
        state.phase = TurnPhase::EnemyThinking;
        state
    }

    fn remember(state: &mut EncounterState, index: usize) {
        let entry = MemoryEntry {
            effect: state.cards[index].effect,
            wild: state.cards[index].wild,
        };
        state.ai_memory.insert(index, entry);
    }

    #[test]
    fn passes_when_fewer_than_two_cards_remain() {
        let mut state = state_with_difficulty(Difficulty::Easy);
        for index in 0..state.cards.len() {
            if index != 5 {
                state.cards[index].matched = true;
            }
        }
        let mut ai = OpponentAi::with_seed(1);
        assert_eq!(ai.decide_first(&mut state), FirstDecision::Pass);
    }

    #[test]
    fn guaranteed_mistake_fires_exactly_once() {
        let mut state = state_with_difficulty(Difficulty::Medium);
        // 喂给 AI 一对已知的攻击小牌(位置 5 和 6)。
        remember(&mut state, 5);
        remember(&mut state, 6);
        let mut ai = OpponentAi::with_seed(42);

        assert!(!state.flags.ai_mistake_made);
        let first = ai.decide_first(&mut state);
        assert!(
            state.flags.ai_mistake_made,
            "first real candidate must consume the guaranteed mistake"
        );
        // 保底失误丢弃了候选对,这一轮不会按计划直接翻搭档。
        if let FirstDecision::Flip { planned, .. } = first {
            assert_eq!(planned, None);
        }
    }

    #[test]
    fn streak_cap_discards_candidate_and_forces_miss() {
        let mut state = state_with_difficulty(Difficulty::Medium);
        state.flags.ai_mistake_made = true; // 保底失误已用过
        state.flags.enemy_matches_in_turn = 2;
        remember(&mut state, 5);
        remember(&mut state, 6);
        let mut ai = OpponentAi::with_seed(7);

        let first = ai.decide_first(&mut state);
        let FirstDecision::Flip { index, planned } = first else {
            panic!("ai should still flip");
        };
        assert_eq!(planned, None, "streak cap discards the known pair");

        state.reveal(index);
        state.flipped.push(index);
        if let Some((second, note)) = ai.decide_second(&mut state, index, None) {
            assert_ne!(second, index);
            // 若记忆中仍有搭档,封顶必须强制失手。
            if state.cards[second].effect == state.cards[index].effect {
                assert_ne!(note, SecondNote::KnownPair);
            }
        }
    }

    #[test]
    fn known_partner_is_taken_when_no_mistake_rolls() {
        let mut state = state_with_difficulty(Difficulty::Medium);
        state.flags.ai_mistake_made = true;
        // 先翻开 5,记忆里有 6(同为攻击小牌)。
        remember(&mut state, 6);
        state.reveal(5);
        state.flipped.push(5);

        // 扫多个种子,凡是没触发二次犹豫的,必须翻出正确搭档。
        let mut took_partner = false;
        for seed in 0..32 {
            let mut cloned = state.clone();
            let mut ai = OpponentAi::with_seed(seed);
            if let Some((second, SecondNote::KnownPair)) = ai.decide_second(&mut cloned, 5, None) {
                assert_eq!(second, 6);
                took_partner = true;
            }
        }
        assert!(took_partner, "some seed should take the remembered partner");
    }

    #[test]
    fn planned_pair_skips_the_second_guess() {
        let mut state = state_with_difficulty(Difficulty::Medium);
        let mut ai = OpponentAi::with_seed(3);
        let decision = ai.decide_second(&mut state, 5, Some(6));
        assert_eq!(decision, Some((6, SecondNote::Planned)));
    }

    #[test]
    fn hard_tier_spends_planned_mistake_budget() {
        let mut state = state_with_difficulty(Difficulty::Hard);
        state.flags.ai_mistake_made = true;
        state.flags.boss_mistake_budget = 2;
        remember(&mut state, 5);
        remember(&mut state, 6);

        // 扫种子直到预算被消耗:预算路径不依赖概率掷骰以外的状态。
        let mut spent = false;
        for seed in 0..16 {
            let mut cloned = state.clone();
            let mut ai = OpponentAi::with_seed(seed);
            let _ = ai.decide_first(&mut cloned);
            if cloned.flags.boss_mistake_budget == 1 {
                spent = true;
                break;
            }
        }
        assert!(spent, "hard tier must spend its planned-mistake budget");
    }

    #[test]
    fn budget_is_not_spent_on_small_boards() {
        let mut state = state_with_difficulty(Difficulty::Hard);
        state.flags.ai_mistake_made = true;
        state.flags.boss_mistake_budget = 2;
        // 只留 4 张:5/6(攻击小)与 0/13。
        for index in 0..state.cards.len() {
            if ![0, 5, 6, 13].contains(&index) {
                state.cards[index].matched = true;
            }
        }
        remember(&mut state, 5);
        remember(&mut state, 6);

        for seed in 0..16 {
            let mut cloned = state.clone();
            let mut ai = OpponentAi::with_seed(seed);
            let _ = ai.decide_first(&mut cloned);
            assert_eq!(
                cloned.flags.boss_mistake_budget, 2,
                "budget is reserved while four or fewer cards remain"
            );
        }
    }

    #[test]
    fn explores_unknown_positions_first() {
        let mut state = state_with_difficulty(Difficulty::Easy);
        state.flags.ai_mistake_made = true;
        // 记住除 9 以外的所有位置,但不构成任何同种对。
        for index in [0, 3, 7].iter() {
            remember(&mut state, *index);
        }

        let mut ai = OpponentAi::with_seed(5);
        let FirstDecision::Flip { index, planned } = ai.decide_first(&mut state) else {
            panic!("ai should flip");
        };
        assert_eq!(planned, None);
        assert!(
            !state.ai_memory.contains_key(&index),
            "first flip should explore unknown information"
        );
    }

    #[test]
    fn wild_and_disabled_entries_never_form_candidates() {
        let mut state = state_with_difficulty(Difficulty::Medium);
        state.flags.ai_mistake_made = true;
        remember(&mut state, 5);
        remember(&mut state, 6);
        state.cards[5].disabled = true;
        state.cards[6].wild = true;
        state.ai_memory.get_mut(&6).unwrap().wild = true;

        let mut ai = OpponentAi::with_seed(11);
        let FirstDecision::Flip { planned, .. } = ai.decide_first(&mut state) else {
            panic!("ai should flip");
        };
        assert_eq!(planned, None);
    }
}
