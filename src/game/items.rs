use once_cell::sync::Lazy;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::board::EffectKind;
use super::rules::TurnError;
use super::state::{EncounterState, GameEvent, LogKind, Side};

/// 标准偷看窗口。
const WINDOW_REVEAL_MS: u32 = 2500;
/// 全盘一瞥的超短窗口。
const WINDOW_GLIMPSE_MS: u32 = 800;
/// 蜡烛:更多张,更短窗口。
const WINDOW_CANDLE_MS: u32 = 1200;
/// 仪式的生命代价。
const RITUAL_HP_COST: i32 = 2;
/// 绷带恢复量。
const BANDAGE_HEAL: i32 = 3;

/// 消耗品编号。序列化名与宿主存档中的历史取值保持一致。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemId {
    Spyglass,
    Hourglass,
    EyeOfFate,
    Bandage,
    Mercy,
    Brainfog,
    Sleep,
    Ritual,
    Candle,
    Trickster,
    Mirror,
}

impl FromStr for ItemId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SPYGLASS" => Ok(ItemId::Spyglass),
            "HOURGLASS" => Ok(ItemId::Hourglass),
            "EYE_OF_FATE" => Ok(ItemId::EyeOfFate),
            "BANDAGE" => Ok(ItemId::Bandage),
            "MERCY" => Ok(ItemId::Mercy),
            "BRAINFOG" => Ok(ItemId::Brainfog),
            "SLEEP" => Ok(ItemId::Sleep),
            "RITUAL" => Ok(ItemId::Ritual),
            "CANDLE" => Ok(ItemId::Candle),
            "TRICKSTER" => Ok(ItemId::Trickster),
            "MIRROR" => Ok(ItemId::Mirror),
            _ => Err(()),
        }
    }
}

/// 商店与背包展示用的条目。
#[derive(Debug, Clone, Serialize)]
pub struct ItemSpec {
    pub id: ItemId,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: i32,
}

pub static CATALOG: Lazy<Vec<ItemSpec>> = Lazy::new(|| {
    vec![
        ItemSpec {
            id: ItemId::Spyglass,
            name: "Spyglass",
            description: "Briefly reveal two hidden cards.",
            cost: 10,
        },
        ItemSpec {
            id: ItemId::Candle,
            name: "Candle",
            description: "A flicker of light reveals four cards, briefly.",
            cost: 20,
        },
        ItemSpec {
            id: ItemId::Hourglass,
            name: "Hourglass",
            description: "Freeze time and glimpse the entire board for an instant.",
            cost: 25,
        },
        ItemSpec {
            id: ItemId::EyeOfFate,
            name: "Eye of Fate",
            description: "Fate flips a matching pair for you.",
            cost: 40,
        },
        ItemSpec {
            id: ItemId::Bandage,
            name: "Bandage",
            description: "Restore 3 HP.",
            cost: 15,
        },
        ItemSpec {
            id: ItemId::Mercy,
            name: "Mercy",
            description: "Your next mismatch does not end your turn.",
            cost: 20,
        },
        ItemSpec {
            id: ItemId::Mirror,
            name: "Mirror",
            description: "Your next match is doubled.",
            cost: 35,
        },
        ItemSpec {
            id: ItemId::Sleep,
            name: "Sleep",
            description: "The enemy dozes through its next turn.",
            cost: 30,
        },
        ItemSpec {
            id: ItemId::Brainfog,
            name: "Brainfog",
            description: "The enemy forgets everything it has seen.",
            cost: 15,
        },
        ItemSpec {
            id: ItemId::Ritual,
            name: "Ritual",
            description: "Pay 2 HP; blood shows you three hidden cards.",
            cost: 10,
        },
        ItemSpec {
            id: ItemId::Trickster,
            name: "Trickster",
            description: "One hidden card becomes wild.",
            cost: 25,
        },
    ]
});

pub fn spec(id: ItemId) -> &'static ItemSpec {
    CATALOG
        .iter()
        .find(|entry| entry.id == id)
        .expect("every item id has a catalog entry")
}

/// 使用效果在规则层还需要排程的后续动作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFollowUp {
    /// 临时翻开若干张,窗口结束后自动盖回。
    RevealWindow { indices: Vec<usize>, window_ms: u32 },
    /// 两张已翻开的牌按玩家配对走正常结算。
    ResolvePair { first: usize, second: usize },
}

fn reveal_random(
    state: &mut EncounterState,
    rng: &mut SmallRng,
    count: usize,
    window_ms: u32,
) -> Result<ItemFollowUp, TurnError> {
    let mut hidden = state.hidden_positions();
    if hidden.is_empty() {
        return Err(TurnError::ItemUnusable);
    }
    hidden.shuffle(rng);
    hidden.truncate(count);
    hidden.sort_unstable();
    for index in &hidden {
        state.reveal(*index);
    }
    let event = GameEvent::CardsRevealed {
        indices: hidden.clone(),
        window_ms,
    };
    state.record_event(event);
    Ok(ItemFollowUp::RevealWindow {
        indices: hidden,
        window_ms,
    })
}

/// 在隐藏牌中找一对同种可配对的牌。
fn find_hidden_pair(state: &EncounterState, rng: &mut SmallRng) -> Option<(usize, usize)> {
    let mut kinds: Vec<EffectKind> = Vec::new();
    for card in &state.cards {
        if card.hidden() && !card.disabled && !card.wild && !kinds.contains(&card.effect) {
            kinds.push(card.effect);
        }
    }
    kinds.retain(|kind| {
        state
            .cards
            .iter()
            .filter(|card| card.hidden() && !card.disabled && !card.wild && card.effect == *kind)
            .count()
            >= 2
    });
    let kind = *kinds.choose(rng)?;
    let positions: Vec<usize> = state
        .cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.hidden() && !card.disabled && !card.wild && card.effect == kind)
        .map(|(index, _)| index)
        .collect();
    Some((positions[0], positions[1]))
}

/// 应用一件消耗品。所有校验先于任何改动,失败时状态不变。
/// 背包扣减与 ItemUsed 事件由规则层负责。
pub fn apply_item(
    state: &mut EncounterState,
    rng: &mut SmallRng,
    item: ItemId,
) -> Result<Option<ItemFollowUp>, TurnError> {
    match item {
        ItemId::Spyglass => {
            let follow_up = reveal_random(state, rng, 2, WINDOW_REVEAL_MS)?;
            state.log("The spyglass peers beyond the veil...", LogKind::Item);
            Ok(Some(follow_up))
        }
        ItemId::Candle => {
            let follow_up = reveal_random(state, rng, 4, WINDOW_CANDLE_MS)?;
            state.log("Candlelight dances over the cards.", LogKind::Item);
            Ok(Some(follow_up))
        }
        ItemId::Hourglass => {
            let count = state.hidden_positions().len();
            let follow_up = reveal_random(state, rng, count, WINDOW_GLIMPSE_MS)?;
            state.log("Time holds its breath and the whole board flashes!", LogKind::Item);
            Ok(Some(follow_up))
        }
        ItemId::EyeOfFate => {
            if !state.flipped.is_empty() {
                return Err(TurnError::ItemUnusable);
            }
            let (first, second) = find_hidden_pair(state, rng).ok_or(TurnError::ItemUnusable)?;
            state.reveal(first);
            state.reveal(second);
            state.flipped = vec![first, second];
            let event = GameEvent::CardsRevealed {
                indices: vec![first, second],
                window_ms: 0,
            };
            state.record_event(event);
            state.log("The Eye of Fate opens...", LogKind::Item);
            Ok(Some(ItemFollowUp::ResolvePair { first, second }))
        }
        ItemId::Bandage => {
            if state.player.current_hp >= state.player.max_hp {
                return Err(TurnError::ItemUnusable);
            }
            let applied = state.player.heal(BANDAGE_HEAL);
            let event = GameEvent::Healed {
                target: Side::Player,
                amount: applied,
            };
            state.record_event(event);
            state.log(format!("Bandaged up: +{applied} HP."), LogKind::Heal);
            Ok(None)
        }
        ItemId::Mercy => {
            if state.flags.mercy_active {
                return Err(TurnError::ItemUnusable);
            }
            state.flags.mercy_active = true;
            state.log("A merciful spirit watches over you.", LogKind::Item);
            Ok(None)
        }
        ItemId::Mirror => {
            if state.flags.mirror_active {
                return Err(TurnError::ItemUnusable);
            }
            state.flags.mirror_active = true;
            state.log("The mirror drinks in the light...", LogKind::Item);
            Ok(None)
        }
        ItemId::Sleep => {
            if state.flags.enemy_skipped {
                return Err(TurnError::ItemUnusable);
            }
            state.flags.enemy_skipped = true;
            let name = state.enemy().name.clone();
            state.log(format!("{name}'s eyelids grow heavy..."), LogKind::Item);
            Ok(None)
        }
        ItemId::Brainfog => {
            state.ai_memory.clear();
            state.record_event(GameEvent::MemoryErased);
            let name = state.enemy().name.clone();
            state.log(format!("A fog settles over {name}'s mind."), LogKind::Item);
            Ok(None)
        }
        ItemId::Ritual => {
            if state.player.current_hp <= RITUAL_HP_COST {
                return Err(TurnError::ItemUnusable);
            }
            let follow_up = reveal_random(state, rng, 3, WINDOW_REVEAL_MS)?;
            // 生命代价绕过护盾,这是代价不是伤害。
            state.player.current_hp -= RITUAL_HP_COST;
            state.log(
                format!("Blood for knowledge: -{RITUAL_HP_COST} HP."),
                LogKind::Item,
            );
            Ok(Some(follow_up))
        }
        ItemId::Trickster => {
            let candidates: Vec<usize> = state
                .cards
                .iter()
                .enumerate()
                .filter(|(_, card)| card.hidden() && !card.disabled && !card.wild)
                .map(|(index, _)| index)
                .collect();
            let index = *candidates.as_slice().choose(rng).ok_or(TurnError::ItemUnusable)?;
            state.cards[index].wild = true;
            let event = GameEvent::CardTurnedWild { index };
            state.record_event(event);
            state.log("The trickster palms a card. Anything goes!", LogKind::Item);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::generate_board;
    use crate::game::state::{Difficulty, Entity, TurnPhase};
    use rand::SeedableRng;

    fn state() -> EncounterState {
        let player = Entity::new_player("Hero", 12, None);
        let mut enemy = Entity::new_player("Hollow Guard", 10, None);
        enemy.difficulty = Difficulty::Medium;
        let mut state = EncounterState::new("2024-1-1", player, vec![enemy]);
        state.cards = generate_board("2024-1-1-floor-0", 0);
        state.phase = TurnPhase::PlayerTurn;
        state
    }

    #[test]
    fn catalog_covers_every_item() {
        assert_eq!(CATALOG.len(), 11);
        for entry in CATALOG.iter() {
            assert!(entry.cost > 0);
            assert_eq!(spec(entry.id).id, entry.id);
        }
    }

    #[test]
    fn item_ids_round_trip_through_strings() {
        let json = serde_json::to_string(&ItemId::EyeOfFate).expect("serialize");
        assert_eq!(json, "\"EYE_OF_FATE\"");
        assert_eq!("eye_of_fate".parse::<ItemId>(), Ok(ItemId::EyeOfFate));
        assert!("TELESCOPE".parse::<ItemId>().is_err());
    }

    #[test]
    fn spyglass_reveals_and_feeds_ai_memory() {
        let mut state = state();
        let mut rng = SmallRng::seed_from_u64(3);

        let follow_up = apply_item(&mut state, &mut rng, ItemId::Spyglass)
            .expect("spyglass should apply")
            .expect("spyglass has a follow-up");

        let ItemFollowUp::RevealWindow { indices, window_ms } = follow_up else {
            panic!("expected a reveal window");
        };
        assert_eq!(indices.len(), 2);
        assert_eq!(window_ms, 2500);
        for index in indices {
            assert!(state.cards[index].face_up);
            assert!(
                state.ai_memory.contains_key(&index),
                "anything the player sees, the enemy sees"
            );
        }
    }

    #[test]
    fn hourglass_glimpses_the_whole_board() {
        let mut state = state();
        let mut rng = SmallRng::seed_from_u64(3);

        let follow_up = apply_item(&mut state, &mut rng, ItemId::Hourglass)
            .expect("hourglass should apply")
            .expect("hourglass has a follow-up");
        let ItemFollowUp::RevealWindow { indices, .. } = follow_up else {
            panic!("expected a reveal window");
        };
        assert_eq!(indices.len(), 16);
        assert_eq!(state.ai_memory.len(), 16);
    }

    #[test]
    fn eye_of_fate_selects_a_real_pair() {
        let mut state = state();
        let mut rng = SmallRng::seed_from_u64(9);

        let follow_up = apply_item(&mut state, &mut rng, ItemId::EyeOfFate)
            .expect("eye of fate should apply")
            .expect("eye of fate has a follow-up");
        let ItemFollowUp::ResolvePair { first, second } = follow_up else {
            panic!("expected a pair resolution");
        };
        assert_eq!(state.cards[first].effect, state.cards[second].effect);
        assert_eq!(state.flipped, vec![first, second]);
    }

    #[test]
    fn bandage_rejected_at_full_hp() {
        let mut state = state();
        assert_eq!(
            apply_item(&mut state, &mut SmallRng::seed_from_u64(1), ItemId::Bandage),
            Err(TurnError::ItemUnusable)
        );

        state.player.current_hp = 8;
        apply_item(&mut state, &mut SmallRng::seed_from_u64(1), ItemId::Bandage)
            .expect("bandage should apply when wounded");
        assert_eq!(state.player.current_hp, 11);
    }

    #[test]
    fn ritual_costs_hp_and_needs_spare_hp() {
        let mut state = state();
        state.player.current_hp = 2;
        assert_eq!(
            apply_item(&mut state, &mut SmallRng::seed_from_u64(1), ItemId::Ritual),
            Err(TurnError::ItemUnusable)
        );
        assert_eq!(state.player.current_hp, 2, "rejection leaves state untouched");

        state.player.current_hp = 6;
        apply_item(&mut state, &mut SmallRng::seed_from_u64(1), ItemId::Ritual)
            .expect("ritual should apply");
        assert_eq!(state.player.current_hp, 4);
    }

    #[test]
    fn brainfog_erases_memory() {
        let mut state = state();
        state.reveal(0);
        state.reveal(3);
        state.cards[0].face_up = false;
        state.cards[3].face_up = false;
        assert_eq!(state.ai_memory.len(), 2);

        apply_item(&mut state, &mut SmallRng::seed_from_u64(1), ItemId::Brainfog)
            .expect("brainfog always applies");
        assert!(state.ai_memory.is_empty());
    }

    #[test]
    fn trickster_marks_one_hidden_card_wild() {
        let mut state = state();
        apply_item(&mut state, &mut SmallRng::seed_from_u64(5), ItemId::Trickster)
            .expect("trickster should apply");
        let wilds: Vec<&crate::game::board::Card> =
            state.cards.iter().filter(|card| card.wild).collect();
        assert_eq!(wilds.len(), 1);
        assert!(!wilds[0].face_up);
    }

    #[test]
    fn one_shot_flags_cannot_stack() {
        let mut state = state();
        let mut rng = SmallRng::seed_from_u64(1);
        apply_item(&mut state, &mut rng, ItemId::Mercy).expect("first mercy applies");
        assert_eq!(
            apply_item(&mut state, &mut rng, ItemId::Mercy),
            Err(TurnError::ItemUnusable)
        );
    }
}
