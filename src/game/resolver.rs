use super::board::{Card, Category, EffectKind};
use super::state::{ClassId, EncounterState, GameEvent, LogKind, Side};

/// Appraiser 在金币配对上的固定加成。
const APPRAISER_GOLD_BONUS: i32 = 2;
/// 两张万能牌互配时采用的缺省攻击效果。
const DOUBLE_WILD_EFFECT: EffectKind = EffectKind::AttackMedium;

/// 一次配对判定的结果:用于结算的类目与基础值。
/// 跨牌面的职业配对在连击加成之前取两张基础值的平均。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairOutcome {
    pub effect: EffectKind,
    pub category: Category,
    pub base_value: i32,
}

impl PairOutcome {
    fn from_kind(effect: EffectKind) -> Self {
        Self {
            effect,
            category: effect.category(),
            base_value: effect.base_value(),
        }
    }

    fn averaged(a: EffectKind, b: EffectKind) -> Self {
        Self {
            effect: a,
            category: a.category(),
            base_value: (a.base_value() + b.base_value()) / 2,
        }
    }
}

/// 判定两张牌是否构成配对,包含万能牌与职业被动的扩展规则。
/// 返回 None 表示不配对。
pub fn classify_pair(a: &Card, b: &Card, class: Option<ClassId>) -> Option<PairOutcome> {
    if a.wild && b.wild {
        return Some(PairOutcome::from_kind(DOUBLE_WILD_EFFECT));
    }
    if a.wild {
        return Some(PairOutcome::from_kind(b.effect));
    }
    if b.wild {
        return Some(PairOutcome::from_kind(a.effect));
    }
    if a.effect == b.effect {
        return Some(PairOutcome::from_kind(a.effect));
    }

    match class {
        Some(ClassId::Warden)
            if a.effect.category() == Category::Attack
                && b.effect.category() == Category::Attack =>
        {
            Some(PairOutcome::averaged(a.effect, b.effect))
        }
        Some(ClassId::Acolyte)
            if a.effect.category() == Category::Heal && b.effect.category() == Category::Heal =>
        {
            Some(PairOutcome::averaged(a.effect, b.effect))
        }
        _ => None,
    }
}

fn history_emoji(category: Category, by: Side) -> Option<&'static str> {
    match by {
        Side::Player => Some(match category {
            Category::Attack => "⚔️",
            Category::Heal => "💚",
            Category::Shield => "🛡️",
            Category::Gold => "🪙",
        }),
        Side::Enemy => match category {
            Category::Attack => Some("🩸"),
            _ => None,
        },
    }
}

/// 将一次配对的效果施加到实体上。纯状态变换,不抛错;
/// 终局标志已置位时静默丢弃。连击加成使用当前 streak(递增前)。
pub fn apply_match(state: &mut EncounterState, outcome: &PairOutcome, by: Side) -> Vec<GameEvent> {
    if !state.phase.in_combat() {
        return Vec::new();
    }

    let mut events = Vec::new();
    let mut value = state.combo.scaled(outcome.base_value);

    if by == Side::Player && state.flags.mirror_active {
        state.flags.mirror_active = false;
        value *= 2;
        let event = GameEvent::MirrorConsumed;
        state.record_event(event.clone());
        events.push(event);
        state.log("The mirror flares, doubling the effect!", LogKind::Item);
    }

    let combo_text = if state.combo.streak > 0 {
        format!(" (Combo {}!)", state.combo.multiplier_text())
    } else {
        String::new()
    };
    let enemy_name = state.enemy().name.clone();
    let class = state.player.class;

    if let Some(emoji) = history_emoji(outcome.category, by) {
        state.match_history.push(emoji.to_string());
    }

    match outcome.category {
        Category::Attack => {
            let target = by.other();
            let (absorbed, _) = state.entity_mut(target).take_damage(value);
            let event = GameEvent::DamageDealt {
                target,
                amount: value,
                absorbed,
            };
            state.record_event(event.clone());
            events.push(event);
            match by {
                Side::Player => state.log(
                    format!("Player attacks for {value} damage!{combo_text}"),
                    LogKind::Player,
                ),
                Side::Enemy => state.log(
                    format!("{enemy_name} attacks you for {value} damage!{combo_text}"),
                    LogKind::Enemy,
                ),
            }
        }
        Category::Heal => {
            let applied = state.entity_mut(by).heal(value);
            let overflow = value - applied;
            let event = GameEvent::Healed {
                target: by,
                amount: applied,
            };
            state.record_event(event.clone());
            events.push(event);
            // Acolyte 被动:治疗溢出转为护盾,而不是丢弃。
            if by == Side::Player && class == Some(ClassId::Acolyte) && overflow > 0 {
                state.player.shield += overflow;
                let event = GameEvent::ShieldGained {
                    target: Side::Player,
                    amount: overflow,
                };
                state.record_event(event.clone());
                events.push(event);
                state.log(
                    format!("Overflowing light hardens into {overflow} Shield."),
                    LogKind::Heal,
                );
            }
            match by {
                Side::Player => state.log(
                    format!("Player heals for {value} HP.{combo_text}"),
                    LogKind::Heal,
                ),
                Side::Enemy => state.log(
                    format!("{enemy_name} heals for {value} HP.{combo_text}"),
                    LogKind::Enemy,
                ),
            }
        }
        Category::Shield => {
            state.entity_mut(by).shield += value;
            let event = GameEvent::ShieldGained {
                target: by,
                amount: value,
            };
            state.record_event(event.clone());
            events.push(event);
            match by {
                Side::Player => state.log(
                    format!("Player gains {value} Shield.{combo_text}"),
                    LogKind::Player,
                ),
                Side::Enemy => state.log(
                    format!("{enemy_name} raises a shield ({value}).{combo_text}"),
                    LogKind::Enemy,
                ),
            }
        }
        Category::Gold => {
            if by == Side::Player {
                let mut gain = value;
                if class == Some(ClassId::Appraiser) {
                    gain += APPRAISER_GOLD_BONUS;
                }
                state.player.coins += gain;
                let event = GameEvent::CoinsFound { amount: gain };
                state.record_event(event.clone());
                events.push(event);
                state.log(
                    format!("Player found {gain} coins!{combo_text}"),
                    LogKind::Info,
                );
            } else {
                // 敌方的金币只是叙事,不入账。
                state.log(
                    format!("{enemy_name} finds some gold.{combo_text}"),
                    LogKind::Info,
                );
            }
        }
    }

    // Appraiser 被动:连击期间每次自配对都攒下一枚小饰物。
    if by == Side::Player && class == Some(ClassId::Appraiser) && state.combo.streak > 0 {
        state.player.trinkets += 1;
        let event = GameEvent::TrinketFound { amount: 1 };
        state.record_event(event.clone());
        events.push(event);
    }

    events
}
