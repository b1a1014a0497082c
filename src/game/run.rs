use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::board::BoardRng;
use super::items::ItemId;
use super::state::{BossKind, ClassId, Difficulty, EncounterState, Entity};

/// 每次登塔的层数。名册不足该数时回退到内置名册。
pub const FLOORS_PER_RUN: usize = 3;
/// 玩家初始生命上限。
pub const PLAYER_MAX_HP: i32 = 12;

/// 敌人提供方返回的原始条目。字段名与宿主的生成服务保持一致;
/// 提供方只负责风味,难度与 Boss 特性由核心按楼层指派。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySpec {
    pub name: String,
    pub max_hp: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visual: String,
}

static FALLBACK_ROSTER: Lazy<Vec<EnemySpec>> = Lazy::new(|| {
    vec![
        EnemySpec {
            name: "Rotting Rat".into(),
            max_hp: 6,
            description: "It gnaws at the roots of the world.".into(),
            visual: "🐀".into(),
        },
        EnemySpec {
            name: "Hollow Guard".into(),
            max_hp: 10,
            description: "Armor rusting over nothing but dust.".into(),
            visual: "🛡️".into(),
        },
        EnemySpec {
            name: "The Forgotten".into(),
            max_hp: 15,
            description: "It remembers you, but you do not remember it.".into(),
            visual: "👁️".into(),
        },
    ]
});

fn difficulty_for_floor(floor: usize) -> Difficulty {
    match floor {
        0 => Difficulty::Easy,
        1 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

/// 顶层 Boss 的特性由种子决定,同一天所有人遇到同一个。
pub fn boss_kind_for_seed(seed: &str) -> BossKind {
    let mut rng = BoardRng::new(seed);
    match rng.pick(3) {
        0 => BossKind::Burn,
        1 => BossKind::Slime,
        _ => BossKind::Confusion,
    }
}

fn entity_from_spec(spec: &EnemySpec, floor: usize, multiplier: f64) -> Entity {
    let scaled = ((spec.max_hp as f64) * multiplier).round() as i32;
    let max_hp = scaled.max(1);
    Entity {
        name: spec.name.clone(),
        max_hp,
        current_hp: max_hp,
        shield: 0,
        coins: 0,
        trinkets: 0,
        description: spec.description.clone(),
        visual: spec.visual.clone(),
        difficulty: difficulty_for_floor(floor),
        boss: None,
        class: None,
        date_encountered: None,
    }
}

/// 内置名册:提供方失效时的安全替补,对局照常进行。
pub fn fallback_roster(multiplier: f64) -> Vec<Entity> {
    FALLBACK_ROSTER
        .iter()
        .enumerate()
        .map(|(floor, spec)| entity_from_spec(spec, floor, multiplier))
        .collect()
}

/// 解析名册 JSON:既接受提供方的原始条目,也接受已归一化的实体列表
/// (后者不再套用倍率)。条目不足或格式不对时返回 None,调用方回退到
/// 内置名册;核心从不因提供方失败而中断。
pub fn roster_from_json(json: &str, multiplier: f64) -> Option<Vec<Entity>> {
    if let Ok(specs) = serde_json::from_str::<Vec<EnemySpec>>(json) {
        if specs.len() < FLOORS_PER_RUN {
            return None;
        }
        return Some(
            specs
                .iter()
                .take(FLOORS_PER_RUN)
                .enumerate()
                .map(|(floor, spec)| entity_from_spec(spec, floor, multiplier))
                .collect(),
        );
    }

    let entities = serde_json::from_str::<Vec<Entity>>(json).ok()?;
    if entities.len() < FLOORS_PER_RUN {
        return None;
    }
    Some(entities.into_iter().take(FLOORS_PER_RUN).collect())
}

/// 新开一局:安装名册、指派顶层 Boss 特性,阶段停在 Loading。
pub fn new_run(
    base_seed: impl Into<String>,
    mut enemies: Vec<Entity>,
    class: Option<ClassId>,
) -> EncounterState {
    let base_seed = base_seed.into();
    if let Some(last) = enemies.last_mut() {
        if last.difficulty == Difficulty::Hard && last.boss.is_none() {
            last.boss = Some(boss_kind_for_seed(&base_seed));
        }
    }
    let player = Entity::new_player("Hero", PLAYER_MAX_HP, class);
    EncounterState::new(base_seed, player, enemies)
}

/// 跨局进度聚合。核心只通过这些访问器读写,存储格式归宿主管。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProgress {
    #[serde(default)]
    pub coins: i32,
    #[serde(default)]
    pub inventory: Vec<ItemId>,
    #[serde(default)]
    pub bestiary: Vec<Entity>,
    #[serde(default)]
    pub unlocked_cosmetics: Vec<String>,
    #[serde(default)]
    pub selected_cosmetic: String,
    #[serde(default)]
    pub tower_level: u32,
}

impl UserProgress {
    pub fn new() -> Self {
        Self {
            coins: 0,
            inventory: Vec::new(),
            bestiary: Vec::new(),
            unlocked_cosmetics: vec!["default".into()],
            selected_cosmetic: "default".into(),
            tower_level: 0,
        }
    }

    pub fn has_item(&self, item: ItemId) -> bool {
        self.inventory.contains(&item)
    }

    pub fn grant_item(&mut self, item: ItemId) {
        self.inventory.push(item);
    }

    /// 消耗背包里的一份;不存在时无事发生。
    pub fn take_item(&mut self, item: ItemId) {
        if let Some(position) = self.inventory.iter().position(|entry| *entry == item) {
            self.inventory.remove(position);
        }
    }

    /// 同名敌人只录一次,带上首次遭遇的日期。
    pub fn record_bestiary(&mut self, mut entity: Entity, date: String) {
        if self.bestiary.iter().any(|entry| entry.name == entity.name) {
            return;
        }
        entity.date_encountered = Some(date);
        self.bestiary.push(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_roster_has_three_tiers() {
        let roster = fallback_roster(1.0);
        assert_eq!(roster.len(), FLOORS_PER_RUN);
        assert_eq!(roster[0].difficulty, Difficulty::Easy);
        assert_eq!(roster[1].difficulty, Difficulty::Medium);
        assert_eq!(roster[2].difficulty, Difficulty::Hard);
        assert_eq!(roster[0].max_hp, 6);
        assert_eq!(roster[2].max_hp, 15);
    }

    #[test]
    fn multiplier_scales_hp_with_a_floor_of_one() {
        let roster = fallback_roster(1.5);
        assert_eq!(roster[0].max_hp, 9);
        assert_eq!(roster[0].current_hp, 9);

        let tiny = fallback_roster(0.01);
        assert!(tiny.iter().all(|entity| entity.max_hp >= 1));
    }

    #[test]
    fn provider_json_is_parsed_with_fallback_on_garbage() {
        let json = r#"[
            {"name": "Ash Wisp", "maxHp": 7, "description": "Cinders.", "visual": "🔥"},
            {"name": "Bog Thing", "maxHp": 11, "description": "Wet.", "visual": "🦠"},
            {"name": "Crown of Teeth", "maxHp": 16, "description": "Bites.", "visual": "👑"}
        ]"#;
        let roster = roster_from_json(json, 1.0).expect("well-formed roster parses");
        assert_eq!(roster[2].name, "Crown of Teeth");
        assert_eq!(roster[2].difficulty, Difficulty::Hard);

        assert!(roster_from_json("not json", 1.0).is_none());
        assert!(roster_from_json("[]", 1.0).is_none());
        assert!(
            roster_from_json(r#"[{"name":"One","maxHp":5}]"#, 1.0).is_none(),
            "fewer than three entries falls back"
        );
    }

    #[test]
    fn normalized_entity_lists_pass_through() {
        let roster = fallback_roster(1.0);
        let json = serde_json::to_string(&roster).expect("roster serializes");
        let parsed = roster_from_json(&json, 2.0).expect("entity list parses");
        assert_eq!(parsed[0].max_hp, 6, "no re-scaling on normalized entities");
    }

    #[test]
    fn new_run_assigns_a_deterministic_boss_kind() {
        let first = new_run("2024-1-1", fallback_roster(1.0), None);
        let second = new_run("2024-1-1", fallback_roster(1.0), None);
        let boss = first.enemies[2].boss.expect("hard tier gets a boss kind");
        assert_eq!(second.enemies[2].boss, Some(boss));

        assert_eq!(first.enemies[0].boss, None);
        assert_eq!(first.player.max_hp, PLAYER_MAX_HP);
    }

    #[test]
    fn bestiary_records_each_enemy_once() {
        let mut progress = UserProgress::new();
        let rat = fallback_roster(1.0).remove(0);
        progress.record_bestiary(rat.clone(), "2024-1-1".into());
        progress.record_bestiary(rat, "2024-1-2".into());

        assert_eq!(progress.bestiary.len(), 1);
        assert_eq!(
            progress.bestiary[0].date_encountered.as_deref(),
            Some("2024-1-1")
        );
    }

    #[test]
    fn inventory_take_removes_a_single_copy() {
        let mut progress = UserProgress::new();
        progress.grant_item(ItemId::Mercy);
        progress.grant_item(ItemId::Mercy);
        progress.take_item(ItemId::Mercy);
        assert!(progress.has_item(ItemId::Mercy));
        progress.take_item(ItemId::Mercy);
        assert!(!progress.has_item(ItemId::Mercy));
    }
}
