use serde::{Deserialize, Serialize};

/// 效果大类,决定结算路径与职业被动的适用范围。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Attack,
    Heal,
    Shield,
    Gold,
}

/// 卡牌效果种类。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EffectKind {
    AttackSmall,
    AttackMedium,
    AttackBig,
    HealSmall,
    HealMedium,
    Shield,
    GoldSmall,
    GoldMedium,
}

impl EffectKind {
    /// 未经连击加成的基础数值。
    pub fn base_value(&self) -> i32 {
        match self {
            EffectKind::AttackSmall => 2,
            EffectKind::AttackMedium => 4,
            EffectKind::AttackBig => 6,
            EffectKind::HealSmall => 2,
            EffectKind::HealMedium => 4,
            EffectKind::Shield => 2,
            EffectKind::GoldSmall => 5,
            EffectKind::GoldMedium => 10,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            EffectKind::AttackSmall | EffectKind::AttackMedium | EffectKind::AttackBig => {
                Category::Attack
            }
            EffectKind::HealSmall | EffectKind::HealMedium => Category::Heal,
            EffectKind::Shield => Category::Shield,
            EffectKind::GoldSmall | EffectKind::GoldMedium => Category::Gold,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectKind::AttackSmall => "Attack",
            EffectKind::AttackMedium => "Slash",
            EffectKind::AttackBig => "Heavy Hit",
            EffectKind::HealSmall => "Heal",
            EffectKind::HealMedium => "Big Heal",
            EffectKind::Shield => "Shield",
            EffectKind::GoldSmall => "Gold",
            EffectKind::GoldMedium => "Treasure",
        }
    }
}

/// 牌面组成:8 项各复制一份,共 16 张。
pub const DECK_COMPOSITION: [EffectKind; 8] = [
    EffectKind::AttackSmall,
    EffectKind::AttackSmall,
    EffectKind::AttackMedium,
    EffectKind::AttackBig,
    EffectKind::HealSmall,
    EffectKind::HealMedium,
    EffectKind::Shield,
    EffectKind::GoldSmall,
];

/// 棋盘上的一张牌。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub effect: EffectKind,
    #[serde(default)]
    pub face_up: bool,
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub wild: bool,
}

impl Card {
    pub fn new(id: String, effect: EffectKind) -> Self {
        Self {
            id,
            effect,
            face_up: false,
            matched: false,
            disabled: false,
            wild: false,
        }
    }

    /// 可被任一方选中。
    pub fn selectable(&self) -> bool {
        !self.matched && !self.disabled
    }

    /// 仍在场且背面朝上。
    pub fn hidden(&self) -> bool {
        !self.matched && !self.face_up
    }
}

/// 由种子字符串驱动的整数流:FNV-1a 哈希接线性同余,
/// 全部在 u32 上运算,跨平台可复现。
#[derive(Debug, Clone)]
pub struct BoardRng {
    seed: u32,
}

impl BoardRng {
    pub fn new(seed_str: &str) -> Self {
        let mut h: u32 = 0x811c_9dc5;
        for byte in seed_str.bytes() {
            h ^= byte as u32;
            h = h.wrapping_mul(0x0100_0193);
        }
        Self { seed: h }
    }

    /// 返回 [0, 1) 区间的浮点数。
    pub fn next_f64(&mut self) -> f64 {
        self.seed = self
            .seed
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.seed as f64 / 4_294_967_296.0
    }

    /// 返回 [0, upper) 区间的下标。
    pub fn pick(&mut self, upper: usize) -> usize {
        (self.next_f64() * upper as f64) as usize
    }
}

/// 某一楼层、某一轮的棋盘种子。轮数参与种子,连续重洗互不相同。
pub fn board_seed(base: &str, floor: usize, round: u32) -> String {
    if round == 0 {
        format!("{base}-floor-{floor}")
    } else {
        format!("{base}-floor-{floor}-round-{round}")
    }
}

/// 从种子生成完整棋盘:固定组成翻倍成 16 张,Fisher–Yates 洗牌。
/// 纯函数,同一种子永远得到同一顺序。
pub fn generate_board(seed: &str, round: u32) -> Vec<Card> {
    let mut effects = Vec::with_capacity(DECK_COMPOSITION.len() * 2);
    for effect in DECK_COMPOSITION {
        effects.push(effect);
        effects.push(effect);
    }

    let mut rng = BoardRng::new(seed);
    for i in (1..effects.len()).rev() {
        let j = rng.pick(i + 1);
        effects.swap(i, j);
    }

    effects
        .into_iter()
        .enumerate()
        .map(|(index, effect)| {
            let id = if round == 0 {
                format!("card-{index}")
            } else {
                format!("card-round-{round}-{index}")
            };
            Card::new(id, effect)
        })
        .collect()
}
