pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::js_sys::Promise;

pub use ai::{AiProfile, FirstDecision, OpponentAi, SecondNote};
pub use game::{
    board_seed, boss_kind_for_seed, classify_pair, fallback_roster, generate_board, new_run,
    roster_from_json, BossKind, Card, Category, ClassId, Combo, Difficulty, EffectKind,
    EncounterState, EnemySpec, Entity, GameEvent, ItemId, LogEntry, LogKind, Outcome, Side,
    TurnEngine, TurnError, TurnPhase, TurnResolution, UserProgress, CATALOG, FLOORS_PER_RUN,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

pub const GAME_VERSION: &str = "2.0.0";

#[wasm_bindgen(js_name = "gameVersion")]
pub fn game_version() -> String {
    GAME_VERSION.to_string()
}

fn to_js_error(error: TurnError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// 宿主驱动节奏窗口用的下一个待定转移。
#[derive(Serialize)]
struct NextTransition {
    token: u32,
    delay_ms: u32,
}

/// 一局登塔。宿主只通过这里读写:快照出,单一"选牌"输入进,
/// 节奏窗口按 {token, delay} 领取、睡够再回调 advance。
#[wasm_bindgen]
pub struct TowerRun {
    state: EncounterState,
    engine: TurnEngine,
    progress: UserProgress,
}

#[wasm_bindgen]
impl TowerRun {
    /// 新开一局。`roster_json` 是提供方的名册(解析失败回退内置),
    /// `rng_seed` 固定随机流以便确定性重放。
    #[wasm_bindgen(constructor)]
    pub fn new(
        seed: String,
        class: Option<String>,
        roster_json: Option<String>,
        progress_json: Option<String>,
        difficulty_multiplier: Option<f64>,
        rng_seed: Option<u32>,
    ) -> Result<TowerRun, JsValue> {
        let multiplier = difficulty_multiplier.unwrap_or(1.0);
        let roster = roster_json
            .as_deref()
            .and_then(|json| roster_from_json(json, multiplier))
            .unwrap_or_else(|| {
                if roster_json.is_some() {
                    web_sys::console::warn_1(
                        &"Enemy provider payload rejected, using fallback roster.".into(),
                    );
                }
                fallback_roster(multiplier)
            });
        let class = class
            .as_deref()
            .and_then(|value| ClassId::from_str(value).ok());
        let progress = match progress_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => UserProgress::new(),
        };

        let mut state = new_run(seed, roster, class);
        let mut engine = match rng_seed {
            Some(seed) => TurnEngine::with_seed(seed as u64),
            None => TurnEngine::new(),
        };
        engine.begin(&mut state).map_err(to_js_error)?;

        Ok(TowerRun {
            state,
            engine,
            progress,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state).map_err(JsValue::from)
    }

    pub fn progress_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.progress).map_err(serde_to_js_error)
    }

    pub fn set_progress_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.progress = serde_json::from_str(json).map_err(serde_to_js_error)?;
        Ok(())
    }

    fn resolution(&self, events: Vec<GameEvent>) -> Result<String, JsValue> {
        serde_json::to_string(&TurnResolution::new(&self.state, events)).map_err(serde_to_js_error)
    }

    /// 呈现层唯一的对局输入:选中位置 P 的牌。
    pub fn select_card(&mut self, index: usize) -> Result<String, JsValue> {
        let events = self
            .engine
            .select_card(&mut self.state, index)
            .map_err(to_js_error)?;
        self.resolution(events)
    }

    pub fn use_item(&mut self, item: &str) -> Result<String, JsValue> {
        let item = ItemId::from_str(item)
            .map_err(|_| JsValue::from_str(&format!("unknown item: {item}")))?;
        let events = self
            .engine
            .use_item(&mut self.state, &mut self.progress, item)
            .map_err(to_js_error)?;
        self.resolution(events)
    }

    /// 队列里最早的待定转移,没有时返回 null。
    pub fn next_transition(&self) -> Result<JsValue, JsValue> {
        match self.state.pending.first() {
            Some(entry) => to_value(&NextTransition {
                token: entry.token,
                delay_ms: entry.delay_ms,
            })
            .map_err(JsValue::from),
            None => Ok(JsValue::NULL),
        }
    }

    /// 执行一个到期转移。过期令牌静默无事,返回的事件为空。
    pub fn advance(&mut self, token: u32) -> Result<String, JsValue> {
        let events = self
            .engine
            .advance(&mut self.state, &mut self.progress, token)
            .map_err(to_js_error)?;
        self.resolution(events)
    }

    /// 无头跑完当前所有待定转移(调试/模拟用,跳过节奏延迟)。
    pub fn fast_forward(&mut self) -> Result<String, JsValue> {
        let events = self.engine.fast_forward(&mut self.state, &mut self.progress);
        self.resolution(events)
    }

    pub fn advance_floor(&mut self) -> Result<String, JsValue> {
        let events = self
            .engine
            .advance_floor(&mut self.state, &mut self.progress)
            .map_err(to_js_error)?;
        self.resolution(events)
    }

    pub fn buy_item(&mut self, item: &str) -> Result<String, JsValue> {
        let item = ItemId::from_str(item)
            .map_err(|_| JsValue::from_str(&format!("unknown item: {item}")))?;
        let events = self
            .engine
            .buy_item(&mut self.state, &mut self.progress, item)
            .map_err(to_js_error)?;
        self.resolution(events)
    }

    pub fn leave_merchant(&mut self) -> Result<String, JsValue> {
        let events = self
            .engine
            .leave_merchant(&mut self.state)
            .map_err(to_js_error)?;
        self.resolution(events)
    }
}

/// 消耗品目录,商店界面用。
#[wasm_bindgen(js_name = "itemCatalogJson")]
pub fn item_catalog_json() -> Result<String, JsValue> {
    serde_json::to_string(&*CATALOG).map_err(serde_to_js_error)
}

/// 内置名册的 JSON,宿主可用作提供方超时的即时替补。
#[wasm_bindgen(js_name = "fallbackRosterJson")]
pub fn fallback_roster_json(difficulty_multiplier: Option<f64>) -> Result<String, JsValue> {
    let roster = fallback_roster(difficulty_multiplier.unwrap_or(1.0));
    serde_json::to_string(&roster).map_err(serde_to_js_error)
}

/// 调试辅助:直接查看某个种子生成的棋盘。
#[wasm_bindgen(js_name = "previewBoard")]
pub fn preview_board(seed: &str) -> Result<JsValue, JsValue> {
    to_value(&generate_board(seed, 0)).map_err(JsValue::from)
}

/// 等待一个节奏窗口。宿主睡够延迟后再回调 advance(token)。
#[wasm_bindgen(js_name = "sleepMs")]
pub fn sleep_ms(delay_ms: u32) -> Promise {
    future_to_promise(async move {
        if delay_ms > 0 {
            TimeoutFuture::new(delay_ms).await;
        }
        Ok(JsValue::UNDEFINED)
    })
}

/// 桥接提供方:等待宿主的名册 Promise(解析到 JSON 字符串),
/// 失败一律回退内置名册——提供方永远不会卡住回合逻辑。
#[wasm_bindgen(js_name = "resolveRoster")]
pub fn resolve_roster(provider: Promise, difficulty_multiplier: Option<f64>) -> Promise {
    let multiplier = difficulty_multiplier.unwrap_or(1.0);
    future_to_promise(async move {
        let provided = JsFuture::from(provider).await.ok().and_then(|value| {
            value
                .as_string()
                .and_then(|json| roster_from_json(&json, multiplier))
        });
        let roster = match provided {
            Some(roster) => roster,
            None => {
                web_sys::console::warn_1(&"Enemy provider failed, using fallback roster.".into());
                fallback_roster(multiplier)
            }
        };
        let json = serde_json::to_string(&roster).map_err(serde_to_js_error)?;
        Ok(JsValue::from_str(&json))
    })
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
