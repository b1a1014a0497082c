//! 对手 AI 模块:不完美记忆与难度调校。

pub mod opponent;

pub use opponent::{AiProfile, FirstDecision, OpponentAi, SecondNote};
