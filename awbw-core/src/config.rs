use serde::{Deserialize, Serialize};

/// Replay engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Force fog on or off regardless of the replay's setting.
    pub fog_override: Option<bool>,
    /// Vision lost by every unit while it rains.
    pub rain_vision_penalty: i32,
    /// Join refunds and repair charges are `display_hp * cost / divisor`.
    pub hp_cost_divisor: i64,
    /// Whether explosions may destroy units. Off = damage stops at 0.1 HP.
    pub explosions_can_kill: bool,
    /// Seconds per playback step (one path tile, one attack flash).
    pub step_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fog_override: None,
            rain_vision_penalty: 1,
            hp_cost_divisor: 10,
            explosions_can_kill: true,
            step_seconds: 0.1,
        }
    }
}

impl EngineConfig {
    pub fn fog_enabled(&self, replay_fog: bool) -> bool {
        self.fog_override.unwrap_or(replay_fog)
    }
}

/// Capture-chain planner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Turns a factory may wait for a reachable property before it is retired.
    pub lookahead_turns: u32,
    /// Income horizon in days.
    pub turn_limit: u32,
    /// Turns a full-health capturer needs to take a property.
    pub capture_turns: u32,
    pub capturer_unit: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            lookahead_turns: 3,
            turn_limit: 13,
            capture_turns: 2,
            capturer_unit: "Infantry".to_string(),
        }
    }
}
