use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Gameplay tuning. Every field has a default so partial JSON files work.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub max_health: i32,
    pub max_ammo: i32,
    pub player_health: i32,
    pub player_ammo: i32,
    pub player_attack_damage: i32,
    pub enemy_attack_damage: i32,
    /// Enemy starting health indexed by the level's `healthClass`.
    pub health_classes: Vec<i32>,
    pub health_pickup_value: i32,
    pub ammo_pickup_value: i32,
    pub attack_cooldown_ms: u64,
    pub thinking_delay_ms: u64,
    pub pickup_hide_delay_ms: u64,
    pub death_delay_ms: u64,
    pub exit_delay_ms: u64,
    pub ai_tick_interval_ms: u64,
    pub attack_ray_length: i32,
    /// Enemies only act on a tick when they can see the player.
    pub require_line_of_sight: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            max_ammo: 99,
            player_health: 100,
            player_ammo: 15,
            player_attack_damage: 1,
            enemy_attack_damage: 10,
            health_classes: vec![1, 3, 5],
            health_pickup_value: 25,
            ammo_pickup_value: 10,
            attack_cooldown_ms: 300,
            thinking_delay_ms: 300,
            pickup_hide_delay_ms: 150,
            death_delay_ms: 1500,
            exit_delay_ms: 1500,
            ai_tick_interval_ms: 1000,
            attack_ray_length: 32,
            require_line_of_sight: false,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: GameConfig =
            serde_json::from_str(json).map_err(|err| format!("Invalid config JSON: {err}"))?;
        if config.max_health <= 0 || config.max_ammo < 0 {
            return Err("max_health must be positive and max_ammo non-negative".to_string());
        }
        if config.health_classes.is_empty() {
            return Err("health_classes must list at least one entry".to_string());
        }
        Ok(config)
    }

    pub fn enemy_health(&self, class: usize) -> i32 {
        self.health_classes
            .get(class)
            .or_else(|| self.health_classes.last())
            .copied()
            .unwrap_or(1)
    }

    pub fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown_ms)
    }

    pub fn thinking_delay(&self) -> Duration {
        Duration::from_millis(self.thinking_delay_ms)
    }

    pub fn pickup_hide_delay(&self) -> Duration {
        Duration::from_millis(self.pickup_hide_delay_ms)
    }

    pub fn death_delay(&self) -> Duration {
        Duration::from_millis(self.death_delay_ms)
    }

    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.exit_delay_ms)
    }

    pub fn ai_tick_interval(&self) -> Duration {
        Duration::from_millis(self.ai_tick_interval_ms)
    }
}

/// Reads `CRAWLER_CONFIG` (or `crawler.json`), falling back to defaults.
pub fn load_config() -> GameConfig {
    let path = std::env::var("CRAWLER_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "crawler.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match GameConfig::from_json(&contents) {
            Ok(cfg) => {
                info!("[Crawler config] Loaded {}", path);
                cfg
            }
            Err(e) => {
                warn!("[Crawler config] Failed to parse {}: {}", path, e);
                GameConfig::default()
            }
        },
        Err(_) => GameConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{ "max_ammo": 5, "require_line_of_sight": true }"#)
            .unwrap();
        assert_eq!(cfg.max_ammo, 5);
        assert!(cfg.require_line_of_sight);
        assert_eq!(cfg.max_health, 100);
        assert_eq!(cfg.exit_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_empty_health_classes() {
        assert!(GameConfig::from_json(r#"{ "health_classes": [] }"#).is_err());
    }

    #[test]
    fn enemy_health_clamps_class_to_last_entry() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.enemy_health(0), 1);
        assert_eq!(cfg.enemy_health(2), 5);
        assert_eq!(cfg.enemy_health(9), 5);
    }
}
