use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::level::Coord;

const MAX_AUDIO_EVENTS: usize = 256;

fn default_volume() -> f32 {
    1.0
}

/// Sound requests raised by gameplay. Enemy cues carry the emitter position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cue {
    AccessDenied,
    AccessGranted,
    AmmoPickup,
    GunEmpty,
    GunShot,
    HealthPickup,
    KeycardPickup,
    PlayerDamaged,
    PlayerDeath,
    PlayerFootsteps,
    EnemyAttack(Vec3),
    EnemyDamaged(Vec3),
    EnemyDeath(Vec3),
    EnemyFootsteps(Vec3),
}

impl Cue {
    pub fn name(&self) -> &'static str {
        match self {
            Cue::AccessDenied => "accessDenied",
            Cue::AccessGranted => "accessGranted",
            Cue::AmmoPickup => "ammoPickup",
            Cue::GunEmpty => "gunEmpty",
            Cue::GunShot => "gunShot",
            Cue::HealthPickup => "healthPickup",
            Cue::KeycardPickup => "keycardPickup",
            Cue::PlayerDamaged => "playerDamaged",
            Cue::PlayerDeath => "playerDeath",
            Cue::PlayerFootsteps => "playerFootsteps",
            Cue::EnemyAttack(_) => "enemyAttack",
            Cue::EnemyDamaged(_) => "enemyDamaged",
            Cue::EnemyDeath(_) => "enemyDeath",
            Cue::EnemyFootsteps(_) => "enemyFootsteps",
        }
    }

    pub fn position(&self) -> Option<Vec3> {
        match self {
            Cue::EnemyAttack(p) | Cue::EnemyDamaged(p) | Cue::EnemyDeath(p) | Cue::EnemyFootsteps(p) => {
                Some(*p)
            }
            _ => None,
        }
    }

    /// Emitter position for a cue raised by something standing on `coord`.
    pub fn emitter(coord: Coord) -> Vec3 {
        coord.world_center() + Vec3::Y * 0.5
    }
}

/// Receives cues from the simulation. Playback lives behind this seam.
pub trait CueSink: Send + Sync {
    fn play(&self, cue: Cue);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SfxDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AudioEventLog {
    pub name: String,
    pub path: String,
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
}

/// Resolves cues against an sfx library and keeps a bounded log of what
/// was requested.
pub struct AudioManager {
    sfx: HashMap<String, SfxDefinition>,
    master_volume: f32,
    recent_events: Mutex<VecDeque<AudioEventLog>>,
}

impl Default for AudioManager {
    fn default() -> Self {
        let names = [
            "accessDenied",
            "accessGranted",
            "ammoPickup",
            "gunEmpty",
            "gunShot",
            "healthPickup",
            "keycardPickup",
            "playerDamaged",
            "playerDeath",
            "playerFootsteps",
            "enemyAttack",
            "enemyDamaged",
            "enemyDeath",
            "enemyFootsteps",
        ];
        let sfx = names
            .iter()
            .map(|name| {
                let def = SfxDefinition {
                    path: format!("audio/sfx/{}.mp3", kebab_case(name)),
                    volume: 1.0,
                };
                (name.to_string(), def)
            })
            .collect();
        Self::with_library(sfx)
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl AudioManager {
    pub fn with_library(sfx: HashMap<String, SfxDefinition>) -> Self {
        Self {
            sfx,
            master_volume: 1.0,
            recent_events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn set_master_volume(&mut self, value: f32) {
        self.master_volume = value.clamp(0.0, 2.0);
    }

    pub fn play_sfx(&self, cue: Cue) -> Result<(), String> {
        let name = cue.name();
        let Some(def) = self.sfx.get(name) else {
            return Err(format!("Unknown sfx: {name}"));
        };
        let event = AudioEventLog {
            name: name.to_string(),
            path: def.path.clone(),
            volume: def.volume * self.master_volume,
            position: cue.position().map(|p| p.to_array()),
        };
        let mut recent = self
            .recent_events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        recent.push_back(event);
        while recent.len() > MAX_AUDIO_EVENTS {
            recent.pop_front();
        }
        Ok(())
    }

    pub fn recent_events(&self) -> Vec<AudioEventLog> {
        self.recent_events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl CueSink for AudioManager {
    fn play(&self, cue: Cue) {
        if let Err(e) = self.play_sfx(cue) {
            warn!("[Crawler audio] {e}");
        }
    }
}
