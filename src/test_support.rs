use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{Cue, CueSink};
use crate::config::GameConfig;
use crate::game_state::GameState;
use crate::level::{Coord, Direction, LevelDocument};
use crate::view::{EntityView, PlayerView, ViewFuture};

/// Records every command it receives; transitions take `transition` of
/// (tokio) time.
#[derive(Default)]
pub struct RecordingView {
    calls: Mutex<Vec<String>>,
    transition: Duration,
}

impl RecordingView {
    pub fn with_transition(transition: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            transition,
        }
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn settle(&self, call: String) -> ViewFuture<'_> {
        self.log(call);
        let wait = self.transition;
        Box::pin(async move {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl EntityView for RecordingView {
    fn set_map_pos(&self, at: Coord) {
        self.log(format!("set_map_pos {},{}", at.x, at.z));
    }

    fn set_look(&self, look: Direction) {
        self.log(format!("set_look {look:?}"));
    }

    fn set_visibility(&self, visible: bool) {
        self.log(format!("set_visibility {visible}"));
    }

    fn move_forward(&self, from: Coord, look: Direction) -> ViewFuture<'_> {
        self.settle(format!("move_forward {},{} {look:?}", from.x, from.z))
    }

    fn move_backward(&self, from: Coord, look: Direction) -> ViewFuture<'_> {
        self.settle(format!("move_backward {},{} {look:?}", from.x, from.z))
    }

    fn strafe_left(&self, from: Coord, look: Direction) -> ViewFuture<'_> {
        self.settle(format!("strafe_left {},{} {look:?}", from.x, from.z))
    }

    fn strafe_right(&self, from: Coord, look: Direction) -> ViewFuture<'_> {
        self.settle(format!("strafe_right {},{} {look:?}", from.x, from.z))
    }

    fn rotate_left(&self, at: Coord, from_look: Direction) -> ViewFuture<'_> {
        self.settle(format!("rotate_left {},{} {from_look:?}", at.x, at.z))
    }

    fn rotate_right(&self, at: Coord, from_look: Direction) -> ViewFuture<'_> {
        self.settle(format!("rotate_right {},{} {from_look:?}", at.x, at.z))
    }

    fn attack(&self, at: Coord, look: Direction) -> ViewFuture<'_> {
        self.settle(format!("attack {},{} {look:?}", at.x, at.z))
    }

    fn damage(&self) -> ViewFuture<'_> {
        self.settle("damage".to_string())
    }

    fn death(&self) -> ViewFuture<'_> {
        self.settle("death".to_string())
    }
}

impl PlayerView for RecordingView {
    fn flash_muzzle(&self) {
        self.log("flash_muzzle".to_string());
    }

    fn recoil_gun(&self) {
        self.log("recoil_gun".to_string());
    }

    fn indicate_damage(&self) {
        self.log("indicate_damage".to_string());
    }

    fn update_hud_health(&self, health: i32) {
        self.log(format!("hud_health {health}"));
    }

    fn update_hud_ammo(&self, ammo: i32) {
        self.log(format!("hud_ammo {ammo}"));
    }

    fn show_hud_success_message(&self, text: &str) {
        self.log(format!("success {text}"));
    }

    fn show_hud_danger_message(&self, text: &str) {
        self.log(format!("danger {text}"));
    }
}

#[derive(Default)]
pub struct RecordingCues {
    cues: Mutex<Vec<Cue>>,
}

impl RecordingCues {
    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.cues().iter().map(Cue::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }
}

impl CueSink for RecordingCues {
    fn play(&self, cue: Cue) {
        self.cues.lock().unwrap().push(cue);
    }
}

pub fn game_with_level(
    level: &LevelDocument,
    config: GameConfig,
) -> (Arc<GameState>, Arc<RecordingCues>) {
    let cues = Arc::new(RecordingCues::default());
    let gs = GameState::new(level, config, cues.clone());
    (Arc::new(gs), cues)
}

pub fn game_with(config: GameConfig) -> (Arc<GameState>, Arc<RecordingCues>) {
    game_with_level(&LevelDocument::test_level(), config)
}

pub fn game() -> (Arc<GameState>, Arc<RecordingCues>) {
    game_with(GameConfig::default())
}
