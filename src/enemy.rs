use std::future::Future;
use std::sync::Arc;

use bevy::prelude::*;
use tokio::task::JoinSet;

use crate::audio::Cue;
use crate::game_state::GameState;
use crate::level::{Coord, Direction, Step, Turn};
use crate::raster::{first_hit, line, RayHit};
use crate::turn::TurnToken;
use crate::view::{animate_step, animate_turn};

/// Quarter turns that take `from` to `to`. An about-face always turns right
/// twice.
pub fn rotation_plan(from: Direction, to: Direction) -> &'static [Turn] {
    use Direction::*;
    const NONE: &[Turn] = &[];
    const LEFT: &[Turn] = &[Turn::Left];
    const RIGHT: &[Turn] = &[Turn::Right];
    const ABOUT: &[Turn] = &[Turn::Right, Turn::Right];
    match (from, to) {
        (North, North) | (South, South) | (West, West) | (East, East) => NONE,
        (North, South) | (South, North) | (West, East) | (East, West) => ABOUT,
        (North, West) | (South, East) | (West, South) | (East, North) => LEFT,
        (North, East) | (South, West) | (West, North) | (East, South) => RIGHT,
    }
}

/// Candidate closest to `target` by straight-line distance. Earlier
/// candidates win ties.
pub fn choose_step(
    candidates: impl IntoIterator<Item = (Direction, Coord)>,
    target: Coord,
) -> Option<(Direction, Coord)> {
    let mut best: Option<((Direction, Coord), f32)> = None;
    for candidate in candidates {
        let score = candidate.1.distance(target);
        if best.is_none_or(|(_, s)| score < s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// AI for one enemy slot.
pub struct EnemyBehavior {
    gs: Arc<GameState>,
    index: usize,
}

impl EnemyBehavior {
    pub fn new(gs: Arc<GameState>, index: usize) -> Self {
        Self { gs, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn turn_token(&self) -> Option<&TurnToken> {
        self.gs.enemy_turn(self.index)
    }

    /// Within sight range with nothing vision-blocking between the enemy
    /// and the player.
    pub fn can_see_player(&self) -> bool {
        let Some(enemy) = self.gs.enemy(self.index) else {
            return false;
        };
        let target = self.gs.player().position;
        if enemy.position.distance(target) > enemy.sight_range {
            return false;
        }
        let map = self.gs.map();
        let sight = first_hit(
            line(enemy.position, target).into_iter().skip(1),
            |cell| map.is_vision_blocker(cell),
            |cell| (cell == target).then_some(()),
        );
        matches!(sight, RayHit::Hit(..))
    }

    /// One AI decision: wait, pick the walkable neighbour closest to the
    /// player, face it, then attack the player there or step onto it.
    pub async fn think(&self) {
        let Some(token) = self.turn_token() else {
            return;
        };
        let Some(_busy) = token.try_acquire() else {
            return;
        };
        let gs = &self.gs;
        let Some(enemy) = gs.enemy(self.index) else {
            return;
        };
        if !enemy.enabled || enemy.view.is_none() || !gs.is_playing() {
            return;
        }

        tokio::time::sleep(gs.config().thinking_delay()).await;

        if gs.config().require_line_of_sight && !self.can_see_player() {
            return;
        }
        let Some(enemy) = gs.enemy(self.index).filter(|e| e.enabled) else {
            return;
        };
        let target = gs.player().position;
        let candidates = Direction::ALL
            .into_iter()
            .map(|dir| (dir, enemy.position.offset(dir.forward())))
            .filter(|(_, cell)| gs.is_tile_walkable_by_enemy(*cell));
        let Some((dir, next)) = choose_step(candidates, target) else {
            return;
        };

        for turn in rotation_plan(enemy.look, dir) {
            self.rotate(*turn).await;
        }
        if next == target {
            self.strike().await;
        } else {
            self.step(Step::Forward).await;
        }
    }

    /// Runs a direct command in the enemy's slot under the turn lock. Dropped
    /// while the enemy is already acting.
    async fn exclusive(&self, command: impl Future<Output = ()>) {
        let Some(token) = self.turn_token() else {
            return;
        };
        let Some(_busy) = token.try_acquire() else {
            return;
        };
        let _turn = self.gs.lock_turn().await;
        command.await;
    }

    pub async fn rotate_left(&self) {
        self.exclusive(self.rotate(Turn::Left)).await;
    }

    pub async fn rotate_right(&self) {
        self.exclusive(self.rotate(Turn::Right)).await;
    }

    pub async fn move_forward(&self) {
        self.exclusive(self.step(Step::Forward)).await;
    }

    pub async fn move_backward(&self) {
        self.exclusive(self.step(Step::Backward)).await;
    }

    pub async fn strafe_left(&self) {
        self.exclusive(self.step(Step::StrafeLeft)).await;
    }

    pub async fn strafe_right(&self) {
        self.exclusive(self.step(Step::StrafeRight)).await;
    }

    pub async fn attack(&self) {
        self.exclusive(self.strike()).await;
    }

    async fn rotate(&self, turn: Turn) {
        let gs = &self.gs;
        let Some(enemy) = gs.enemy(self.index).filter(|e| e.enabled) else {
            return;
        };
        gs.set_enemy_look(self.index, turn.apply(enemy.look));
        gs.cue(Cue::EnemyFootsteps(Cue::emitter(enemy.position)));
        if let Some(view) = enemy.view.as_deref() {
            animate_turn(view, turn, enemy.position, enemy.look).await;
        }
    }

    async fn step(&self, step: Step) {
        let gs = &self.gs;
        let Some(enemy) = gs.enemy(self.index).filter(|e| e.enabled) else {
            return;
        };
        let to = enemy.position.offset(step.offset(enemy.look));
        if !gs.try_move_enemy(self.index, to) {
            return;
        }
        gs.cue(Cue::EnemyFootsteps(Cue::emitter(to)));
        if let Some(view) = enemy.view.as_deref() {
            animate_step(view, step, enemy.position, enemy.look).await;
        }
    }

    async fn strike(&self) {
        let gs = &self.gs;
        let Some(enemy) = gs.enemy(self.index).filter(|e| e.enabled) else {
            return;
        };
        let animate = async {
            gs.cue(Cue::EnemyAttack(Cue::emitter(enemy.position)));
            if let Some(view) = enemy.view.as_deref() {
                view.attack(enemy.position, enemy.look).await;
            }
        };
        tokio::join!(gs.damage_player(enemy.attack_damage), animate);
    }
}

/// Runs one decision for every living enemy at once.
pub struct EnemyDispatcher {
    gs: Arc<GameState>,
    behaviors: Vec<Arc<EnemyBehavior>>,
    busy: TurnToken,
}

impl EnemyDispatcher {
    pub fn new(gs: Arc<GameState>) -> Self {
        let behaviors = (0..gs.enemy_count())
            .map(|index| Arc::new(EnemyBehavior::new(Arc::clone(&gs), index)))
            .collect();
        Self {
            gs,
            behaviors,
            busy: TurnToken::default(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Arc<EnemyBehavior>> {
        self.behaviors.get(index)
    }

    /// True while a world tick is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// A tick requested while one is running is dropped.
    pub async fn tick_all(&self) {
        let Some(_busy) = self.busy.try_acquire() else {
            return;
        };
        let _turn = self.gs.lock_turn().await;
        if !self.gs.is_playing() {
            return;
        }

        let mut ticks = JoinSet::new();
        for behavior in &self.behaviors {
            let enabled = self
                .gs
                .enemy(behavior.index())
                .is_some_and(|e| e.enabled);
            if enabled {
                let behavior = Arc::clone(behavior);
                ticks.spawn(async move { behavior.think().await });
            }
        }
        while let Some(result) = ticks.join_next().await {
            if let Err(e) = result {
                warn!("[Crawler ai] Enemy tick failed: {}", e);
            }
        }
    }
}
