use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bevy::prelude::*;

use crate::level::{Coord, Direction, Step, Turn};

/// Completion of a visual transition.
pub type ViewFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub fn ready<'a>() -> ViewFuture<'a> {
    Box::pin(std::future::ready(()))
}

/// Commands the simulation sends to the visual bound to one entity.
///
/// Transitions return a future that resolves when the animation settles.
/// Every method has a no-op default so a view only implements what it draws.
pub trait EntityView: Send + Sync {
    fn set_map_pos(&self, _at: Coord) {}
    fn set_look(&self, _look: Direction) {}
    fn set_visibility(&self, _visible: bool) {}

    fn move_forward(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn move_backward(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn strafe_left(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn strafe_right(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn rotate_left(&self, _at: Coord, _from_look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn rotate_right(&self, _at: Coord, _from_look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn attack(&self, _at: Coord, _look: Direction) -> ViewFuture<'_> {
        ready()
    }
    fn damage(&self) -> ViewFuture<'_> {
        ready()
    }
    fn death(&self) -> ViewFuture<'_> {
        ready()
    }
}

/// The first-person view: weapon and HUD on top of the entity commands.
pub trait PlayerView: EntityView {
    fn flash_muzzle(&self) {}
    fn recoil_gun(&self) {}
    fn indicate_damage(&self) {}
    fn update_hud_health(&self, _health: i32) {}
    fn update_hud_ammo(&self, _ammo: i32) {}
    fn show_hud_success_message(&self, _text: &str) {}
    fn show_hud_danger_message(&self, _text: &str) {}
}

pub(crate) fn animate_step<'a, V: EntityView + ?Sized>(
    view: &'a V,
    step: Step,
    from: Coord,
    look: Direction,
) -> ViewFuture<'a> {
    match step {
        Step::Forward => view.move_forward(from, look),
        Step::Backward => view.move_backward(from, look),
        Step::StrafeLeft => view.strafe_left(from, look),
        Step::StrafeRight => view.strafe_right(from, look),
    }
}

pub(crate) fn animate_turn<'a, V: EntityView + ?Sized>(
    view: &'a V,
    turn: Turn,
    at: Coord,
    from_look: Direction,
) -> ViewFuture<'a> {
    match turn {
        Turn::Left => view.rotate_left(at, from_look),
        Turn::Right => view.rotate_right(at, from_look),
    }
}

/// Headless view that logs each command and optionally waits a fixed time
/// per transition.
pub struct LogView {
    label: String,
    transition: Duration,
}

impl LogView {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            transition: Duration::ZERO,
        }
    }

    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    fn settle(&self, what: &str) -> ViewFuture<'_> {
        debug!("[Crawler view] {} {}", self.label, what);
        let wait = self.transition;
        Box::pin(async move {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        })
    }
}

impl EntityView for LogView {
    fn set_map_pos(&self, at: Coord) {
        debug!("[Crawler view] {} at ({}, {})", self.label, at.x, at.z);
    }

    fn set_look(&self, look: Direction) {
        debug!("[Crawler view] {} looks {:?}", self.label, look);
    }

    fn set_visibility(&self, visible: bool) {
        debug!("[Crawler view] {} visible={}", self.label, visible);
    }

    fn move_forward(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        self.settle("moves forward")
    }

    fn move_backward(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        self.settle("moves backward")
    }

    fn strafe_left(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        self.settle("strafes left")
    }

    fn strafe_right(&self, _from: Coord, _look: Direction) -> ViewFuture<'_> {
        self.settle("strafes right")
    }

    fn rotate_left(&self, _at: Coord, _from_look: Direction) -> ViewFuture<'_> {
        self.settle("turns left")
    }

    fn rotate_right(&self, _at: Coord, _from_look: Direction) -> ViewFuture<'_> {
        self.settle("turns right")
    }

    fn attack(&self, _at: Coord, _look: Direction) -> ViewFuture<'_> {
        self.settle("attacks")
    }

    fn damage(&self) -> ViewFuture<'_> {
        self.settle("takes damage")
    }

    fn death(&self) -> ViewFuture<'_> {
        self.settle("dies")
    }
}

impl PlayerView for LogView {
    fn update_hud_health(&self, health: i32) {
        debug!("[Crawler hud] health {}", health);
    }

    fn update_hud_ammo(&self, ammo: i32) {
        debug!("[Crawler hud] ammo {}", ammo);
    }

    fn show_hud_success_message(&self, text: &str) {
        info!("[Crawler hud] {}", text);
    }

    fn show_hud_danger_message(&self, text: &str) {
        warn!("[Crawler hud] {}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn log_view_waits_for_its_transition() {
        let view = LogView::new("sentry").with_transition(Duration::from_millis(200));
        let start = tokio::time::Instant::now();
        animate_step(&view, Step::Forward, Coord::new(0, 0), Direction::North).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn default_transitions_resolve_immediately() {
        struct Bare;
        impl EntityView for Bare {}
        animate_turn(&Bare, Turn::Left, Coord::new(1, 1), Direction::East).await;
        Bare.death().await;
    }
}
