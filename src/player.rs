use std::sync::Arc;

use bevy::prelude::*;

use crate::audio::Cue;
use crate::game_state::GameState;
use crate::level::{Coord, PickupKind, Step, Turn};
use crate::raster::{cardinal_ray, first_hit};
use crate::view::{animate_step, animate_turn};

/// One discrete player action, as produced by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    RotateLeft,
    RotateRight,
    Attack,
}

impl PlayerCommand {
    /// W/S move, A/D strafe, Q/E turn, space fires.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "w" => Some(PlayerCommand::MoveForward),
            "s" => Some(PlayerCommand::MoveBackward),
            "a" => Some(PlayerCommand::StrafeLeft),
            "d" => Some(PlayerCommand::StrafeRight),
            "q" => Some(PlayerCommand::RotateLeft),
            "e" => Some(PlayerCommand::RotateRight),
            " " | "space" => Some(PlayerCommand::Attack),
            _ => None,
        }
    }

    pub fn from_key_code(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyW => Some(PlayerCommand::MoveForward),
            KeyCode::KeyS => Some(PlayerCommand::MoveBackward),
            KeyCode::KeyA => Some(PlayerCommand::StrafeLeft),
            KeyCode::KeyD => Some(PlayerCommand::StrafeRight),
            KeyCode::KeyQ => Some(PlayerCommand::RotateLeft),
            KeyCode::KeyE => Some(PlayerCommand::RotateRight),
            KeyCode::Space => Some(PlayerCommand::Attack),
            _ => None,
        }
    }
}

/// Turn handlers for the player.
///
/// Every command is dropped while another player command is in flight or
/// once the level has ended, and otherwise runs under the turn lock.
pub struct PlayerBehavior {
    gs: Arc<GameState>,
}

impl PlayerBehavior {
    pub fn new(gs: Arc<GameState>) -> Self {
        Self { gs }
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.gs
    }

    pub async fn execute(&self, command: PlayerCommand) {
        match command {
            PlayerCommand::MoveForward => self.move_forward().await,
            PlayerCommand::MoveBackward => self.move_backward().await,
            PlayerCommand::StrafeLeft => self.strafe_left().await,
            PlayerCommand::StrafeRight => self.strafe_right().await,
            PlayerCommand::RotateLeft => self.rotate_left().await,
            PlayerCommand::RotateRight => self.rotate_right().await,
            PlayerCommand::Attack => self.attack().await,
        }
    }

    pub async fn move_forward(&self) {
        self.step(Step::Forward).await;
    }

    pub async fn move_backward(&self) {
        self.step(Step::Backward).await;
    }

    pub async fn strafe_left(&self) {
        self.step(Step::StrafeLeft).await;
    }

    pub async fn strafe_right(&self) {
        self.step(Step::StrafeRight).await;
    }

    pub async fn rotate_left(&self) {
        self.turn(Turn::Left).await;
    }

    pub async fn rotate_right(&self) {
        self.turn(Turn::Right).await;
    }

    async fn step(&self, step: Step) {
        let gs = &self.gs;
        let Some(_busy) = gs.player_turn().try_acquire() else {
            return;
        };
        if !gs.is_playing() {
            return;
        }
        let _turn = gs.lock_turn().await;
        if !gs.is_playing() {
            return;
        }

        let player = gs.player();
        let from = player.position;
        let to = from.offset(step.offset(player.look));
        if !gs.is_tile_walkable_by_player(to) {
            return;
        }
        gs.set_player_position(to);

        let animate = async {
            gs.cue(Cue::PlayerFootsteps);
            if let Some(view) = player.view.as_deref() {
                animate_step(view, step, from, player.look).await;
            }
        };
        tokio::join!(self.consume_pickup_at(to), animate);

        if gs.map().is_goal(to) {
            gs.exit_level().await;
        }
    }

    async fn turn(&self, turn: Turn) {
        let gs = &self.gs;
        let Some(_busy) = gs.player_turn().try_acquire() else {
            return;
        };
        if !gs.is_playing() {
            return;
        }
        let _turn = gs.lock_turn().await;
        if !gs.is_playing() {
            return;
        }

        let player = gs.player();
        gs.set_player_look(turn.apply(player.look));
        gs.cue(Cue::PlayerFootsteps);
        if let Some(view) = player.view.as_deref() {
            animate_turn(view, turn, player.position, player.look).await;
        }
    }

    /// Fires along the facing direction and damages the first enemy in
    /// line, unless a vision blocker comes first.
    pub async fn attack(&self) {
        let gs = &self.gs;
        let Some(_busy) = gs.player_turn().try_acquire() else {
            return;
        };
        if !gs.is_playing() {
            return;
        }
        let _turn = gs.lock_turn().await;
        if !gs.is_playing() {
            return;
        }

        let player = gs.player();
        if player.is_attack_in_cooldown() {
            return;
        }
        if player.ammo <= 0 {
            gs.cue(Cue::GunEmpty);
            return;
        }
        if !gs.try_start_attack_cooldown() {
            return;
        }

        gs.add_player_ammo(-1);
        if let Some(view) = player.view.as_deref() {
            view.flash_muzzle();
        }
        gs.cue(Cue::GunShot);
        if let Some(view) = player.view.as_deref() {
            view.recoil_gun();
        }

        let ray = cardinal_ray(player.position, player.look, gs.config().attack_ray_length);
        let target = first_hit(
            ray,
            |cell| gs.map().is_vision_blocker(cell),
            |cell| gs.enemy_at(cell),
        )
        .target();
        let Some(index) = target else {
            return;
        };
        debug!("[Crawler player] Shot hits enemy {}", index);
        // hit and death animations run on without holding up the next command
        if let Some(hit) = gs.hit_enemy(index, player.attack_damage) {
            tokio::spawn(hit.play());
        }
    }

    /// Applies the pickup lying on `at`, if any. Each pickup is applied at
    /// most once.
    pub async fn consume_pickup_at(&self, at: Coord) {
        let gs = &self.gs;
        let Some(pickup) = gs.take_pickup_at(at) else {
            return;
        };
        let config = gs.config();
        match pickup.kind {
            PickupKind::Health => {
                gs.heal_player(config.health_pickup_value);
                gs.cue(Cue::HealthPickup);
            }
            PickupKind::Ammo => {
                gs.add_player_ammo(config.ammo_pickup_value);
                gs.cue(Cue::AmmoPickup);
            }
            PickupKind::Key => {
                gs.acquire_keycard();
                gs.cue(Cue::KeycardPickup);
            }
        }

        tokio::time::sleep(config.pickup_hide_delay()).await;
        if let Some(view) = pickup.view {
            view.set_visibility(false);
        }
    }
}
