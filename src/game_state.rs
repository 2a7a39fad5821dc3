use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use bevy::prelude::*;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::audio::{Cue, CueSink};
use crate::config::GameConfig;
use crate::events::{LifecycleBus, LifecycleEvent};
use crate::level::{Coord, Direction, LevelDocument, PickupKind};
use crate::map_query::MapQuery;
use crate::turn::TurnToken;
use crate::view::{EntityView, PlayerView};

pub const ACCESS_REQUIRED_MESSAGE: &str = "Access Card Required";
pub const ACCESS_ACQUIRED_MESSAGE: &str = "Access Card Acquired";

#[derive(Clone)]
pub struct PlayerState {
    pub view: Option<Arc<dyn PlayerView>>,
    pub position: Coord,
    pub look: Direction,
    pub health: i32,
    pub ammo: i32,
    pub attack_damage: i32,
    /// Earliest instant the next shot may fire.
    pub attack_ready_at: Option<Instant>,
    pub has_key: bool,
}

impl PlayerState {
    pub fn is_attack_in_cooldown(&self) -> bool {
        self.attack_ready_at
            .is_some_and(|ready| Instant::now() < ready)
    }
}

#[derive(Clone)]
pub struct EnemyState {
    pub index: usize,
    pub view: Option<Arc<dyn EntityView>>,
    pub kind: String,
    pub position: Coord,
    pub look: Direction,
    pub health: i32,
    pub attack_damage: i32,
    pub sight_range: f32,
    pub enabled: bool,
}

#[derive(Clone)]
pub struct PickupState {
    pub index: usize,
    pub view: Option<Arc<dyn EntityView>>,
    pub kind: PickupKind,
    pub position: Coord,
    pub enabled: bool,
}

pub struct World {
    pub player: PlayerState,
    pub enemies: Vec<EnemyState>,
    pub pickups: Vec<PickupState>,
    pub is_game_over: bool,
    pub has_exited_level: bool,
    exit_pending: bool,
}

fn read(world: &RwLock<World>) -> RwLockReadGuard<'_, World> {
    world.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(world: &RwLock<World>) -> RwLockWriteGuard<'_, World> {
    world.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Player,
    Enemy(usize),
    Pickup(usize),
}

/// Detaches a view from its entity slot.
pub struct ViewRegistration {
    world: Weak<RwLock<World>>,
    slot: Slot,
}

impl ViewRegistration {
    pub fn unregister(self) {
        let Some(world) = self.world.upgrade() else {
            return;
        };
        let mut w = write(&world);
        match self.slot {
            Slot::Player => w.player.view = None,
            Slot::Enemy(i) => {
                if let Some(e) = w.enemies.get_mut(i) {
                    e.view = None;
                }
            }
            Slot::Pickup(i) => {
                if let Some(p) = w.pickups.get_mut(i) {
                    p.view = None;
                }
            }
        }
    }
}

/// Animation half of an enemy hit.
pub struct EnemyHit {
    index: usize,
    view: Option<Arc<dyn EntityView>>,
    position: Coord,
    died: bool,
    cues: Arc<dyn CueSink>,
}

impl EnemyHit {
    pub fn died(&self) -> bool {
        self.died
    }

    pub async fn play(self) {
        if let Some(view) = self.view.as_ref() {
            view.damage().await;
        }
        if !self.died {
            return;
        }
        info!("[Crawler state] Enemy {} destroyed", self.index);
        self.cues.play(Cue::EnemyDeath(Cue::emitter(self.position)));
        if let Some(view) = self.view {
            view.death().await;
            view.set_visibility(false);
        }
    }
}

/// Runtime facts for one level attempt.
///
/// Short critical sections go through the world lock and are never held
/// across an await. A whole player command or AI tick holds the turn lock,
/// so the two never interleave.
pub struct GameState {
    map: Arc<MapQuery>,
    config: GameConfig,
    world: Arc<RwLock<World>>,
    player_turn: TurnToken,
    enemy_turns: Vec<TurnToken>,
    turn: Mutex<()>,
    cues: Arc<dyn CueSink>,
    events: LifecycleBus,
}

impl GameState {
    pub fn new(level: &LevelDocument, config: GameConfig, cues: Arc<dyn CueSink>) -> Self {
        Self::with_map(Arc::new(MapQuery::new(&level.map)), level, config, cues)
    }

    pub fn with_map(
        map: Arc<MapQuery>,
        level: &LevelDocument,
        config: GameConfig,
        cues: Arc<dyn CueSink>,
    ) -> Self {
        let start = level.map.logic.start;
        let entities = &level.map.logic.entities;
        let player = PlayerState {
            view: None,
            position: start.coord(),
            look: start.look,
            health: config.player_health.clamp(0, config.max_health),
            ammo: config.player_ammo.clamp(0, config.max_ammo),
            attack_damage: config.player_attack_damage,
            attack_ready_at: None,
            has_key: false,
        };
        let enemies: Vec<EnemyState> = entities
            .enemies
            .iter()
            .enumerate()
            .map(|(index, e)| EnemyState {
                index,
                view: None,
                kind: e.kind.clone(),
                position: e.position,
                look: e.look,
                health: config.enemy_health(e.health_class),
                attack_damage: config.enemy_attack_damage,
                sight_range: e.sight_range,
                enabled: true,
            })
            .collect();
        let pickups = entities
            .pickups
            .iter()
            .enumerate()
            .map(|(index, p)| PickupState {
                index,
                view: None,
                kind: p.kind,
                position: p.position,
                enabled: true,
            })
            .collect();
        let enemy_turns = enemies.iter().map(|_| TurnToken::default()).collect();

        info!(
            "[Crawler state] Level ready: {} enemies, {} pickups",
            enemies.len(),
            entities.pickups.len()
        );

        Self {
            map,
            config,
            world: Arc::new(RwLock::new(World {
                player,
                enemies,
                pickups,
                is_game_over: false,
                has_exited_level: false,
                exit_pending: false,
            })),
            player_turn: TurnToken::default(),
            enemy_turns,
            turn: Mutex::new(()),
            cues,
            events: LifecycleBus::default(),
        }
    }

    pub fn map(&self) -> &MapQuery {
        &self.map
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn events(&self) -> &LifecycleBus {
        &self.events
    }

    pub(crate) fn cue(&self, cue: Cue) {
        self.cues.play(cue);
    }

    pub(crate) fn player_turn(&self) -> &TurnToken {
        &self.player_turn
    }

    pub(crate) fn enemy_turn(&self, index: usize) -> Option<&TurnToken> {
        self.enemy_turns.get(index)
    }

    pub(crate) async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    pub fn is_player_busy(&self) -> bool {
        self.player_turn.is_busy()
    }

    pub(crate) fn read_world(&self) -> RwLockReadGuard<'_, World> {
        read(&self.world)
    }

    pub(crate) fn write_world(&self) -> RwLockWriteGuard<'_, World> {
        write(&self.world)
    }

    pub fn player(&self) -> PlayerState {
        self.read_world().player.clone()
    }

    pub fn enemy(&self, index: usize) -> Option<EnemyState> {
        self.read_world().enemies.get(index).cloned()
    }

    pub fn pickup(&self, index: usize) -> Option<PickupState> {
        self.read_world().pickups.get(index).cloned()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemy_turns.len()
    }

    pub fn is_game_over(&self) -> bool {
        self.read_world().is_game_over
    }

    pub fn has_exited_level(&self) -> bool {
        self.read_world().has_exited_level
    }

    /// Neither dead nor out of the level.
    pub fn is_playing(&self) -> bool {
        let w = self.read_world();
        !w.is_game_over && !w.has_exited_level
    }

    // === View registration ===

    pub fn register_player(&self, view: Arc<dyn PlayerView>) -> ViewRegistration {
        let player = {
            let mut w = self.write_world();
            w.player.view = Some(Arc::clone(&view));
            w.player.clone()
        };
        view.set_map_pos(player.position);
        view.set_look(player.look);
        view.update_hud_health(player.health);
        view.update_hud_ammo(player.ammo);
        self.registration(Slot::Player)
    }

    pub fn register_enemy(
        &self,
        index: usize,
        view: Arc<dyn EntityView>,
    ) -> Option<ViewRegistration> {
        let enemy = {
            let mut w = self.write_world();
            let enemy = w.enemies.get_mut(index)?;
            enemy.view = Some(Arc::clone(&view));
            enemy.clone()
        };
        view.set_map_pos(enemy.position);
        view.set_look(enemy.look);
        if !enemy.enabled {
            view.set_visibility(false);
        }
        Some(self.registration(Slot::Enemy(index)))
    }

    pub fn register_pickup(
        &self,
        index: usize,
        view: Arc<dyn EntityView>,
    ) -> Option<ViewRegistration> {
        let pickup = {
            let mut w = self.write_world();
            let pickup = w.pickups.get_mut(index)?;
            pickup.view = Some(Arc::clone(&view));
            pickup.clone()
        };
        view.set_map_pos(pickup.position);
        if !pickup.enabled {
            view.set_visibility(false);
        }
        Some(self.registration(Slot::Pickup(index)))
    }

    fn registration(&self, slot: Slot) -> ViewRegistration {
        ViewRegistration {
            world: Arc::downgrade(&self.world),
            slot,
        }
    }

    pub fn has_player_at(&self, at: Coord) -> bool {
        self.read_world().player.position == at
    }

    pub fn has_enemy_at(&self, at: Coord) -> bool {
        self.enemy_at(at).is_some()
    }

    /// Index of the living enemy standing on `at`.
    pub fn enemy_at(&self, at: Coord) -> Option<usize> {
        self.read_world()
            .enemies
            .iter()
            .find(|e| e.enabled && e.position == at)
            .map(|e| e.index)
    }

    /// Index of the enabled pickup lying on `at`.
    pub fn pickup_at(&self, at: Coord) -> Option<usize> {
        self.read_world()
            .pickups
            .iter()
            .find(|p| p.enabled && p.position == at)
            .map(|p| p.index)
    }

    pub fn is_tile_walkable_by_player(&self, at: Coord) -> bool {
        self.map.is_walkable(at) && !self.has_enemy_at(at)
    }

    /// Same rule as the player. The player's own tile stays walkable; an
    /// enemy stepping there attacks instead of moving.
    pub fn is_tile_walkable_by_enemy(&self, at: Coord) -> bool {
        self.map.is_walkable(at) && !self.has_enemy_at(at)
    }

    // === Player stats ===

    fn refresh_hud(&self) {
        let (view, health, ammo) = {
            let w = self.read_world();
            (w.player.view.clone(), w.player.health, w.player.ammo)
        };
        if let Some(view) = view {
            view.update_hud_health(health);
            view.update_hud_ammo(ammo);
        }
    }

    pub fn heal_player(&self, amount: i32) {
        {
            let mut w = self.write_world();
            let p = &mut w.player;
            p.health = p.health.saturating_add(amount).clamp(0, self.config.max_health);
        }
        self.refresh_hud();
    }

    /// Adds (or with a negative amount, spends) ammunition.
    pub fn add_player_ammo(&self, amount: i32) {
        {
            let mut w = self.write_world();
            let p = &mut w.player;
            p.ammo = p.ammo.saturating_add(amount).clamp(0, self.config.max_ammo);
        }
        self.refresh_hud();
    }

    /// Ignored once the player is dead. A hit that crosses zero plays the
    /// death cue, waits out the death delay and ends the game.
    pub async fn damage_player(&self, amount: i32) {
        let (view, remaining) = {
            let mut w = self.write_world();
            let p = &mut w.player;
            if p.health <= 0 {
                return;
            }
            let remaining = p.health.saturating_sub(amount);
            p.health = remaining.clamp(0, self.config.max_health);
            (p.view.clone(), remaining)
        };
        self.refresh_hud();

        if remaining <= 0 {
            info!("[Crawler state] Player died");
            self.cue(Cue::PlayerDeath);
            tokio::time::sleep(self.config.death_delay()).await;
            self.game_over();
            return;
        }

        self.cue(Cue::PlayerDamaged);
        if let Some(view) = view {
            view.indicate_damage();
        }
    }

    /// A killing blow removes the enemy from play before its death
    /// animation starts.
    pub async fn damage_enemy(&self, index: usize, amount: i32) {
        if let Some(hit) = self.hit_enemy(index, amount) {
            hit.play().await;
        }
    }

    /// Applies damage to a living enemy and raises the damage cue. The
    /// returned hit plays the animations and can outlive the caller's turn.
    pub fn hit_enemy(&self, index: usize, amount: i32) -> Option<EnemyHit> {
        let (view, position, died) = {
            let mut w = self.write_world();
            let enemy = w.enemies.get_mut(index)?;
            if !enemy.enabled {
                return None;
            }
            enemy.health = enemy
                .health
                .saturating_sub(amount)
                .clamp(0, self.config.max_health);
            let died = enemy.health <= 0;
            if died {
                enemy.enabled = false;
            }
            (enemy.view.clone(), enemy.position, died)
        };
        self.cue(Cue::EnemyDamaged(Cue::emitter(position)));
        Some(EnemyHit {
            index,
            view,
            position,
            died,
            cues: Arc::clone(&self.cues),
        })
    }

    // === Lifecycle ===

    pub fn game_over(&self) {
        {
            let mut w = self.write_world();
            if w.is_game_over {
                return;
            }
            w.is_game_over = true;
        }
        self.events.emit(LifecycleEvent::GameOver);
    }

    pub fn acquire_keycard(&self) {
        let view = {
            let mut w = self.write_world();
            w.player.has_key = true;
            w.player.view.clone()
        };
        self.events.emit(LifecycleEvent::KeycardAcquired);
        if let Some(view) = view {
            view.show_hud_success_message(ACCESS_ACQUIRED_MESSAGE);
        }
    }

    /// Without the keycard this only shows the rejection. With it, the first
    /// call plays the acknowledgement, waits and marks the level exited;
    /// repeated calls do nothing.
    pub async fn exit_level(&self) {
        enum Gate {
            Done,
            Denied(Option<Arc<dyn PlayerView>>),
            Granted,
        }
        let gate = {
            let mut w = self.write_world();
            if w.has_exited_level || w.exit_pending {
                Gate::Done
            } else if !w.player.has_key {
                Gate::Denied(w.player.view.clone())
            } else {
                w.exit_pending = true;
                Gate::Granted
            }
        };

        match gate {
            Gate::Done => {}
            Gate::Denied(view) => {
                if let Some(view) = view {
                    view.show_hud_danger_message(ACCESS_REQUIRED_MESSAGE);
                }
                self.cue(Cue::AccessDenied);
            }
            Gate::Granted => {
                self.cue(Cue::AccessGranted);
                tokio::time::sleep(self.config.exit_delay()).await;
                self.write_world().has_exited_level = true;
                info!("[Crawler state] Level exited");
                self.events.emit(LifecycleEvent::ExitedLevel);
            }
        }
    }

    // === Behaviour mutations ===

    /// Authoritative position only; the view catches up through its
    /// transition.
    pub(crate) fn set_player_position(&self, at: Coord) {
        self.write_world().player.position = at;
    }

    pub(crate) fn set_player_look(&self, look: Direction) {
        self.write_world().player.look = look;
    }

    /// Disables the enabled pickup on `at` and hands it to the caller. Only
    /// one caller ever receives a given pickup.
    pub(crate) fn take_pickup_at(&self, at: Coord) -> Option<PickupState> {
        let mut w = self.write_world();
        let pickup = w.pickups.iter_mut().find(|p| p.enabled && p.position == at)?;
        pickup.enabled = false;
        Some(pickup.clone())
    }

    /// Starts the attack cooldown unless it is already running.
    pub(crate) fn try_start_attack_cooldown(&self) -> bool {
        let mut w = self.write_world();
        if w.player.is_attack_in_cooldown() {
            return false;
        }
        w.player.attack_ready_at = Some(Instant::now() + self.config.attack_cooldown());
        true
    }

    /// Moves a living enemy onto `at` if the map allows it and no other
    /// actor stands there. Check and write happen under one world lock.
    pub(crate) fn try_move_enemy(&self, index: usize, at: Coord) -> bool {
        if !self.map.is_walkable(at) {
            return false;
        }
        let mut w = self.write_world();
        if w.player.position == at
            || w.enemies
                .iter()
                .any(|e| e.enabled && e.index != index && e.position == at)
        {
            return false;
        }
        match w.enemies.get_mut(index) {
            Some(enemy) if enemy.enabled => {
                enemy.position = at;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_enemy_look(&self, index: usize, look: Direction) {
        if let Some(e) = self.write_world().enemies.get_mut(index) {
            e.look = look;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{game, game_with, RecordingView};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn initial_state_comes_from_level_and_config() {
        let (gs, _) = game();
        let p = gs.player();
        assert_eq!(p.position, Coord::new(1, 1));
        assert_eq!(p.look, Direction::East);
        assert_eq!((p.health, p.ammo, p.attack_damage), (100, 15, 1));
        assert!(!p.has_key);
        let e = gs.enemy(0).unwrap();
        assert_eq!((e.health, e.attack_damage), (1, 10));
        assert!(e.enabled);
        assert_eq!(gs.enemy_count(), 1);
    }

    #[test]
    fn registration_pushes_state_and_unregisters() {
        let (gs, _) = game();
        let view = Arc::new(RecordingView::default());
        let reg = gs.register_player(view.clone());
        assert_eq!(
            view.calls(),
            vec!["set_map_pos 1,1", "set_look East", "hud_health 100", "hud_ammo 15"]
        );
        assert!(gs.player().view.is_some());
        reg.unregister();
        assert!(gs.player().view.is_none());

        let enemy_view = Arc::new(RecordingView::default());
        let reg = gs.register_enemy(0, enemy_view.clone()).unwrap();
        assert_eq!(enemy_view.calls(), vec!["set_map_pos 4,2", "set_look West"]);
        reg.unregister();
        assert!(gs.enemy(0).unwrap().view.is_none());
        assert!(gs.register_enemy(9, enemy_view).is_none());
    }

    #[test]
    fn occupancy_ignores_disabled_entities() {
        let (gs, _) = game();
        assert!(gs.has_player_at(Coord::new(1, 1)));
        assert!(gs.has_enemy_at(Coord::new(4, 2)));
        assert_eq!(gs.pickup_at(Coord::new(2, 1)), Some(0));
        gs.write_world().enemies[0].enabled = false;
        assert!(!gs.has_enemy_at(Coord::new(4, 2)));
        assert!(gs.take_pickup_at(Coord::new(2, 1)).is_some());
        assert_eq!(gs.pickup_at(Coord::new(2, 1)), None);
    }

    #[test]
    fn walkability_excludes_enemies_but_not_player() {
        let (gs, _) = game();
        assert!(!gs.is_tile_walkable_by_player(Coord::new(4, 2)));
        assert!(!gs.is_tile_walkable_by_enemy(Coord::new(4, 2)));
        assert!(gs.is_tile_walkable_by_enemy(Coord::new(1, 1)));
        assert!(!gs.is_tile_walkable_by_player(Coord::new(3, 3)));
        assert!(!gs.is_tile_walkable_by_player(Coord::new(0, 0)));
    }

    #[test]
    fn enemy_move_rejects_occupied_and_blocked_tiles() {
        let (gs, _) = game();
        // wall, prop and player tiles are refused
        assert!(!gs.try_move_enemy(0, Coord::new(2, 2)));
        assert!(!gs.try_move_enemy(0, Coord::new(3, 3)));
        assert!(!gs.try_move_enemy(0, Coord::new(1, 1)));
        assert_eq!(gs.enemy(0).unwrap().position, Coord::new(4, 2));

        assert!(gs.try_move_enemy(0, Coord::new(3, 2)));
        assert_eq!(gs.enemy(0).unwrap().position, Coord::new(3, 2));

        gs.write_world().enemies[0].enabled = false;
        assert!(!gs.try_move_enemy(0, Coord::new(4, 2)));
    }

    #[test]
    fn heal_and_ammo_clamp() {
        let (gs, _) = game();
        gs.heal_player(500);
        assert_eq!(gs.player().health, 100);
        gs.add_player_ammo(1000);
        assert_eq!(gs.player().ammo, gs.config().max_ammo);
        gs.add_player_ammo(-1000);
        assert_eq!(gs.player().ammo, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn damage_clamps_and_fires_game_over_once() {
        let (gs, cues) = game();
        let view = Arc::new(RecordingView::default());
        gs.register_player(view.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        gs.events().subscribe(LifecycleEvent::GameOver, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        gs.damage_player(30).await;
        assert_eq!(gs.player().health, 70);
        assert_eq!(view.count("indicate_damage"), 1);
        assert!(!gs.is_game_over());

        gs.damage_player(500).await;
        assert_eq!(gs.player().health, 0);
        assert!(gs.is_game_over());
        for _ in 0..3 {
            gs.damage_player(10).await;
        }
        gs.game_over();
        assert_eq!(gs.player().health, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(cues.count("playerDeath"), 1);
        assert_eq!(cues.count("playerDamaged"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn death_waits_out_the_delay() {
        let (gs, _) = game();
        let start = Instant::now();
        gs.damage_player(100).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(gs.is_game_over());
    }

    #[tokio::test(start_paused = true)]
    async fn killing_enemy_disables_then_hides() {
        let (gs, cues) = game();
        let view = Arc::new(RecordingView::default());
        gs.register_enemy(0, view.clone());
        gs.damage_enemy(0, 5).await;
        let e = gs.enemy(0).unwrap();
        assert_eq!(e.health, 0);
        assert!(!e.enabled);
        assert!(!gs.has_enemy_at(Coord::new(4, 2)));
        assert_eq!(
            view.calls()[2..].to_vec(),
            vec!["damage", "death", "set_visibility false"]
        );
        assert_eq!(cues.count("enemyDamaged"), 1);
        assert_eq!(cues.count("enemyDeath"), 1);

        gs.damage_enemy(0, 5).await;
        assert_eq!(cues.count("enemyDamaged"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn enemy_hit_applies_state_before_animating() {
        let (gs, cues) = game();
        let view = Arc::new(RecordingView::with_transition(Duration::from_millis(400)));
        gs.register_enemy(0, view.clone());
        let hit = gs.hit_enemy(0, 5).unwrap();
        assert!(hit.died());
        assert!(!gs.enemy(0).unwrap().enabled);
        assert_eq!(cues.names(), vec!["enemyDamaged"]);
        assert_eq!(view.count("damage"), 0);
        assert!(gs.hit_enemy(0, 5).is_none());

        let start = Instant::now();
        hit.play().await;
        assert!(start.elapsed() >= Duration::from_millis(800));
        assert_eq!(cues.names(), vec!["enemyDamaged", "enemyDeath"]);
        assert_eq!(view.count("set_visibility false"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_without_key_is_rejected() {
        let (gs, cues) = game();
        let view = Arc::new(RecordingView::default());
        gs.register_player(view.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        gs.events().subscribe(LifecycleEvent::ExitedLevel, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        gs.exit_level().await;
        assert!(!gs.has_exited_level());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(cues.count("accessDenied"), 1);
        assert_eq!(view.count("danger Access Card Required"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_with_key_happens_once() {
        let (gs, cues) = game();
        let view = Arc::new(RecordingView::default());
        gs.register_player(view.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        gs.events().subscribe(LifecycleEvent::ExitedLevel, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        gs.acquire_keycard();
        assert!(gs.player().has_key);
        assert_eq!(view.count("success Access Card Acquired"), 1);

        tokio::join!(gs.exit_level(), gs.exit_level());
        gs.exit_level().await;
        assert!(gs.has_exited_level());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(cues.count("accessGranted"), 1);
        assert_eq!(gs.events().count(LifecycleEvent::KeycardAcquired), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attack_cooldown_expires() {
        let (gs, _) = game_with(GameConfig::default());
        assert!(gs.try_start_attack_cooldown());
        assert!(!gs.try_start_attack_cooldown());
        tokio::time::advance(Duration::from_millis(301)).await;
        assert!(gs.try_start_attack_cooldown());
    }
}
