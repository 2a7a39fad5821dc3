use std::collections::VecDeque;
use std::sync::Arc;

use bevy::prelude::*;
use crossbeam_channel::Receiver;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::audio::{AudioManager, CueSink};
use crate::config::GameConfig;
use crate::enemy::EnemyDispatcher;
use crate::events::{LifecycleBus, LifecycleEvent};
use crate::game_state::{GameState, ViewRegistration};
use crate::level::LevelDocument;
use crate::player::{PlayerBehavior, PlayerCommand};
use crate::tessellation::{tessellate, LevelMesh};
use crate::view::LogView;

#[derive(States, Default, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum CrawlerFlow {
    #[default]
    Playing,
    GameOver,
    LevelExited,
}

/// Player commands waiting for the turn system, plus the one in flight.
#[derive(Resource, Default)]
pub struct PendingCommands {
    queue: VecDeque<PlayerCommand>,
    in_flight: Option<JoinHandle<()>>,
}

impl PendingCommands {
    pub fn push(&mut self, command: PlayerCommand) {
        self.queue.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Nothing queued and nothing running.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

/// Baked level geometry, ready for a renderer.
#[derive(Resource)]
pub struct LevelGeometry(pub LevelMesh);

#[derive(Resource)]
struct AiTimer(Timer);

/// The simulation core and the runtime it runs on.
#[derive(Resource)]
pub struct CrawlerSession {
    runtime: Runtime,
    state: Arc<GameState>,
    player: Arc<PlayerBehavior>,
    enemies: Arc<EnemyDispatcher>,
    lifecycle: Receiver<LifecycleEvent>,
    views: Vec<ViewRegistration>,
}

impl CrawlerSession {
    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    pub fn player(&self) -> &Arc<PlayerBehavior> {
        &self.player
    }

    pub fn enemies(&self) -> &Arc<EnemyDispatcher> {
        &self.enemies
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Detaches the default log views, e.g. before attaching real ones.
    pub fn detach_views(&mut self) {
        for registration in self.views.drain(..) {
            registration.unregister();
        }
    }
}

pub struct CrawlerPlugin {
    level: LevelDocument,
    config: GameConfig,
}

impl CrawlerPlugin {
    pub fn new(level: LevelDocument, config: GameConfig) -> Self {
        Self { level, config }
    }
}

impl Plugin for CrawlerPlugin {
    fn build(&self, app: &mut App) {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("[Crawler] Failed to start async runtime: {}", e);
                return;
            }
        };

        let cues: Arc<dyn CueSink> = Arc::new(AudioManager::default());
        let state = Arc::new(GameState::new(&self.level, self.config.clone(), cues));
        let geometry = tessellate(&self.level, state.map());
        info!(
            "[Crawler] Baked level geometry: {} quads",
            geometry.quad_count()
        );

        let rx = bridge_lifecycle(state.events());

        let mut views = vec![state.register_player(Arc::new(LogView::new("player")))];
        for index in 0..state.enemy_count() {
            let view = Arc::new(LogView::new(format!("enemy {index}")));
            views.extend(state.register_enemy(index, view));
        }
        for index in 0..self.level.map.logic.entities.pickups.len() {
            let view = Arc::new(LogView::new(format!("pickup {index}")));
            views.extend(state.register_pickup(index, view));
        }

        let session = CrawlerSession {
            runtime,
            player: Arc::new(PlayerBehavior::new(Arc::clone(&state))),
            enemies: Arc::new(EnemyDispatcher::new(Arc::clone(&state))),
            state,
            lifecycle: rx,
            views,
        };

        app.init_state::<CrawlerFlow>()
            .insert_resource(self.config.clone())
            .insert_resource(session)
            .insert_resource(LevelGeometry(geometry))
            .insert_resource(PendingCommands::default())
            .insert_resource(AiTimer(Timer::new(
                self.config.ai_tick_interval(),
                TimerMode::Repeating,
            )))
            .add_systems(
                Update,
                (
                    (read_keyboard, submit_player_commands, tick_enemy_ai)
                        .run_if(in_state(CrawlerFlow::Playing)),
                    apply_lifecycle_events,
                )
                    .chain(),
            )
            .add_systems(OnEnter(CrawlerFlow::GameOver), || {
                info!("[Crawler] Game over");
            })
            .add_systems(OnEnter(CrawlerFlow::LevelExited), || {
                info!("[Crawler] Level exited");
            });
    }
}

/// Forwards every lifecycle event into a channel drained by the ECS.
fn bridge_lifecycle(bus: &LifecycleBus) -> Receiver<LifecycleEvent> {
    let (tx, rx) = crossbeam_channel::unbounded::<LifecycleEvent>();
    for event in [
        LifecycleEvent::GameOver,
        LifecycleEvent::KeycardAcquired,
        LifecycleEvent::ExitedLevel,
    ] {
        let tx = tx.clone();
        bus.subscribe(event, move |ev| {
            if let Err(e) = tx.send(ev) {
                warn!("[Crawler] Dropped lifecycle event {:?}: {}", ev, e);
            }
        });
    }
    rx
}

fn read_keyboard(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut pending: ResMut<PendingCommands>,
) {
    let Some(keys) = keys else {
        return;
    };
    for key in keys.get_just_pressed() {
        if let Some(command) = PlayerCommand::from_key_code(*key) {
            pending.push(command);
        }
    }
}

/// Starts the next queued command once the previous one finished and no AI
/// tick is running.
fn submit_player_commands(session: Res<CrawlerSession>, mut pending: ResMut<PendingCommands>) {
    if pending
        .in_flight
        .as_ref()
        .is_some_and(|handle| !handle.is_finished())
    {
        return;
    }
    if session.enemies.is_busy() || session.state.is_player_busy() {
        return;
    }
    let Some(command) = pending.queue.pop_front() else {
        pending.in_flight = None;
        return;
    };
    debug!("[Crawler] Submitting {:?}", command);
    let player = Arc::clone(&session.player);
    pending.in_flight = Some(
        session
            .runtime
            .spawn(async move { player.execute(command).await }),
    );
}

fn tick_enemy_ai(time: Res<Time>, mut timer: ResMut<AiTimer>, session: Res<CrawlerSession>) {
    timer.0.tick(time.delta());
    if !timer.0.just_finished() || session.enemies.is_busy() {
        return;
    }
    let enemies = Arc::clone(&session.enemies);
    session.runtime.spawn(async move { enemies.tick_all().await });
}

fn apply_lifecycle_events(
    session: Res<CrawlerSession>,
    mut next_state: ResMut<NextState<CrawlerFlow>>,
) {
    while let Ok(event) = session.lifecycle.try_recv() {
        match event {
            LifecycleEvent::GameOver => next_state.set(CrawlerFlow::GameOver),
            LifecycleEvent::ExitedLevel => next_state.set(CrawlerFlow::LevelExited),
            LifecycleEvent::KeycardAcquired => info!("[Crawler] Keycard acquired"),
        }
    }
}
