use std::time::Duration;

use bevy::prelude::*;
use gridcrawl::level::LevelDocument;
use gridcrawl::map_query::MapQuery;
use gridcrawl::player::PlayerCommand;
use gridcrawl::tessellation::tessellate;
use gridcrawl::{load_config, CrawlerFlow, CrawlerPlugin, CrawlerSession, PendingCommands};

const MAX_FRAMES: usize = 3_000;
const FRAME: Duration = Duration::from_millis(16);

fn usage() -> ! {
    eprintln!("usage:");
    eprintln!("  gridcrawl bake <level.json> <out.json>");
    eprintln!("  gridcrawl run <level.json> [keys]");
    eprintln!("  gridcrawl demo [keys]");
    std::process::exit(2);
}

fn bake(level_path: &str, out_path: &str) -> Result<(), String> {
    let level = LevelDocument::load(level_path)?;
    let map = MapQuery::new(&level.map);
    let mesh = tessellate(&level, &map);
    let json = serde_json::to_string(&mesh).map_err(|e| format!("Failed to encode mesh: {e}"))?;
    std::fs::write(out_path, json).map_err(|e| format!("Failed to write {out_path}: {e}"))?;
    println!(
        "[Crawler] Baked {} quads ({} vertices) into {}",
        mesh.quad_count(),
        mesh.vertex_count(),
        out_path
    );
    Ok(())
}

/// Plays a key script (w/s/a/d/q/e, space fires) headless and prints where
/// the player ended up.
fn run(level: LevelDocument, keys: &str) {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(bevy::log::LogPlugin::default())
        .add_plugins(bevy::state::app::StatesPlugin)
        .add_plugins(CrawlerPlugin::new(level, load_config()));

    {
        let mut pending = app.world_mut().resource_mut::<PendingCommands>();
        for key in keys.chars() {
            match PlayerCommand::from_key(&key.to_string()) {
                Some(command) => pending.push(command),
                None => eprintln!("[Crawler] Ignoring key {:?}", key),
            }
        }
        println!("[Crawler] Playing {} command(s)", pending.len());
    }

    for _ in 0..MAX_FRAMES {
        app.update();
        let flow = *app.world().resource::<State<CrawlerFlow>>().get();
        if flow != CrawlerFlow::Playing || app.world().resource::<PendingCommands>().is_idle() {
            break;
        }
        std::thread::sleep(FRAME);
    }
    // lifecycle events land one frame, the state change the next
    app.update();
    app.update();

    let flow = *app.world().resource::<State<CrawlerFlow>>().get();
    let player = app.world().resource::<CrawlerSession>().state().player();
    println!(
        "[Crawler] {:?}: player at {},{} facing {:?}, health {}, ammo {}, key {}",
        flow,
        player.position.x,
        player.position.z,
        player.look,
        player.health,
        player.ammo,
        player.has_key
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("bake") => {
            let (Some(level), Some(out)) = (args.get(2), args.get(3)) else {
                usage();
            };
            if let Err(e) = bake(level, out) {
                eprintln!("[Crawler] {e}");
                std::process::exit(1);
            }
        }
        Some("run") => {
            let Some(path) = args.get(2) else {
                usage();
            };
            match LevelDocument::load(path) {
                Ok(level) => {
                    println!("[Crawler] Loaded level {}", path);
                    run(level, args.get(3).map_or("", String::as_str));
                }
                Err(e) => {
                    eprintln!("[Crawler] {e}");
                    std::process::exit(1);
                }
            }
        }
        Some("demo") => run(
            LevelDocument::test_level(),
            args.get(2).map_or("", String::as_str),
        ),
        _ => usage(),
    }
}
