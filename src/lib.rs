pub mod audio;
pub mod config;
pub mod enemy;
pub mod events;
pub mod game_state;
pub mod level;
pub mod map_query;
pub mod pathfinding;
pub mod player;
pub mod plugin;
pub mod raster;
pub mod tessellation;
pub mod turn;
pub mod view;

#[cfg(test)]
mod test_support;

pub use config::{load_config, GameConfig};
pub use game_state::GameState;
pub use level::LevelDocument;
pub use plugin::{CrawlerFlow, CrawlerPlugin, CrawlerSession, PendingCommands};
