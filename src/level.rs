use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Integer grid coordinate. `x` grows east, `z` grows south.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub z: i32,
}

impl Coord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(self, (dx, dz): (i32, i32)) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Centre of the cell in world space, on the floor plane.
    pub fn world_center(self) -> Vec3 {
        Vec3::new(self.x as f32 + 0.5, 0.0, self.z as f32 + 0.5)
    }

    pub fn distance(self, other: Coord) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Neighbour enumeration order. Earlier entries win distance ties.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn rotated_right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::East => Direction::South,
        }
    }

    pub fn rotated_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
            Direction::East => Direction::North,
        }
    }

    pub fn forward(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
        }
    }

    pub fn backward(self) -> (i32, i32) {
        let (x, z) = self.forward();
        (-x, -z)
    }

    pub fn strafe_left(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::West => (0, 1),
            Direction::East => (0, -1),
        }
    }

    pub fn strafe_right(self) -> (i32, i32) {
        let (x, z) = self.strafe_left();
        (-x, -z)
    }
}

/// A one-tile translation relative to the actor's facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
}

impl Step {
    pub fn offset(self, look: Direction) -> (i32, i32) {
        match self {
            Step::Forward => look.forward(),
            Step::Backward => look.backward(),
            Step::StrafeLeft => look.strafe_left(),
            Step::StrafeRight => look.strafe_right(),
        }
    }
}

/// A quarter turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

impl Turn {
    pub fn apply(self, look: Direction) -> Direction {
        match self {
            Turn::Left => look.rotated_left(),
            Turn::Right => look.rotated_right(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupKind {
    Health,
    Ammo,
    Key,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AtlasData {
    pub width: u32,
    #[serde(default)]
    pub src: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MapSize {
    pub width: usize,
    pub length: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PropRotation {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePropEntity {
    pub kind: String,
    pub position: Coord,
    #[serde(default)]
    pub rotation: PropRotation,
    #[serde(default)]
    pub is_move_blocker: bool,
    #[serde(default)]
    pub is_vision_blocker: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyEntity {
    pub kind: String,
    pub position: Coord,
    pub look: Direction,
    pub sight_range: f32,
    #[serde(default)]
    pub health_class: usize,
    #[serde(default)]
    pub speed_class: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PickupEntity {
    pub kind: PickupKind,
    pub position: Coord,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub props: Vec<StagePropEntity>,
    #[serde(default)]
    pub enemies: Vec<EnemyEntity>,
    #[serde(default)]
    pub pickups: Vec<PickupEntity>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PlayerStart {
    pub x: i32,
    pub z: i32,
    pub look: Direction,
}

impl PlayerStart {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.z)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapLogic {
    pub start: PlayerStart,
    pub goal: Coord,
    #[serde(default)]
    pub entities: Entities,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileTypes {
    pub walls: Vec<u32>,
    pub floors: Vec<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapData {
    pub size: MapSize,
    pub logic: MapLogic,
    pub types: TileTypes,
    pub tiles: Vec<u32>,
    pub ceilings: Vec<u32>,
}

/// A level as authored: atlas description plus the tile map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelDocument {
    pub atlas: AtlasData,
    pub map: MapData,
}

impl LevelDocument {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let level: LevelDocument =
            serde_json::from_str(json).map_err(|err| format!("Invalid level JSON: {err}"))?;
        level.validate()?;
        Ok(level)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|err| format!("Failed to read level {path}: {err}"))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), String> {
        let MapSize { width, length } = self.map.size;
        if width == 0 || length == 0 {
            return Err(format!("Map size must be non-zero, got {width}x{length}"));
        }
        let cells = width * length;
        if self.map.tiles.len() != cells {
            return Err(format!(
                "Tile layer has {} entries, expected {cells}",
                self.map.tiles.len()
            ));
        }
        if self.map.ceilings.len() != cells {
            return Err(format!(
                "Ceiling layer has {} entries, expected {cells}",
                self.map.ceilings.len()
            ));
        }
        if self.atlas.width == 0 {
            return Err("Atlas width must be non-zero".to_string());
        }
        let in_bounds =
            |c: Coord| c.x >= 0 && c.z >= 0 && (c.x as usize) < width && (c.z as usize) < length;
        if !in_bounds(self.map.logic.start.coord()) {
            return Err("Player start lies outside the map".to_string());
        }
        if !in_bounds(self.map.logic.goal) {
            return Err("Goal lies outside the map".to_string());
        }
        Ok(())
    }

    /// Small walled room used by tests and the headless runner.
    ///
    /// ```text
    /// z0  # # # # # # #
    /// z1  # S . . . . #
    /// z2  # . # . E . #
    /// z3  # . . . . G #
    /// z4  # # # # # # #
    /// ```
    pub fn test_level() -> Self {
        const W: u32 = 1;
        const F: u32 = 2;
        let width = 7;
        let length = 5;
        let mut tiles = vec![W; width * length];
        for z in 1..4 {
            for x in 1..6 {
                tiles[z * width + x] = F;
            }
        }
        tiles[2 * width + 2] = W;
        let ceilings = tiles.iter().map(|&t| if t == F { 3 } else { 0 }).collect();

        LevelDocument {
            atlas: AtlasData {
                width: 4,
                src: "atlas.png".to_string(),
            },
            map: MapData {
                size: MapSize { width, length },
                logic: MapLogic {
                    start: PlayerStart {
                        x: 1,
                        z: 1,
                        look: Direction::East,
                    },
                    goal: Coord::new(5, 3),
                    entities: Entities {
                        props: vec![StagePropEntity {
                            kind: "barrel".to_string(),
                            position: Coord::new(3, 3),
                            rotation: PropRotation::default(),
                            is_move_blocker: true,
                            is_vision_blocker: false,
                        }],
                        enemies: vec![EnemyEntity {
                            kind: "drone".to_string(),
                            position: Coord::new(4, 2),
                            look: Direction::West,
                            sight_range: 6.0,
                            health_class: 0,
                            speed_class: 0,
                        }],
                        pickups: vec![
                            PickupEntity {
                                kind: PickupKind::Ammo,
                                position: Coord::new(2, 1),
                            },
                            PickupEntity {
                                kind: PickupKind::Key,
                                position: Coord::new(1, 3),
                            },
                        ],
                    },
                },
                types: TileTypes {
                    walls: vec![W],
                    floors: vec![F],
                },
                tiles,
                ceilings,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_are_inverse() {
        for dir in Direction::ALL {
            assert_eq!(dir.rotated_left().rotated_right(), dir);
            assert_eq!(dir.rotated_right().rotated_right().rotated_right().rotated_right(), dir);
        }
    }

    #[test]
    fn strafe_is_forward_of_rotated_look() {
        for dir in Direction::ALL {
            assert_eq!(dir.strafe_left(), dir.rotated_left().forward());
            assert_eq!(dir.strafe_right(), dir.rotated_right().forward());
        }
    }

    #[test]
    fn world_center_is_cell_middle() {
        assert_eq!(Coord::new(2, 3).world_center(), Vec3::new(2.5, 0.0, 3.5));
    }

    #[test]
    fn parses_camel_case_level_json() {
        let json = r#"{
            "atlas": { "width": 2, "src": "a.png" },
            "map": {
                "size": { "width": 2, "length": 1 },
                "logic": {
                    "start": { "x": 0, "z": 0, "look": "east" },
                    "goal": { "x": 1, "z": 0 },
                    "entities": {
                        "props": [{ "kind": "crate", "position": { "x": 1, "z": 0 },
                                    "rotation": { "x": 0, "y": 1.5, "z": 0 },
                                    "isMoveBlocker": true, "isVisionBlocker": false }],
                        "enemies": [{ "kind": "bot", "position": { "x": 1, "z": 0 },
                                      "look": "west", "sightRange": 4,
                                      "healthClass": 1, "speedClass": 0 }],
                        "pickups": [{ "kind": "key", "position": { "x": 0, "z": 0 } }]
                    }
                },
                "types": { "walls": [1], "floors": [2] },
                "tiles": [2, 2],
                "ceilings": [0, 3]
            }
        }"#;
        let level = LevelDocument::from_json(json).unwrap();
        assert_eq!(level.map.logic.start.look, Direction::East);
        assert!(level.map.logic.entities.props[0].is_move_blocker);
        assert_eq!(level.map.logic.entities.enemies[0].health_class, 1);
        assert_eq!(level.map.logic.entities.pickups[0].kind, PickupKind::Key);
    }

    #[test]
    fn rejects_mismatched_tile_layer() {
        let mut level = LevelDocument::test_level();
        level.map.tiles.pop();
        let err = level.validate().unwrap_err();
        assert!(err.contains("Tile layer"), "{err}");
    }

    #[test]
    fn rejects_start_outside_map() {
        let mut level = LevelDocument::test_level();
        level.map.logic.start.x = 40;
        assert!(level.validate().is_err());
    }

    #[test]
    fn test_level_is_valid() {
        assert!(LevelDocument::test_level().validate().is_ok());
    }

    #[test]
    fn bundled_level_parses() {
        let level = LevelDocument::from_json(include_str!("../levels/level0.json")).unwrap();
        assert_eq!(level.map.size.width, 9);
        assert_eq!(level.map.logic.entities.pickups.len(), 3);
        assert_eq!(level.map.logic.entities.enemies[0].look, Direction::West);
        assert!(level.map.logic.entities.props[0].is_vision_blocker);
    }
}
