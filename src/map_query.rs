use std::collections::{HashMap, HashSet};

use crate::level::{Coord, Direction, MapData, PickupEntity, PlayerStart, StagePropEntity};

/// Read-only lookups over a loaded map.
///
/// Walkability and vision blocking are resolved once per cell when the query
/// is built; entity lookups go through coordinate maps. Anything outside the
/// grid reads as `None` or `false`.
pub struct MapQuery {
    width: usize,
    length: usize,
    tiles: Vec<u32>,
    ceilings: Vec<u32>,
    floors: HashSet<u32>,
    walls: HashSet<u32>,
    props: Vec<StagePropEntity>,
    pickups: Vec<PickupEntity>,
    prop_at: HashMap<Coord, usize>,
    pickup_at: HashMap<Coord, usize>,
    walkable: Vec<bool>,
    vision_blocker: Vec<bool>,
    start: PlayerStart,
    goal: Coord,
}

impl MapQuery {
    pub fn new(map: &MapData) -> Self {
        let mut prop_at = HashMap::new();
        for (i, prop) in map.logic.entities.props.iter().enumerate() {
            prop_at.entry(prop.position).or_insert(i);
        }
        let mut pickup_at = HashMap::new();
        for (i, pickup) in map.logic.entities.pickups.iter().enumerate() {
            pickup_at.entry(pickup.position).or_insert(i);
        }

        let mut query = Self {
            width: map.size.width,
            length: map.size.length,
            tiles: map.tiles.clone(),
            ceilings: map.ceilings.clone(),
            floors: map.types.floors.iter().copied().collect(),
            walls: map.types.walls.iter().copied().collect(),
            props: map.logic.entities.props.clone(),
            pickups: map.logic.entities.pickups.clone(),
            prop_at,
            pickup_at,
            walkable: Vec::new(),
            vision_blocker: Vec::new(),
            start: map.logic.start,
            goal: map.logic.goal,
        };

        let cells = query.width * query.length;
        let mut walkable = Vec::with_capacity(cells);
        let mut vision_blocker = Vec::with_capacity(cells);
        for index in 0..cells {
            let coord = query.index_to_coords_unchecked(index);
            let value = query.tiles.get(index).copied().unwrap_or(0);
            let prop = query.stage_prop_at(coord);
            walkable.push(query.is_floor(value) && !prop.is_some_and(|p| p.is_move_blocker));
            vision_blocker.push(query.is_wall(value) || prop.is_some_and(|p| p.is_vision_blocker));
        }
        query.walkable = walkable;
        query.vision_blocker = vision_blocker;
        query
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.length
    }

    pub fn start(&self) -> PlayerStart {
        self.start
    }

    pub fn goal(&self) -> Coord {
        self.goal
    }

    pub fn is_goal(&self, coord: Coord) -> bool {
        coord == self.goal
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.z >= 0
            && (coord.x as usize) < self.width
            && (coord.z as usize) < self.length
    }

    fn index_to_coords_unchecked(&self, index: usize) -> Coord {
        Coord::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn index_to_coords(&self, index: usize) -> Option<Coord> {
        (index < self.cell_count()).then(|| self.index_to_coords_unchecked(index))
    }

    pub fn coords_to_index(&self, coord: Coord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.z as usize * self.width + coord.x as usize)
    }

    pub fn is_floor(&self, value: u32) -> bool {
        self.floors.contains(&value)
    }

    pub fn is_wall(&self, value: u32) -> bool {
        self.walls.contains(&value)
    }

    pub fn value(&self, coord: Coord) -> Option<u32> {
        self.coords_to_index(coord).and_then(|i| self.value_by_index(i))
    }

    pub fn value_by_index(&self, index: usize) -> Option<u32> {
        self.tiles.get(index).copied()
    }

    pub fn ceiling_value(&self, coord: Coord) -> Option<u32> {
        self.coords_to_index(coord)
            .and_then(|i| self.ceiling_value_by_index(i))
    }

    pub fn ceiling_value_by_index(&self, index: usize) -> Option<u32> {
        self.ceilings.get(index).copied()
    }

    pub fn adjacent_value(&self, coord: Coord, dir: Direction) -> Option<u32> {
        self.value(coord.offset(dir.forward()))
    }

    /// Neighbour by flat index. West/east never wrap onto another row.
    pub fn adjacent_value_by_index(&self, index: usize, dir: Direction) -> Option<u32> {
        if index >= self.cell_count() {
            return None;
        }
        let neighbour = match dir {
            Direction::North => index.checked_sub(self.width)?,
            Direction::South => index + self.width,
            Direction::West => {
                if index % self.width == 0 {
                    return None;
                }
                index - 1
            }
            Direction::East => {
                if (index + 1) % self.width == 0 {
                    return None;
                }
                index + 1
            }
        };
        self.value_by_index(neighbour)
    }

    pub fn stage_prop_at(&self, coord: Coord) -> Option<&StagePropEntity> {
        self.prop_at.get(&coord).map(|&i| &self.props[i])
    }

    pub fn pickup_at(&self, coord: Coord) -> Option<&PickupEntity> {
        self.pickup_at.get(&coord).map(|&i| &self.pickups[i])
    }

    /// Floor tile not occupied by a move-blocking prop.
    pub fn is_walkable(&self, coord: Coord) -> bool {
        self.coords_to_index(coord)
            .is_some_and(|i| self.walkable[i])
    }

    /// Wall tile or a vision-blocking prop.
    pub fn is_vision_blocker(&self, coord: Coord) -> bool {
        self.coords_to_index(coord)
            .is_some_and(|i| self.vision_blocker[i])
    }
}
