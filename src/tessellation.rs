use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use serde::{Deserialize, Serialize};

use crate::level::{Direction, LevelDocument};
use crate::map_query::MapQuery;

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Indexed triangle list for a whole level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl LevelMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    pub fn flat_positions(&self) -> Vec<f32> {
        self.positions.iter().flatten().copied().collect()
    }

    pub fn flat_normals(&self) -> Vec<f32> {
        self.normals.iter().flatten().copied().collect()
    }

    pub fn flat_uvs(&self) -> Vec<f32> {
        self.uvs.iter().flatten().copied().collect()
    }

    pub fn to_bevy_mesh(&self) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone())
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone())
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs.clone())
            .with_inserted_indices(Indices::U32(self.indices.clone()))
    }

    fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3], uvs: [[f32; 2]; 4]) {
        let offset = self.positions.len() as u32;
        self.indices.extend(QUAD_INDICES.iter().map(|i| offset + i));
        self.positions.extend(corners);
        self.normals.extend([normal; 4]);
        self.uvs.extend(uvs);
    }
}

/// Texture coordinates of one atlas cell for a 1-based tile code.
///
/// Order is bottom-left, bottom-right, top-left, top-right.
pub fn atlas_quad_uvs(code: u32, atlas_width: u32) -> [[f32; 2]; 4] {
    let w = atlas_width.max(1);
    let i = code.saturating_sub(1);
    let unit = 1.0 / w as f32;
    let left = (i % w) as f32 / w as f32;
    let top = 1.0 - (i / w) as f32 / w as f32;
    let right = left + unit;
    let bottom = top - unit;
    [[left, bottom], [right, bottom], [left, top], [right, top]]
}

#[derive(Clone, Copy)]
struct Cell {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

/// Builds floor, ceiling and wall quads for every cell of the map.
pub fn tessellate(level: &LevelDocument, map: &MapQuery) -> LevelMesh {
    let atlas_width = level.atlas.width;
    let mut mesh = LevelMesh::default();

    for index in 0..map.cell_count() {
        let Some(coord) = map.index_to_coords(index) else {
            continue;
        };
        let value = map.value_by_index(index).unwrap_or(0);
        if value < 1 {
            continue;
        }
        let cell = Cell {
            left: coord.x as f32,
            right: coord.x as f32 + 1.0,
            top: coord.z as f32,
            bottom: coord.z as f32 + 1.0,
        };

        if map.is_floor(value) {
            let Cell { left, right, top, bottom } = cell;
            mesh.push_quad(
                [
                    [left, 0.0, bottom],
                    [right, 0.0, bottom],
                    [left, 0.0, top],
                    [right, 0.0, top],
                ],
                [0.0, 1.0, 0.0],
                atlas_quad_uvs(value, atlas_width),
            );
            let ceiling = map.ceiling_value_by_index(index).unwrap_or(0);
            if ceiling >= 1 {
                mesh.push_quad(
                    [
                        [right, 1.0, bottom],
                        [left, 1.0, bottom],
                        [right, 1.0, top],
                        [left, 1.0, top],
                    ],
                    [0.0, -1.0, 0.0],
                    atlas_quad_uvs(ceiling, atlas_width),
                );
            }
            continue;
        }

        for dir in Direction::ALL {
            let borders_floor = map
                .adjacent_value_by_index(index, dir)
                .is_some_and(|v| map.is_floor(v));
            if borders_floor {
                let (corners, normal) = wall_face(&cell, dir);
                mesh.push_quad(corners, normal, atlas_quad_uvs(value, atlas_width));
            }
        }
    }

    mesh
}

/// Vertical face on the edge shared with the neighbour in `dir`; the normal
/// points into that neighbour.
fn wall_face(cell: &Cell, dir: Direction) -> ([[f32; 3]; 4], [f32; 3]) {
    let Cell { left, right, top, bottom } = *cell;
    match dir {
        Direction::North => (
            [
                [right, 0.0, top],
                [left, 0.0, top],
                [right, 1.0, top],
                [left, 1.0, top],
            ],
            [0.0, 0.0, -1.0],
        ),
        Direction::South => (
            [
                [left, 0.0, bottom],
                [right, 0.0, bottom],
                [left, 1.0, bottom],
                [right, 1.0, bottom],
            ],
            [0.0, 0.0, 1.0],
        ),
        Direction::West => (
            [
                [left, 0.0, top],
                [left, 0.0, bottom],
                [left, 1.0, top],
                [left, 1.0, bottom],
            ],
            [-1.0, 0.0, 0.0],
        ),
        Direction::East => (
            [
                [right, 0.0, bottom],
                [right, 0.0, top],
                [right, 1.0, bottom],
                [right, 1.0, top],
            ],
            [1.0, 0.0, 0.0],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{
        AtlasData, Coord, Entities, MapData, MapLogic, MapSize, PlayerStart, TileTypes,
    };

    fn level(width: usize, length: usize, tiles: Vec<u32>, ceilings: Vec<u32>) -> LevelDocument {
        LevelDocument {
            atlas: AtlasData {
                width: 4,
                src: String::new(),
            },
            map: MapData {
                size: MapSize { width, length },
                logic: MapLogic {
                    start: PlayerStart {
                        x: 0,
                        z: 0,
                        look: Direction::North,
                    },
                    goal: Coord::new(0, 0),
                    entities: Entities::default(),
                },
                types: TileTypes {
                    walls: vec![1],
                    floors: vec![2],
                },
                tiles,
                ceilings,
            },
        }
    }

    fn bake(level: &LevelDocument) -> LevelMesh {
        tessellate(level, &MapQuery::new(&level.map))
    }

    #[test]
    fn single_floor_with_ceiling() {
        let mesh = bake(&level(1, 1, vec![2], vec![3]));
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices.len(), 12);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7]);
        assert!(mesh.normals[..4].iter().all(|n| *n == [0.0, 1.0, 0.0]));
        assert!(mesh.normals[4..].iter().all(|n| *n == [0.0, -1.0, 0.0]));
        assert_eq!(mesh.flat_positions().len(), 24);
    }

    #[test]
    fn floor_without_ceiling_emits_one_quad() {
        let mesh = bake(&level(1, 1, vec![2], vec![0]));
        assert_eq!(mesh.quad_count(), 1);
    }

    #[test]
    fn wall_with_one_floor_neighbour_faces_it() {
        // wall at x=0, floor at x=1 (east of the wall)
        let mesh = bake(&level(2, 1, vec![1, 2], vec![0, 0]));
        assert_eq!(mesh.quad_count(), 2);
        let wall_normals: Vec<_> = mesh
            .normals
            .iter()
            .filter(|n| n[1] == 0.0)
            .collect();
        assert_eq!(wall_normals.len(), 4);
        assert!(wall_normals.iter().all(|n| **n == [1.0, 0.0, 0.0]));
        assert!(mesh.positions[..4].iter().all(|p| p[0] == 1.0));
    }

    #[test]
    fn enclosed_wall_emits_nothing() {
        let mesh = bake(&level(2, 2, vec![1, 1, 1, 1], vec![0; 4]));
        assert!(mesh.indices.is_empty());
    }

    #[test]
    fn null_tile_emits_nothing_even_next_to_floor() {
        let mesh = bake(&level(2, 1, vec![0, 2], vec![0, 0]));
        assert_eq!(mesh.quad_count(), 1);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn pillar_emits_a_face_per_floor_side() {
        let mut tiles = vec![2; 9];
        tiles[4] = 1;
        let mesh = bake(&level(3, 3, tiles, vec![0; 9]));
        // 8 floors + 4 pillar sides
        assert_eq!(mesh.quad_count(), 12);
    }

    #[test]
    fn walls_do_not_see_floor_across_row_wrap() {
        // row 0: floor wall, row 1: floor wall; the wall at the end of row 0
        // must not face the floor that starts row 1.
        let mesh = bake(&level(2, 2, vec![2, 1, 2, 1], vec![0; 4]));
        let east_faces = mesh.normals.iter().filter(|n| **n == [1.0, 0.0, 0.0]).count();
        assert_eq!(east_faces, 0);
    }

    #[test]
    fn atlas_uvs_cover_one_cell() {
        let uvs = atlas_quad_uvs(1, 4);
        assert_eq!(uvs, [[0.0, 0.75], [0.25, 0.75], [0.0, 1.0], [0.25, 1.0]]);
        let uvs = atlas_quad_uvs(6, 4);
        assert_eq!(uvs, [[0.25, 0.5], [0.5, 0.5], [0.25, 0.75], [0.5, 0.75]]);
    }

    #[test]
    fn converts_to_bevy_mesh() {
        let mesh = bake(&LevelDocument::test_level()).to_bevy_mesh();
        assert!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).is_some());
        assert!(mesh.indices().is_some());
    }
}
