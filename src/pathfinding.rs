use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::level::{Coord, Direction};
use crate::map_query::MapQuery;

const MAX_EXPANSIONS: usize = 20_000;

fn manhattan(a: Coord, b: Coord) -> u32 {
    a.x.abs_diff(b.x) + a.z.abs_diff(b.z)
}

/// A* over grid cells with unit step cost and a Manhattan heuristic.
///
/// `neighbours` yields the cells reachable in one step from a cell. The
/// returned path starts at `start` and ends at `goal`. Returns `None` when
/// the goal is unreachable or the search exceeds its expansion budget.
pub fn find_path<I>(
    start: Coord,
    goal: Coord,
    mut neighbours: impl FnMut(Coord) -> I,
) -> Option<Vec<Coord>>
where
    I: IntoIterator<Item = Coord>,
{
    let mut open = BinaryHeap::<(Reverse<u32>, usize)>::new();
    let mut nodes = vec![start];
    let mut best_cost = HashMap::<Coord, u32>::new();
    let mut parents = HashMap::<Coord, Option<Coord>>::new();
    best_cost.insert(start, 0);
    parents.insert(start, None);
    open.push((Reverse(manhattan(start, goal)), 0));

    let mut expansions = 0usize;
    while let Some((_, node_idx)) = open.pop() {
        if expansions >= MAX_EXPANSIONS {
            break;
        }
        expansions += 1;

        let current = nodes[node_idx];
        if current == goal {
            return Some(reconstruct_path(&parents, goal));
        }
        let cost = best_cost.get(&current).copied().unwrap_or(u32::MAX);
        for next in neighbours(current) {
            let next_cost = cost.saturating_add(1);
            if best_cost.get(&next).is_some_and(|seen| *seen <= next_cost) {
                continue;
            }
            best_cost.insert(next, next_cost);
            parents.insert(next, Some(current));
            nodes.push(next);
            let score = next_cost.saturating_add(manhattan(next, goal));
            open.push((Reverse(score), nodes.len() - 1));
        }
    }

    None
}

fn reconstruct_path(parents: &HashMap<Coord, Option<Coord>>, goal: Coord) -> Vec<Coord> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(Some(parent)) = parents.get(&current) {
        path.push(*parent);
        current = *parent;
    }
    path.reverse();
    path
}

/// Shortest route between two cells over walkable floor.
pub fn find_walkable_path(map: &MapQuery, start: Coord, goal: Coord) -> Option<Vec<Coord>> {
    if !map.is_walkable(goal) {
        return None;
    }
    find_path(start, goal, move |cell| {
        Direction::ALL
            .into_iter()
            .map(move |dir| cell.offset(dir.forward()))
            .filter(move |next| map.is_walkable(*next))
    })
}
