use crate::level::{Coord, Direction};

/// Outcome of walking a ray cell by cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayHit<T> {
    /// The first target found before any blocker.
    Hit(Coord, T),
    /// A vision blocker ended the ray.
    Blocked(Coord),
    /// The ray ran out without finding anything.
    Clear,
}

impl<T> RayHit<T> {
    pub fn target(self) -> Option<T> {
        match self {
            RayHit::Hit(_, target) => Some(target),
            _ => None,
        }
    }
}

/// Grid cells on the segment from `from` to `to`, both ends included.
///
/// Steps once per unit along the longer axis and rounds the interpolated
/// point to the nearest cell, halves rounding up.
pub fn line(from: Coord, to: Coord) -> Vec<Coord> {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let n = dx.abs().max(dz.abs());
    if n == 0 {
        return vec![from];
    }
    let round = |v: f32| (v + 0.5).floor() as i32;
    (0..=n)
        .map(|step| {
            let t = step as f32 / n as f32;
            Coord::new(
                round(from.x as f32 + dx as f32 * t),
                round(from.z as f32 + dz as f32 * t),
            )
        })
        .collect()
}

/// Cells straight ahead of `origin`, starting one tile out.
pub fn cardinal_ray(origin: Coord, look: Direction, length: i32) -> impl Iterator<Item = Coord> {
    let (dx, dz) = look.forward();
    (1..=length.max(0)).map(move |step| Coord::new(origin.x + dx * step, origin.z + dz * step))
}

/// Walks `cells` in order. A blocker ends the walk before the target check
/// on the same cell.
pub fn first_hit<T>(
    cells: impl IntoIterator<Item = Coord>,
    mut is_blocker: impl FnMut(Coord) -> bool,
    mut target_at: impl FnMut(Coord) -> Option<T>,
) -> RayHit<T> {
    for cell in cells {
        if is_blocker(cell) {
            return RayHit::Blocked(cell);
        }
        if let Some(target) = target_at(cell) {
            return RayHit::Hit(cell, target);
        }
    }
    RayHit::Clear
}
