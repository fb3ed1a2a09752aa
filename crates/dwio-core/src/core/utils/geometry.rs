use crate::core::models::reaction::Reaction;
use nalgebra::{Point3, Vector3};

/// Axis-aligned rectangle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Largest absolute X or Y coordinate touched by the rectangle.
    pub fn max_abs_extent(&self) -> f64 {
        [
            self.x.abs(),
            (self.x + self.width).abs(),
            self.y.abs(),
            (self.y + self.height).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }
}

/// XY bounding rectangle over every atom of every molecule, or `None` without atoms.
pub fn bounding_rect(reaction: &Reaction) -> Option<Rect> {
    let mut positions = reaction
        .molecules()
        .flat_map(|m| m.atoms().iter().map(|a| a.position));
    let first = positions.next()?;
    let (min, max) = positions.fold((first, first), |(min, max), p| {
        (
            Point3::new(min.x.min(p.x), min.y.min(p.y), 0.0),
            Point3::new(max.x.max(p.x), max.y.max(p.y), 0.0),
        )
    });
    Some(Rect {
        x: min.x,
        y: min.y,
        width: max.x - min.x,
        height: max.y - min.y,
    })
}

/// Translates every atom by `(dx, dy)` and then scales all three coordinates.
pub fn transform(reaction: &mut Reaction, dx: f64, dy: f64, scale: f64) {
    let shift = Vector3::new(dx, dy, 0.0);
    for molecule in reaction.molecules_mut() {
        for atom in molecule.atoms_mut() {
            atom.position = Point3::from((atom.position.coords + shift) * scale);
        }
    }
}

/// Power-of-ten factor that brings the rectangle's largest absolute extent below 1.0.
///
/// Returns `None` for a degenerate extent (all atoms at the origin).
pub fn normalization_scale(rect: &Rect) -> Option<f64> {
    let extent = rect.max_abs_extent();
    if extent <= 0.0 || !extent.is_finite() {
        return None;
    }
    Some(10f64.powi(-(extent.log10().floor() as i32 + 1)))
}
