//! Axis-aligned bounds and model normalization

use glam::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self { min: first, max: first };
        for p in points {
            aabb.extend(p);
        }
        Some(aabb)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Largest of width, height and depth
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }
}

/// Uniform scale plus translation that maps a model's bounds onto a box of
/// `target_size` max dimension centered at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    pub translation: Vec3,
    /// Bounds of the raw geometry before the transform
    pub source_bounds: Aabb,
}

impl Normalization {
    /// Fit `bounds` to `target_size`. Degenerate bounds (no extent) keep
    /// scale 1.0 and are only recentered.
    pub fn fit(bounds: Aabb, target_size: f32) -> Self {
        let max_dim = bounds.max_dimension();
        let scale = if max_dim > f32::EPSILON && target_size > 0.0 {
            target_size / max_dim
        } else {
            1.0
        };

        Self {
            scale,
            translation: -bounds.center() * scale,
            source_bounds: bounds,
        }
    }

    pub fn apply(&self, point: Vec3) -> Vec3 {
        point * self.scale + self.translation
    }

    /// Bounds after the transform is applied
    pub fn normalized_bounds(&self) -> Aabb {
        Aabb::new(
            self.apply(self.source_bounds.min),
            self.apply(self.source_bounds.max),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 2.0));
        assert_eq!(aabb.max_dimension(), 6.0);

        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_fit_scales_and_centers() {
        let bounds = Aabb::new(Vec3::new(10.0, 2.0, -1.0), Vec3::new(14.0, 3.0, 0.0));
        let n = Normalization::fit(bounds, 2.0);
        let out = n.normalized_bounds();

        assert!((out.max_dimension() - 2.0).abs() < EPS);
        assert!(out.center().length() < EPS);
        assert!((n.scale - 0.5).abs() < EPS);
    }

    #[test]
    fn test_fit_is_stable_on_normalized_input() {
        let bounds = Aabb::new(Vec3::new(-7.0, 0.0, 3.0), Vec3::new(1.0, 5.0, 4.0));
        let first = Normalization::fit(bounds, 2.0);
        let second = Normalization::fit(first.normalized_bounds(), 2.0);

        assert!((second.scale - 1.0).abs() < EPS);
        assert!(second.translation.length() < EPS);
    }

    #[test]
    fn test_fit_degenerate() {
        let point = Vec3::new(1.0, 2.0, 3.0);
        let n = Normalization::fit(Aabb::new(point, point), 2.0);
        assert_eq!(n.scale, 1.0);
        assert!(n.apply(point).length() < EPS);
    }

    #[test]
    fn test_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }
}
