//! Spatial culling primitives: bounding spheres, frustum planes with an
//! incremental clip mask, and the screen-space diameter estimate.

use glam::{Mat4, Vec3, Vec4};

/// Result of testing a volume against one or more planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Entirely on the negative side of a plane.
    Outside,
    /// Entirely on the positive side of every tested plane.
    Inside,
    /// Straddling at least one plane (or not enough information yet).
    Intersecting,
}

/// A plane in `dot(normal, p) + d = 0` form, normal pointing inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed distance offset.
    pub d: f32,
}

impl Plane {
    /// Build a normalized plane from raw coefficients.
    #[must_use]
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: d / len,
            }
        } else {
            Self {
                normal: Vec3::ZERO,
                d: 0.0,
            }
        }
    }

    /// Signed distance from `point` to the plane.
    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Per-node clip state carried down a tile hierarchy while culling.
///
/// A child enclosed in its parent's volume cannot be outside a plane
/// the parent was fully inside of, so each "fully inside" verdict is
/// recorded as a bit and that plane is skipped for all descendants.
/// One "fully outside" verdict short-circuits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneClipMask {
    /// Bit `i` set: definitely inside plane `i`, no recheck needed.
    code: u32,
    /// The volume was fully outside some plane.
    any_outside: bool,
}

/// All six frustum-plane bits set.
const MASK_INSIDE: u32 = 0x3F;

impl PlaneClipMask {
    /// The mask that checks every plane.
    #[must_use]
    pub fn all_planes() -> Self {
        Self::default()
    }

    /// Whether plane `i` still needs checking.
    #[must_use]
    pub fn needs_check(&self, plane_idx: usize) -> bool {
        self.code & (1 << plane_idx) == 0
    }

    /// Record the verdict for plane `i`.
    pub fn set(&mut self, plane_idx: usize, intersection: Intersection) {
        match intersection {
            Intersection::Outside => self.any_outside = true,
            Intersection::Inside => self.code |= 1 << plane_idx,
            Intersection::Intersecting => self.code &= !(1 << plane_idx),
        }
    }

    /// The combined verdict over all recorded planes.
    #[must_use]
    pub fn intersection(&self) -> Intersection {
        if self.any_outside {
            Intersection::Outside
        } else if self.code == MASK_INSIDE {
            Intersection::Inside
        } else {
            Intersection::Intersecting
        }
    }
}

/// A tile's bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere from center and radius.
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The sphere enclosing an axis-aligned bounding box.
    #[must_use]
    pub fn from_bounds(bb_min: Vec3, bb_max: Vec3) -> Self {
        Self {
            center: (bb_min + bb_max) / 2.0,
            radius: (bb_max - bb_min).length() / 2.0,
        }
    }

    /// Classify the sphere against a single plane.
    #[must_use]
    pub fn intersect_plane(&self, plane: &Plane) -> Intersection {
        let distance = plane.signed_distance(self.center);
        if distance < -self.radius {
            Intersection::Outside
        } else if distance < self.radius {
            Intersection::Intersecting
        } else {
            Intersection::Inside
        }
    }

    /// Classify the sphere against a plane set, reusing (and updating)
    /// an inherited clip mask.
    ///
    /// Planes the mask already knows to be fully inside are skipped,
    /// and checking stops at the first fully-outside verdict.
    #[must_use]
    pub fn intersect_planes(&self, planes: &[Plane], mut mask: PlaneClipMask) -> PlaneClipMask {
        if !matches!(mask.intersection(), Intersection::Intersecting) {
            return mask;
        }
        for (i, plane) in planes.iter().enumerate() {
            if mask.needs_check(i) {
                let value = self.intersect_plane(plane);
                mask.set(i, value);
                if value == Intersection::Outside {
                    break;
                }
            }
        }
        mask
    }

    /// Distance from `point` to the sphere surface, zero inside.
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        (self.center.distance(point) - self.radius).max(0.0)
    }

    /// Estimated on-screen diameter in pixels.
    ///
    /// `pixel_size_vector` is the per-camera parameter precomputed by
    /// [`CamState::new`]; the estimate is
    /// `radius / |dot(center, psv.xyz) + psv.w|`.
    #[must_use]
    pub fn screen_diameter(&self, pixel_size_vector: Vec4) -> f32 {
        (self.radius
            / (self.center.dot(pixel_size_vector.truncate()) + pixel_size_vector.w))
            .abs()
    }

    /// The sphere transformed by an affine matrix, with the radius
    /// scaled by the largest column scale.
    #[must_use]
    pub fn transformed(&self, transform: Mat4) -> Self {
        let center = transform.transform_point3(self.center);
        let scale = transform.x_axis.truncate().length().max(
            transform
                .y_axis
                .truncate()
                .length()
                .max(transform.z_axis.truncate().length()),
        );
        Self {
            center,
            radius: self.radius * scale,
        }
    }
}

/// Per-camera, per-frame culling state: the six frustum planes, the
/// pixel-size vector, and the camera position in tile coordinates.
#[derive(Debug, Clone, Copy)]
pub struct CamState {
    /// Frustum planes, normals pointing into the frustum.
    pub planes: [Plane; 6],
    /// Opaque screen-size parameter consumed by
    /// [`BoundingSphere::screen_diameter`].
    pub pixel_size_vector: Vec4,
    /// Camera position, for distance-based request priorities.
    pub position: Vec3,
}

impl CamState {
    /// Precompute culling state for one camera.
    ///
    /// `model_view` maps tile coordinates to eye space, so the
    /// resulting planes live in tile coordinates and per-tile tests
    /// need no further transforms.
    #[must_use]
    pub fn new(projection: Mat4, model_view: Mat4, viewport: (u32, u32)) -> Self {
        let planes = frustum_planes(projection * model_view);
        let pixel_size_vector = pixel_size_vector(viewport, projection, model_view);
        let position = model_view.inverse().w_axis.truncate();
        Self {
            planes,
            pixel_size_vector,
            position,
        }
    }
}

/// Extract the six normalized frustum planes from a view-projection
/// matrix (left, right, bottom, top, near, far).
#[must_use]
pub fn frustum_planes(view_projection: Mat4) -> [Plane; 6] {
    let r0 = view_projection.row(0);
    let r1 = view_projection.row(1);
    let r2 = view_projection.row(2);
    let r3 = view_projection.row(3);

    let make = |v: Vec4| Plane::from_coefficients(v.x, v.y, v.z, v.w);
    [
        make(r3 + r0),
        make(r3 - r0),
        make(r3 + r1),
        make(r3 - r1),
        make(r3 + r2),
        make(r3 - r2),
    ]
}

/// Derive the pixel-size vector from the projection and model-view
/// matrices and the viewport size.
///
/// Closed-form fold of the viewport window matrix into the projection's
/// clip-space scaling rows; dotting a point against the result (plus
/// the w term) yields the reciprocal of one pixel's world-space size at
/// that depth.
#[must_use]
pub fn pixel_size_vector(viewport: (u32, u32), projection: Mat4, model_view: Mat4) -> Vec4 {
    let (width, height) = (viewport.0 as f32, viewport.1 as f32);
    let p = projection;
    let m = model_view;

    // Horizontal pixel scaling.
    let p00 = p.row(0).x * width * 0.5;
    let p20_00 = p.row(0).z * width * 0.5 + p.row(3).z * width * 0.5;
    let scale_00 = m.row(0).truncate() * p00 + m.row(2).truncate() * p20_00;

    // Vertical pixel scaling.
    let p10 = p.row(1).y * height * 0.5;
    let p20_10 = p.row(1).z * height * 0.5 + p.row(3).z * height * 0.5;
    let scale_10 = m.row(1).truncate() * p10 + m.row(2).truncate() * p20_10;

    let p23 = p.row(3).z;
    let p33 = p.row(3).w;
    let pixel_size = Vec4::new(
        m.row(2).x * p23,
        m.row(2).y * p23,
        m.row(2).z * p23,
        m.row(2).w * p23 + m.row(3).w * p33,
    );

    let scale_ratio =
        std::f32::consts::FRAC_1_SQRT_2 / (scale_00.length_squared() + scale_10.length_squared()).sqrt();
    pixel_size * scale_ratio
}
