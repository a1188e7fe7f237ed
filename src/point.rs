/// 2D Point (X,Y), or (easting, northing).
pub type Point2 = [f64; 2];

/// 3D Point (X,Y,Z).
pub type Point3 = [f64; 3];

pub trait ToPoint2 {
    fn to_p2(self) -> Point2;
}

impl ToPoint2 for Point2 {
    fn to_p2(self) -> Point2 {
        self
    }
}
impl ToPoint2 for &Point2 {
    fn to_p2(self) -> Point2 {
        *self
    }
}
impl ToPoint2 for Point3 {
    fn to_p2(self) -> Point2 {
        let [x, y, _] = self;
        [x, y]
    }
}
impl ToPoint2 for &Point3 {
    fn to_p2(self) -> Point2 {
        (*self).to_p2()
    }
}

/// Plan distance between two points.
pub fn dist_xy(a: impl ToPoint2, b: impl ToPoint2) -> f64 {
    let [ax, ay] = a.to_p2();
    let [bx, by] = b.to_p2();
    (bx - ax).hypot(by - ay)
}

/// Plan bearing from `from` to `to`, in degrees clockwise from grid north.
///
/// The result is in the range `(-180, 180]`, so due east is `90` and due west is `-90`.
/// Coincident points return `0`.
pub fn bearing(from: impl ToPoint2, to: impl ToPoint2) -> f64 {
    let [ax, ay] = from.to_p2();
    let [bx, by] = to.to_p2();
    (bx - ax).atan2(by - ay).to_degrees()
}

/// Smallest signed difference `a - b` between two bearings, wrapped into `[-180, 180)`.
pub fn bearing_diff(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}
