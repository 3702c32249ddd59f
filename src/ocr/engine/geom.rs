use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Point {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Point {
    pub(crate) fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rotated rectangle; `angle` is the direction of the `width` edge in degrees,
/// measured in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy)]
pub(crate) struct MinAreaRect {
    pub(crate) center: Point,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) angle: f32,
}

fn cross(o: &Point, a: &Point, b: &Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Andrew's monotone chain. Collinear points are dropped.
pub(crate) fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Rotating calipers over the convex hull. `None` when fewer than three
/// distinct points are supplied or they are all collinear.
pub(crate) fn min_area_rect(points: &[Point]) -> Option<MinAreaRect> {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return None;
    }

    let n = hull.len();
    let mut best: Option<(f32, MinAreaRect)> = None;
    for i in 0..n {
        let j = (i + 1) % n;
        let edge_x = hull[j].x - hull[i].x;
        let edge_y = hull[j].y - hull[i].y;
        let len = (edge_x * edge_x + edge_y * edge_y).sqrt();
        if len < f32::EPSILON {
            continue;
        }
        let nx = edge_x / len;
        let ny = edge_y / len;
        let px = -ny;
        let py = nx;

        let mut min_n = f32::MAX;
        let mut max_n = f32::MIN;
        let mut min_p = f32::MAX;
        let mut max_p = f32::MIN;
        for point in &hull {
            let dx = point.x - hull[i].x;
            let dy = point.y - hull[i].y;
            let proj_n = nx * dx + ny * dy;
            let proj_p = px * dx + py * dy;
            min_n = min_n.min(proj_n);
            max_n = max_n.max(proj_n);
            min_p = min_p.min(proj_p);
            max_p = max_p.max(proj_p);
        }

        let width = max_n - min_n;
        let height = max_p - min_p;
        let area = width * height;
        if best.as_ref().is_some_and(|(best_area, _)| area >= *best_area) {
            continue;
        }
        let center_n = (min_n + max_n) / 2.0;
        let center_p = (min_p + max_p) / 2.0;
        let rect = MinAreaRect {
            center: Point::new(
                hull[i].x + center_n * nx + center_p * px,
                hull[i].y + center_n * ny + center_p * py,
            ),
            width,
            height,
            angle: ny.atan2(nx) * 180.0 / PI,
        };
        best = Some((area, rect));
    }
    best.map(|(_, rect)| rect)
}

/// Folds a rectangle orientation into (-45, 45] degrees.
pub(crate) fn normalize_skew(angle: f32) -> f32 {
    let mut folded = angle % 90.0;
    if folded > 45.0 {
        folded -= 90.0;
    } else if folded <= -45.0 {
        folded += 90.0;
    }
    folded
}
