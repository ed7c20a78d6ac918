//! 求交引擎
//!
//! 计算任意两个图元之间的交点：
//! - 线段-线段：参数方程线性求解（3D，要求共面）
//! - 线段-椭圆：把线段变换到椭圆的单位圆空间求二次方程的根
//! - 椭圆-椭圆：在第一个椭圆的单位圆空间中求解；第二个椭圆在该空间中
//!   仍是圆时化为圆-圆求交，否则采样 + 二分求根
//!
//! 所有结果在容差内去重，相切时只返回一个点。

use crate::math::{Point3, Vector3, VectorExt, EPSILON};
use crate::primitive::{Primitive, PrimitiveEllipse, PrimitiveLine, PrimitivePoint};
use std::f64::consts::TAU;
use tracing::trace;

/// 交点合并容差
pub const MERGE_TOLERANCE: f64 = 1e-8;

/// 线段参数范围容差
const PARAMETER_TOLERANCE: f64 = 1e-9;

/// 单位圆空间中的距离容差
const UNIT_TOLERANCE: f64 = 1e-8;

/// 圆-圆求交中半弦长平方的容差，小于它时视为相切
const TANGENT_TOLERANCE: f64 = 1e-12;

/// 一般椭圆-椭圆求交的采样数
const ELLIPSE_SAMPLES: usize = 720;

/// 二分迭代次数
const BISECTION_STEPS: usize = 64;

/// 求两个图元的交点
pub fn intersect(a: &Primitive, b: &Primitive) -> Vec<Point3> {
    let points = match (a, b) {
        (Primitive::Line(l1), Primitive::Line(l2)) => line_line(l1, l2, true),
        (Primitive::Line(l), Primitive::Ellipse(e)) | (Primitive::Ellipse(e), Primitive::Line(l)) => {
            line_ellipse(l, e, true)
        }
        (Primitive::Ellipse(e1), Primitive::Ellipse(e2)) => ellipse_ellipse(e1, e2),
        (Primitive::Point(p), other) | (other, Primitive::Point(p)) => point_on(p, other),
        (Primitive::Text(_), _) | (_, Primitive::Text(_)) => Vec::new(),
    };
    let points = dedup(points);
    trace!("Intersect {:?} with {:?}: {} point(s)", a.kind(), b.kind(), points.len());
    points
}

/// 两组图元之间的全部交点（已去重）
pub fn intersect_all(a: &[Primitive], b: &[Primitive]) -> Vec<Point3> {
    let points = a
        .iter()
        .flat_map(|pa| b.iter().flat_map(move |pb| intersect(pa, pb)))
        .collect();
    dedup(points)
}

/// 把 `line` 视为无限长直线，与有界图元求交（用于延伸）
pub fn intersect_unbounded_line(line: &PrimitiveLine, other: &Primitive) -> Vec<Point3> {
    let points = match other {
        Primitive::Line(l) => line_line(line, l, false),
        Primitive::Ellipse(e) => line_ellipse(line, e, false),
        Primitive::Point(p) => {
            if distance_to_infinite_line(line, &p.location) <= UNIT_TOLERANCE * line.length().max(1.0) {
                vec![p.location]
            } else {
                Vec::new()
            }
        }
        Primitive::Text(_) => Vec::new(),
    };
    dedup(points)
}

/// 容差内去重，保留首次出现的点
pub fn dedup(points: Vec<Point3>) -> Vec<Point3> {
    let mut result: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        let duplicate = result
            .iter()
            .any(|q| (p - q).norm() <= MERGE_TOLERANCE * (1.0 + q.coords.norm()));
        if !duplicate {
            result.push(p);
        }
    }
    result
}

fn in_unit_range(t: f64) -> bool {
    (-PARAMETER_TOLERANCE..=1.0 + PARAMETER_TOLERANCE).contains(&t)
}

fn distance_to_infinite_line(line: &PrimitiveLine, point: &Point3) -> f64 {
    let t = line.parameter_of(point);
    (point - line.point_at(t)).norm()
}

// ============================================================================
// 线段-线段
// ============================================================================

/// `first_bounded` 为 false 时第一条线视为无限长
fn line_line(first: &PrimitiveLine, second: &PrimitiveLine, first_bounded: bool) -> Vec<Point3> {
    let d1 = first.direction();
    let d2 = second.direction();
    if d1.is_zero_vector() || d2.is_zero_vector() {
        return Vec::new();
    }
    // 平行（包括共线重叠）不产生交点
    if d1.normalize().is_parallel_to(&d2.normalize()) {
        return Vec::new();
    }

    let n = d1.cross(&d2);
    let n2 = n.norm_squared();
    let r = second.p1 - first.p1;

    // 异面直线
    let scale = d1.norm().max(d2.norm()).max(1.0);
    if r.dot(&n).abs() / n2.sqrt() > UNIT_TOLERANCE * scale {
        return Vec::new();
    }

    let t = r.cross(&d2).dot(&n) / n2;
    let u = r.cross(&d1).dot(&n) / n2;
    if (first_bounded && !in_unit_range(t)) || !in_unit_range(u) {
        return Vec::new();
    }
    vec![first.point_at(t)]
}

// ============================================================================
// 线段-椭圆
// ============================================================================

/// `line_bounded` 为 false 时线段视为无限长直线
fn line_ellipse(line: &PrimitiveLine, ellipse: &PrimitiveEllipse, line_bounded: bool) -> Vec<Point3> {
    let Some(to_unit) = ellipse.from_unit_circle() else {
        return Vec::new();
    };
    let p = to_unit.transform_point(&line.p1);
    let q = to_unit.transform_point(&line.p2);
    let d = q - p;

    let mut parameters = Vec::with_capacity(2);
    if p.z.abs() <= UNIT_TOLERANCE && q.z.abs() <= UNIT_TOLERANCE {
        // 直线位于椭圆平面内：|P + tD|² = 1
        let a = d.x * d.x + d.y * d.y;
        if a < EPSILON {
            return Vec::new();
        }
        // 以最近点到圆心的距离判断相切，与线段长度无关
        let t0 = -(p.x * d.x + p.y * d.y) / a;
        let closest = p + d * t0;
        let distance = (closest.x * closest.x + closest.y * closest.y).sqrt();
        if (distance - 1.0).abs() <= UNIT_TOLERANCE {
            parameters.push(t0);
        } else if distance < 1.0 {
            let half_chord = (1.0 - distance * distance).sqrt() / a.sqrt();
            parameters.push(t0 - half_chord);
            parameters.push(t0 + half_chord);
        }
    } else if d.z.abs() > EPSILON {
        // 直线穿过椭圆平面
        let t = -p.z / d.z;
        let hit = p + d * t;
        let radius = (hit.x * hit.x + hit.y * hit.y).sqrt();
        if (radius - 1.0).abs() <= UNIT_TOLERANCE {
            parameters.push(t);
        }
    }

    parameters
        .into_iter()
        .filter(|t| !line_bounded || in_unit_range(*t))
        .filter_map(|t| {
            let unit = p + d * t;
            let angle = unit.y.atan2(unit.x).to_degrees();
            ellipse.contains_angle(angle).then(|| line.point_at(t))
        })
        .collect()
}

// ============================================================================
// 椭圆-椭圆
// ============================================================================

fn ellipse_ellipse(first: &PrimitiveEllipse, second: &PrimitiveEllipse) -> Vec<Point3> {
    let Some(to_unit) = first.from_unit_circle() else {
        return Vec::new();
    };
    let from_unit = first.unit_circle_projection();

    // 第二个椭圆在第一个椭圆单位圆空间中的参数形式：C + U cos φ + V sin φ
    let c = to_unit.transform_point(&second.center());
    let u = to_unit.transform_vector(&second.major_axis());
    let v = to_unit.transform_vector(&second.minor_axis());
    let plane_normal = u.cross(&v);

    // (第二个椭圆的参数角, 单位空间中的点)
    let candidates: Vec<(f64, Point3)> = if !plane_normal.normalize().is_parallel_to(&Vector3::z()) {
        crossing_planes(&c, &u, &v)
    } else if c.z.abs() > UNIT_TOLERANCE {
        // 平行平面
        Vec::new()
    } else if is_circle_in_plane(&u, &v) {
        circle_circle(&c, u.norm())
            .into_iter()
            .filter_map(|unit| {
                let world = from_unit.transform_point(&unit);
                second.angle_of(&world).map(|phi| (phi.to_radians(), unit))
            })
            .collect()
    } else {
        coplanar_general(&c, &u, &v)
    };

    candidates
        .into_iter()
        .filter(|(phi, unit)| {
            first.contains_angle(unit.y.atan2(unit.x).to_degrees())
                && second.contains_angle(phi.to_degrees())
        })
        .map(|(_, unit)| from_unit.transform_point(&unit))
        .collect()
}

fn point_on_second(c: &Point3, u: &Vector3, v: &Vector3, phi: f64) -> Point3 {
    c + u * phi.cos() + v * phi.sin()
}

/// 第二个椭圆所在平面与单位圆平面相交
fn crossing_planes(c: &Point3, u: &Vector3, v: &Vector3) -> Vec<(f64, Point3)> {
    // 解 c.z + u.z cos φ + v.z sin φ = 0
    let r = (u.z * u.z + v.z * v.z).sqrt();
    if r < EPSILON {
        return Vec::new();
    }
    let ratio = -c.z / r;
    if ratio.abs() > 1.0 + UNIT_TOLERANCE {
        return Vec::new();
    }
    let alpha = v.z.atan2(u.z);
    let delta = ratio.clamp(-1.0, 1.0).acos();
    let mut angles = vec![alpha + delta];
    if delta > EPSILON {
        angles.push(alpha - delta);
    }

    angles
        .into_iter()
        .map(|phi| (phi, point_on_second(c, u, v, phi)))
        .filter(|(_, p)| ((p.x * p.x + p.y * p.y).sqrt() - 1.0).abs() <= UNIT_TOLERANCE * 10.0)
        .collect()
}

/// 平面内的两个共轭半轴是否构成圆
fn is_circle_in_plane(u: &Vector3, v: &Vector3) -> bool {
    let scale = u.norm().max(v.norm()).max(EPSILON);
    (u.norm() - v.norm()).abs() <= 1e-9 * scale && u.dot(v).abs() <= 1e-9 * scale * scale
}

/// 单位圆与圆心为 `c`、半径为 `r` 的圆求交（z = 0 平面）
fn circle_circle(c: &Point3, r: f64) -> Vec<Point3> {
    let d = (c.x * c.x + c.y * c.y).sqrt();
    if d < EPSILON {
        // 同心（含重合）
        return Vec::new();
    }
    if d > 1.0 + r + UNIT_TOLERANCE || d < (1.0 - r).abs() - UNIT_TOLERANCE {
        return Vec::new();
    }
    let a = (1.0 - r * r + d * d) / (2.0 * d);
    let h2 = 1.0 - a * a;
    let dir = Vector3::new(c.x / d, c.y / d, 0.0);
    let base = Point3::origin() + dir * a;
    if h2 <= TANGENT_TOLERANCE {
        return vec![base];
    }
    let h = h2.sqrt();
    let perp = Vector3::new(-dir.y, dir.x, 0.0);
    vec![base + perp * h, base - perp * h]
}

/// 共面的一般椭圆：f(φ) = |C + U cos φ + V sin φ|² - 1 的根
fn coplanar_general(c: &Point3, u: &Vector3, v: &Vector3) -> Vec<(f64, Point3)> {
    let f = |phi: f64| {
        let p = point_on_second(c, u, v, phi);
        p.x * p.x + p.y * p.y - 1.0
    };

    let step = TAU / ELLIPSE_SAMPLES as f64;
    let samples: Vec<f64> = (0..ELLIPSE_SAMPLES).map(|i| f(i as f64 * step)).collect();

    // 重合的椭圆
    if samples.iter().all(|value| value.abs() <= UNIT_TOLERANCE) {
        return Vec::new();
    }

    let mut roots = Vec::new();
    for i in 0..ELLIPSE_SAMPLES {
        let j = (i + 1) % ELLIPSE_SAMPLES;
        let (lo, hi) = (i as f64 * step, (i + 1) as f64 * step);
        let (f_lo, f_hi) = (samples[i], samples[j]);

        if f_lo == 0.0 {
            roots.push(lo);
        } else if f_lo * f_hi < 0.0 {
            roots.push(bisect(&f, lo, hi, f_lo));
        } else {
            // 相切：|f| 的局部极小值接近 0
            let prev = samples[(i + ELLIPSE_SAMPLES - 1) % ELLIPSE_SAMPLES];
            if prev * f_lo > 0.0 && f_lo.abs() <= prev.abs() && f_lo.abs() <= f_hi.abs() {
                let phi = minimize_abs(&f, lo - step, lo + step);
                if f(phi).abs() <= UNIT_TOLERANCE {
                    roots.push(phi);
                }
            }
        }
    }

    roots
        .into_iter()
        .map(|phi| (phi, point_on_second(c, u, v, phi)))
        .collect()
}

fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, mut f_lo: f64) -> f64 {
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    0.5 * (lo + hi)
}

/// 三分法求 |f| 的极小值点
fn minimize_abs(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    for _ in 0..BISECTION_STEPS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if f(m1).abs() < f(m2).abs() {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    0.5 * (lo + hi)
}

// ============================================================================
// 点
// ============================================================================

fn point_on(point: &PrimitivePoint, other: &Primitive) -> Vec<Point3> {
    let hit = match other {
        Primitive::Line(l) => l.contains_point(&point.location),
        Primitive::Ellipse(e) => e.contains_point(&point.location),
        Primitive::Point(p) => (p.location - point.location).norm() <= MERGE_TOLERANCE,
        Primitive::Text(_) => false,
    };
    if hit {
        vec![point.location]
    } else {
        Vec::new()
    }
}
