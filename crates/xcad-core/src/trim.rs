//! 修剪/延伸
//!
//! 修剪：以边界图元与目标实体的交点为切点，去掉拾取点所在的一段，
//! 结果表示为 (被移除的实体, 新增的实体)。
//! 延伸：把线段或圆弧离拾取点最近的一端延长到最近的边界交点。
//!
//! 没有交点或无法确定切点时返回空结果，不是错误。

use crate::drawing::Drawing;
use crate::entity::Entity;
use crate::error::DocumentError;
use crate::geometry::{Arc, Circle, Ellipse, Geometry, Line, LineUpdate};
use crate::intersection::{intersect_all, intersect_unbounded_line};
use crate::math::{between_narrow, correct_angle_degrees, Point3};
use crate::primitive::{Primitive, PrimitiveEllipse, ANGLE_TOLERANCE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 选中的实体及拾取点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntity {
    pub entity: Entity,
    pub selection_point: Point3,
}

impl SelectedEntity {
    pub fn new(entity: Entity, selection_point: Point3) -> Self {
        Self {
            entity,
            selection_point,
        }
    }
}

/// 编辑结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditResult {
    pub removed: Vec<Entity>,
    pub added: Vec<Entity>,
}

impl EditResult {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// 把结果应用到图纸上，得到新的图纸
    ///
    /// 新增实体放入第一个被移除实体所在的图层，没有被移除实体时放入当前图层。
    pub fn apply(&self, drawing: &Drawing) -> Result<Drawing, DocumentError> {
        let target = self
            .removed
            .first()
            .and_then(|e| drawing.containing_layer(e.id()))
            .map(|layer| layer.name().to_string())
            .unwrap_or_else(|| drawing.current_layer_name().to_string());

        let mut result = drawing.clone();
        for entity in &self.removed {
            result = result.remove_entity(entity.id())?;
        }
        for entity in &self.added {
            result = result.add_entity(&target, entity.clone())?;
        }
        Ok(result)
    }

    fn replace(original: &Entity, added: Vec<Entity>) -> Self {
        Self {
            removed: vec![original.clone()],
            added,
        }
    }
}

// ============================================================================
// 修剪
// ============================================================================

/// 用边界图元修剪选中的实体
pub fn trim(selected: &SelectedEntity, boundaries: &[Primitive]) -> EditResult {
    let entity = &selected.entity;
    let points = intersect_all(&entity.primitives(), boundaries);
    if points.is_empty() {
        debug!("Trim {}: no intersections", entity.id());
        return EditResult::default();
    }

    let pivot = &selected.selection_point;
    let result = match entity.geometry() {
        Geometry::Line(line) => trim_line(entity, line, pivot, &points),
        Geometry::Circle(circle) => trim_circle(entity, circle, pivot, &points),
        Geometry::Arc(arc) => trim_bounded(&arc.primitive(), pivot, &points)
            .map(|(lesser, greater)| {
                let pieces = [
                    lesser.map(|end| arc.with_angles(arc.start_angle(), end)),
                    greater.map(|start| arc.with_angles(start, arc.end_angle())),
                ];
                EditResult::replace(
                    entity,
                    pieces.into_iter().flatten().map(|a| entity.with_geometry(a)).collect(),
                )
            })
            .unwrap_or_default(),
        Geometry::Ellipse(ellipse) => trim_ellipse(entity, ellipse, pivot, &points),
        _ => {
            debug!("Trim {}: {:?} is not supported", entity.id(), entity.kind());
            EditResult::default()
        }
    };
    debug!(
        "Trim {}: {} intersection(s), removed {}, added {}",
        entity.id(),
        points.len(),
        result.removed.len(),
        result.added.len()
    );
    result
}

/// 以到 P1 的距离平方作为一维坐标，在拾取点两侧各取最近的交点
fn trim_line(entity: &Entity, line: &Line, pivot: &Point3, points: &[Point3]) -> EditResult {
    let p1 = line.p1();
    let pivot_dist = (pivot - p1).norm_squared();
    let full_dist = (line.p2() - p1).norm_squared();

    let closest = |side: &dyn Fn(f64) -> bool| {
        points
            .iter()
            .filter(|p| side((*p - p1).norm_squared()))
            .min_by(|a, b| {
                (*a - pivot)
                    .norm_squared()
                    .total_cmp(&(*b - pivot).norm_squared())
            })
            .copied()
    };
    let left = closest(&|d| between_narrow(0.0, pivot_dist, d));
    let right = closest(&|d| between_narrow(pivot_dist, full_dist, d));

    if left.is_none() && right.is_none() {
        return EditResult::default();
    }

    let mut added = Vec::with_capacity(2);
    if let Some(point) = left {
        added.push(entity.with_geometry(line.update(LineUpdate {
            p2: Some(point),
            ..Default::default()
        })));
    }
    if let Some(point) = right {
        added.push(entity.with_geometry(line.update(LineUpdate {
            p1: Some(point),
            ..Default::default()
        })));
    }
    EditResult::replace(entity, added)
}

/// 交点与拾取点在单位圆空间中的参数角
struct CurveAngles {
    /// 升序排列的切点角度
    angles: Vec<f64>,
    selection: f64,
}

impl CurveAngles {
    /// 闭合曲线以外，与当前起止角相同的角度不构成新的切点
    fn new(primitive: &PrimitiveEllipse, pivot: &Point3, points: &[Point3]) -> Option<Self> {
        let selection = primitive.angle_of(pivot)?;
        let closed = primitive.is_closed();
        let mut angles: Vec<f64> = points
            .iter()
            .filter_map(|p| primitive.angle_of(p))
            .filter(|a| {
                closed
                    || !(same_angle(*a, primitive.start_angle())
                        || same_angle(*a, primitive.end_angle()))
            })
            .collect();
        angles.sort_by(f64::total_cmp);
        angles.dedup_by(|a, b| same_angle(*a, *b));
        Some(Self { angles, selection })
    }

    /// 拾取角前后相邻的两个切点角 (前一个, 后一个)
    fn straddling(&self) -> Option<(f64, f64)> {
        if self.angles.len() < 2 {
            return None;
        }
        let below = self.angles.iter().filter(|a| **a < self.selection).count();
        let previous = if below == 0 { self.angles.len() - 1 } else { below - 1 };
        let next = (previous + 1) % self.angles.len();
        Some((self.angles[previous], self.angles[next]))
    }
}

fn same_angle(a: f64, b: f64) -> bool {
    let diff = correct_angle_degrees(a - b);
    diff < ANGLE_TOLERANCE || diff > 360.0 - ANGLE_TOLERANCE
}

/// 满周圆：保留从后一个切点到前一个切点的圆弧（至少需要两个切点）
fn trim_circle(entity: &Entity, circle: &Circle, pivot: &Point3, points: &[Point3]) -> EditResult {
    let Some(angles) = CurveAngles::new(&circle.primitive(), pivot, points) else {
        return EditResult::default();
    };
    match angles.straddling() {
        Some((previous, next)) => EditResult::replace(
            entity,
            vec![entity.with_geometry(Arc::from_circle(circle, next, previous))],
        ),
        None => EditResult::default(),
    }
}

fn trim_ellipse(entity: &Entity, ellipse: &Ellipse, pivot: &Point3, points: &[Point3]) -> EditResult {
    let primitive = ellipse.primitive();
    if primitive.is_closed() {
        let Some(angles) = CurveAngles::new(&primitive, pivot, points) else {
            return EditResult::default();
        };
        return match angles.straddling() {
            Some((previous, next)) => EditResult::replace(
                entity,
                vec![entity.with_geometry(ellipse.with_angles(next, previous))],
            ),
            None => EditResult::default(),
        };
    }

    trim_bounded(&primitive, pivot, points)
        .map(|(lesser, greater)| {
            let pieces = [
                lesser.map(|end| ellipse.with_angles(ellipse.start_angle(), end)),
                greater.map(|start| ellipse.with_angles(start, ellipse.end_angle())),
            ];
            EditResult::replace(
                entity,
                pieces.into_iter().flatten().map(|e| entity.with_geometry(e)).collect(),
            )
        })
        .unwrap_or_default()
}

/// 有界曲线：返回 (新的终止角, 新的起始角)，两者都没有时返回 `None`
///
/// 起始角大于终止角（跨越 0°）时，把不小于起始角的角度减去 360 使比较单调。
fn trim_bounded(
    primitive: &PrimitiveEllipse,
    pivot: &Point3,
    points: &[Point3],
) -> Option<(Option<f64>, Option<f64>)> {
    let angles = CurveAngles::new(primitive, pivot, points)?;
    let start = primitive.start_angle();
    let wraps = start > primitive.end_angle();
    let normalize = |a: f64| if wraps && a >= start { a - 360.0 } else { a };

    let selection = normalize(angles.selection);
    let normalized: Vec<f64> = angles.angles.iter().map(|a| normalize(*a)).collect();

    let lesser = normalized
        .iter()
        .copied()
        .filter(|a| *a < selection)
        .max_by(f64::total_cmp)
        .map(correct_angle_degrees);
    let greater = normalized
        .iter()
        .copied()
        .filter(|a| *a > selection)
        .min_by(f64::total_cmp)
        .map(correct_angle_degrees);

    if lesser.is_none() && greater.is_none() {
        None
    } else {
        Some((lesser, greater))
    }
}

// ============================================================================
// 延伸
// ============================================================================

/// 把选中实体靠近拾取点的一端延伸到最近的边界
pub fn extend(selected: &SelectedEntity, boundaries: &[Primitive]) -> EditResult {
    let entity = &selected.entity;
    let pivot = &selected.selection_point;
    let result = match entity.geometry() {
        Geometry::Line(line) => extend_line(entity, line, pivot, boundaries),
        Geometry::Arc(arc) => extend_curve(&arc.primitive(), pivot, boundaries)
            .map(|(s, e)| EditResult::replace(entity, vec![entity.with_geometry(arc.with_angles(s, e))]))
            .unwrap_or_default(),
        Geometry::Ellipse(ellipse) if !ellipse.is_closed() => {
            extend_curve(&ellipse.primitive(), pivot, boundaries)
                .map(|(s, e)| {
                    EditResult::replace(entity, vec![entity.with_geometry(ellipse.with_angles(s, e))])
                })
                .unwrap_or_default()
        }
        _ => {
            debug!("Extend {}: {:?} is not supported", entity.id(), entity.kind());
            EditResult::default()
        }
    };
    debug!(
        "Extend {}: removed {}, added {}",
        entity.id(),
        result.removed.len(),
        result.added.len()
    );
    result
}

fn extend_line(entity: &Entity, line: &Line, pivot: &Point3, boundaries: &[Primitive]) -> EditResult {
    let primitive = line.primitive();
    let extend_end = (pivot - line.p2()).norm_squared() < (pivot - line.p1()).norm_squared();
    let tolerance = 1e-9;

    let parameters = boundaries
        .iter()
        .flat_map(|b| intersect_unbounded_line(&primitive, b))
        .map(|p| primitive.parameter_of(&p));

    let target = if extend_end {
        parameters.filter(|t| *t > 1.0 + tolerance).min_by(f64::total_cmp)
    } else {
        parameters.filter(|t| *t < -tolerance).max_by(f64::total_cmp)
    };

    match target {
        Some(t) => {
            let point = primitive.point_at(t);
            let changes = if extend_end {
                LineUpdate {
                    p2: Some(point),
                    ..Default::default()
                }
            } else {
                LineUpdate {
                    p1: Some(point),
                    ..Default::default()
                }
            };
            EditResult::replace(entity, vec![entity.with_geometry(line.update(changes))])
        }
        None => EditResult::default(),
    }
}

/// 返回延伸后的 (起始角, 终止角)
fn extend_curve(
    primitive: &PrimitiveEllipse,
    pivot: &Point3,
    boundaries: &[Primitive],
) -> Option<(f64, f64)> {
    let start = primitive.start_angle();
    let end = primitive.end_angle();
    let full: Primitive = primitive.with_angles(0.0, 360.0).into();
    let gap: Vec<f64> = intersect_all(&[full], boundaries)
        .iter()
        .filter_map(|p| primitive.angle_of(p))
        .filter(|a| !primitive.contains_angle(*a))
        .collect();

    let extend_end =
        (pivot - primitive.end_point()).norm_squared() < (pivot - primitive.start_point()).norm_squared();
    if extend_end {
        // 从终止角逆时针向前找最近的交点
        gap.iter()
            .copied()
            .min_by(|a, b| {
                correct_angle_degrees(a - end).total_cmp(&correct_angle_degrees(b - end))
            })
            .map(|a| (start, a))
    } else {
        gap.iter()
            .copied()
            .min_by(|a, b| {
                correct_angle_degrees(start - a).total_cmp(&correct_angle_degrees(start - b))
            })
            .map(|a| (a, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::IndexedColor;
    use crate::layer::Layer;
    use crate::math::{approx_eq, Vector3};
    use crate::primitive::PrimitiveLine;

    fn line_entity(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
        Entity::new(Line::new(
            Point3::new(x1, y1, 0.0),
            Point3::new(x2, y2, 0.0),
            IndexedColor::Auto,
        ))
    }

    fn boundary(x1: f64, y1: f64, x2: f64, y2: f64) -> Primitive {
        PrimitiveLine::new(Point3::new(x1, y1, 0.0), Point3::new(x2, y2, 0.0)).into()
    }

    fn arc_of(entity: &Entity) -> &Arc {
        match entity.geometry() {
            Geometry::Arc(arc) => arc,
            other => panic!("expected arc, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_trim_line_keeps_far_side() {
        let line = line_entity(0.0, 0.0, 2.0, 0.0);
        let selected = SelectedEntity::new(line.clone(), Point3::new(0.0, 0.0, 0.0));
        let result = trim(&selected, &[boundary(1.0, -1.0, 1.0, 1.0)]);

        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.removed[0].id(), line.id());
        assert_eq!(result.added.len(), 1);
        let expected = line_entity(1.0, 0.0, 2.0, 0.0);
        assert!(result.added[0].equivalent_to(&expected));
    }

    #[test]
    fn test_trim_line_between_two_boundaries() {
        let line = line_entity(0.0, 0.0, 4.0, 0.0);
        let selected = SelectedEntity::new(line, Point3::new(2.0, 0.0, 0.0));
        let result = trim(
            &selected,
            &[boundary(1.0, -1.0, 1.0, 1.0), boundary(3.0, -1.0, 3.0, 1.0)],
        );
        assert_eq!(result.added.len(), 2);
        assert!(result.added[0].equivalent_to(&line_entity(0.0, 0.0, 1.0, 0.0)));
        assert!(result.added[1].equivalent_to(&line_entity(3.0, 0.0, 4.0, 0.0)));
    }

    #[test]
    fn test_trim_without_intersections_is_noop() {
        let line = line_entity(0.0, 0.0, 2.0, 0.0);
        let selected = SelectedEntity::new(line, Point3::new(0.5, 0.0, 0.0));
        let result = trim(&selected, &[boundary(5.0, -1.0, 5.0, 1.0)]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_trim_at_endpoint_intersection_is_noop() {
        // 边界恰好经过线段端点，不构成新的切点
        let line = line_entity(0.0, 0.0, 2.0, 0.0);
        let selected = SelectedEntity::new(line, Point3::new(1.0, 0.0, 0.0));
        let result = trim(&selected, &[boundary(2.0, -1.0, 2.0, 1.0)]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_trim_circle_to_half_arc() {
        let circle = Entity::new(
            Circle::new(Point3::origin(), 1.0, Vector3::z(), IndexedColor::Auto).unwrap(),
        );
        let selected = SelectedEntity::new(circle, Point3::new(0.0, -1.0, 0.0));
        let result = trim(&selected, &[boundary(-1.0, 0.0, 1.0, 0.0)]);

        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.added.len(), 1);
        let arc = arc_of(&result.added[0]);
        assert!(approx_eq(arc.start_angle(), 0.0));
        assert!(approx_eq(arc.end_angle(), 180.0));
        assert!(approx_eq(arc.radius(), 1.0));
    }

    #[test]
    fn test_trim_circle_needs_two_cuts() {
        let circle = Entity::new(
            Circle::new(Point3::origin(), 1.0, Vector3::z(), IndexedColor::Auto).unwrap(),
        );
        let selected = SelectedEntity::new(circle, Point3::new(0.0, -1.0, 0.0));
        // 只在 (1, 0) 处相交一次
        let result = trim(&selected, &[boundary(1.0, 0.0, 2.0, 0.0)]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_trim_arc_one_side() {
        let arc = Entity::new(
            Arc::new(Point3::origin(), 1.0, 0.0, 180.0, Vector3::z(), IndexedColor::Auto).unwrap(),
        );
        // 在 90° 处切断，拾取 135° 一侧
        let selected = SelectedEntity::new(arc, Point3::new(-0.7, 0.7, 0.0));
        let result = trim(&selected, &[boundary(0.0, 0.0, 0.0, 2.0)]);
        assert_eq!(result.added.len(), 1);
        let trimmed = arc_of(&result.added[0]);
        assert!(approx_eq(trimmed.start_angle(), 0.0));
        assert!(approx_eq(trimmed.end_angle(), 90.0));
    }

    #[test]
    fn test_trim_wrapping_arc_both_sides() {
        // 跨越 0° 的圆弧 270° → 90°，在 315° 和 45° 处切断，拾取 0°
        let arc = Entity::new(
            Arc::new(Point3::origin(), 1.0, 270.0, 90.0, Vector3::z(), IndexedColor::Auto).unwrap(),
        );
        let selected = SelectedEntity::new(arc, Point3::new(1.0, 0.0, 0.0));
        let s = 0.5f64.sqrt();
        let result = trim(
            &selected,
            &[boundary(0.0, 0.0, 2.0 * s, 2.0 * s), boundary(0.0, 0.0, 2.0 * s, -2.0 * s)],
        );
        assert_eq!(result.added.len(), 2);
        let first = arc_of(&result.added[0]);
        let second = arc_of(&result.added[1]);
        assert!(approx_eq(first.start_angle(), 270.0));
        assert!((first.end_angle() - 315.0).abs() < 1e-9);
        assert!((second.start_angle() - 45.0).abs() < 1e-9);
        assert!(approx_eq(second.end_angle(), 90.0));
    }

    fn ellipse_of(entity: &Entity) -> &Ellipse {
        match entity.geometry() {
            Geometry::Ellipse(ellipse) => ellipse,
            other => panic!("expected ellipse, got {:?}", other.kind()),
        }
    }

    /// x²/4 + y² = 1 上参数角为 `start`..`end` 的椭圆（弧）
    fn ellipse_entity(start: f64, end: f64) -> Entity {
        Entity::new(
            Ellipse::new(
                Point3::origin(),
                Vector3::new(2.0, 0.0, 0.0),
                0.5,
                start,
                end,
                Vector3::z(),
                IndexedColor::Auto,
            )
            .unwrap(),
        )
    }

    fn ellipse_point(degrees: f64) -> Point3 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point3::new(2.0 * cos, sin, 0.0)
    }

    #[test]
    fn test_trim_closed_ellipse_to_arc() {
        let selected = SelectedEntity::new(ellipse_entity(0.0, 360.0), Point3::new(2.0, 0.0, 0.0));
        let result = trim(&selected, &[boundary(0.0, -2.0, 0.0, 2.0)]);

        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.added.len(), 1);
        let trimmed = ellipse_of(&result.added[0]);
        assert!((trimmed.start_angle() - 90.0).abs() < 1e-9);
        assert!((trimmed.end_angle() - 270.0).abs() < 1e-9);
        assert!(approx_eq(trimmed.minor_axis_ratio(), 0.5));
        assert!(!trimmed.is_closed());
    }

    #[test]
    fn test_trim_elliptical_arc_both_sides() {
        // 从中心出发的两条射线在参数角 45° 和 135° 处切断 0° → 180° 的椭圆弧
        let cut_45 = ellipse_point(45.0);
        let cut_135 = ellipse_point(135.0);
        let boundaries = [
            boundary(0.0, 0.0, 2.0 * cut_45.x, 2.0 * cut_45.y),
            boundary(0.0, 0.0, 2.0 * cut_135.x, 2.0 * cut_135.y),
        ];
        let arc = ellipse_entity(0.0, 180.0);

        let result = trim(&SelectedEntity::new(arc.clone(), ellipse_point(90.0)), &boundaries);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.added.len(), 2);
        let first = ellipse_of(&result.added[0]);
        let second = ellipse_of(&result.added[1]);
        assert!(approx_eq(first.start_angle(), 0.0));
        assert!((first.end_angle() - 45.0).abs() < 1e-9);
        assert!((second.start_angle() - 135.0).abs() < 1e-9);
        assert!(approx_eq(second.end_angle(), 180.0));

        // 拾取起点一侧时只剩一段
        let result = trim(&SelectedEntity::new(arc, ellipse_point(10.0)), &boundaries);
        assert_eq!(result.added.len(), 1);
        let remaining = ellipse_of(&result.added[0]);
        assert!((remaining.start_angle() - 45.0).abs() < 1e-9);
        assert!(approx_eq(remaining.end_angle(), 180.0));
    }

    #[test]
    fn test_extend_elliptical_arc_end() {
        let arc = ellipse_entity(0.0, 90.0);
        // 拾取点靠近终点 (0, 1)，边界为负X轴，与椭圆交于 (-2, 0)
        let selected = SelectedEntity::new(arc, Point3::new(0.1, 1.0, 0.0));
        let result = extend(&selected, &[boundary(0.0, 0.0, -3.0, 0.0)]);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.added.len(), 1);
        let extended = ellipse_of(&result.added[0]);
        assert!(approx_eq(extended.start_angle(), 0.0));
        assert!((extended.end_angle() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_trim_unsupported_kind_is_noop() {
        let text = Entity::new(
            crate::geometry::Text::new(Point3::origin(), 1.0, 0.0, "x", IndexedColor::Auto).unwrap(),
        );
        let selected = SelectedEntity::new(text, Point3::origin());
        assert!(trim(&selected, &[boundary(-1.0, 0.0, 1.0, 0.0)]).is_empty());
    }

    #[test]
    fn test_extend_line() {
        let line = line_entity(0.0, 0.0, 1.0, 0.0);
        let boundaries = [boundary(3.0, -1.0, 3.0, 1.0), boundary(5.0, -1.0, 5.0, 1.0)];
        let result = extend(&SelectedEntity::new(line.clone(), Point3::new(0.9, 0.0, 0.0)), &boundaries);
        assert_eq!(result.added.len(), 1);
        assert!(result.added[0].equivalent_to(&line_entity(0.0, 0.0, 3.0, 0.0)));

        // 靠近 P1 一侧没有边界
        let result = extend(&SelectedEntity::new(line, Point3::new(0.1, 0.0, 0.0)), &boundaries);
        assert!(result.is_empty());
    }

    #[test]
    fn test_extend_arc_end() {
        let arc = Entity::new(
            Arc::new(Point3::origin(), 1.0, 0.0, 90.0, Vector3::z(), IndexedColor::Auto).unwrap(),
        );
        // 拾取点靠近终点 (0, 1)，边界为负X轴
        let selected = SelectedEntity::new(arc, Point3::new(0.1, 1.0, 0.0));
        let result = extend(&selected, &[boundary(0.0, 0.0, -2.0, 0.0)]);
        assert_eq!(result.added.len(), 1);
        let extended = arc_of(&result.added[0]);
        assert!(approx_eq(extended.start_angle(), 0.0));
        assert!((extended.end_angle() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_keeps_layer() {
        let line = line_entity(0.0, 0.0, 2.0, 0.0);
        let drawing = Drawing::new()
            .add_layer(Layer::new("walls", IndexedColor::Auto))
            .and_then(|d| d.add_entity("walls", line.clone()))
            .unwrap();
        let result = trim(
            &SelectedEntity::new(line.clone(), Point3::origin()),
            &[boundary(1.0, -1.0, 1.0, 1.0)],
        );
        let next = result.apply(&drawing).unwrap();
        assert_eq!(next.entity_count(), 1);
        assert!(next.containing_layer(line.id()).is_none());
        let added = &result.added[0];
        assert_eq!(next.containing_layer(added.id()).map(|l| l.name()), Some("walls"));
        assert_eq!(drawing.entity_count(), 1);
    }
}
