//! 偏移
//!
//! 生成线段或圆在指定距离上的平行副本，方向由参考点决定：
//! - 线段：在绘图平面内沿垂直方向偏移到参考点一侧
//! - 圆：参考点在圆内时半径减小，在圆外时半径增大
//!
//! 参考点恰好落在几何上时方向不确定，返回 `None`。其他实体类型不支持偏移。

use crate::drawing::Drawing;
use crate::entity::Entity;
use crate::geometry::{Circle, Geometry, Line, LineUpdate};
use crate::math::{Point3, Vector3, VectorExt, EPSILON};
use tracing::debug;

/// 判断参考点“在几何上”的容差
const ON_GEOMETRY_TOLERANCE: f64 = 1e-9;

/// 偏移实体
pub fn offset(
    drawing: &Drawing,
    entity: &Entity,
    reference_point: &Point3,
    distance: f64,
) -> Option<Entity> {
    let result = match entity.geometry() {
        Geometry::Line(line) => {
            offset_line(line, &drawing.settings().drawing_plane.normal, reference_point, distance)
                .map(|l| entity.with_geometry(l))
        }
        Geometry::Circle(circle) => {
            offset_circle(circle, reference_point, distance).map(|c| entity.with_geometry(c))
        }
        _ => None,
    };
    debug!(
        "Offset {:?} {} by {}: {}",
        entity.kind(),
        entity.id(),
        distance,
        if result.is_some() { "done" } else { "no operation" }
    );
    result
}

fn offset_line(line: &Line, plane_normal: &Vector3, reference_point: &Point3, distance: f64) -> Option<Line> {
    let direction = (line.p2() - line.p1()).normalized().ok()?;
    let perpendicular = plane_normal.cross(&direction).normalized().ok()?;

    let side = (reference_point - line.p1()).dot(&perpendicular);
    if side.abs() <= ON_GEOMETRY_TOLERANCE * line.length().max(1.0) {
        return None;
    }
    let shift = perpendicular * side.signum() * distance;
    Some(line.update(LineUpdate {
        p1: Some(line.p1() + shift),
        p2: Some(line.p2() + shift),
        ..Default::default()
    }))
}

/// 在圆自身的单位圆空间中判断参考点在圆内还是圆外
fn offset_circle(circle: &Circle, reference_point: &Point3, distance: f64) -> Option<Circle> {
    let to_unit = circle.primitive().from_unit_circle()?;
    let unit = to_unit.transform_point(reference_point);
    let unit_radius = (unit.x * unit.x + unit.y * unit.y).sqrt();
    if (unit_radius - 1.0).abs() <= ON_GEOMETRY_TOLERANCE {
        return None;
    }

    let radius = if unit_radius < 1.0 {
        circle.radius() - distance
    } else {
        circle.radius() + distance
    };
    if radius <= EPSILON {
        return None;
    }
    Some(circle.with_radius(radius))
}
