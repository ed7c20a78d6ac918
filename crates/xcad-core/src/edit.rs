//! 移动与旋转
//!
//! 两个操作都返回新实体并保留原ID，可直接交给 `Drawing::replace_entity`。
//! 旋转轴平行于Z轴。

use crate::entity::Entity;
use crate::geometry::{Aggregate, AggregateUpdate, Geometry};
use crate::math::{Matrix4, Point3, Vector3};
use crate::transform::{rotation_about_z, translation};
use tracing::debug;

/// 平移实体
pub fn move_entity(entity: &Entity, delta: &Vector3) -> Entity {
    debug!("Move {:?} {} by {:?}", entity.kind(), entity.id(), delta);
    let geometry = match entity.geometry() {
        Geometry::Aggregate(aggregate) => Geometry::Aggregate(aggregate.update(AggregateUpdate {
            location: Some(aggregate.location() + delta),
            ..Default::default()
        })),
        geometry => transform_geometry(geometry, &translation(delta)),
    };
    Entity::with_id(entity.id(), geometry)
}

/// 绕过 `origin` 的Z向轴旋转实体（度，逆时针为正）
pub fn rotate(entity: &Entity, origin: &Point3, degrees: f64) -> Entity {
    debug!(
        "Rotate {:?} {} by {} about {:?}",
        entity.kind(),
        entity.id(),
        degrees,
        origin
    );
    let geometry = match entity.geometry() {
        Geometry::Aggregate(aggregate) => {
            Geometry::Aggregate(rotate_aggregate(aggregate, origin, degrees))
        }
        geometry => transform_geometry(geometry, &rotation_about_z(origin, degrees)),
    };
    Entity::with_id(entity.id(), geometry)
}

/// 位置绕 `origin` 旋转，子实体绕聚合体的局部原点旋转
fn rotate_aggregate(aggregate: &Aggregate, origin: &Point3, degrees: f64) -> Aggregate {
    let location = rotation_about_z(origin, degrees).transform_point(&aggregate.location());
    let children = aggregate
        .children()
        .iter()
        .map(|child| rotate(child, &Point3::origin(), degrees))
        .collect();
    aggregate.update(AggregateUpdate {
        location: Some(location),
        children: Some(children),
        ..Default::default()
    })
}

/// 对非聚合几何施加刚体变换，聚合体原样返回
fn transform_geometry(geometry: &Geometry, matrix: &Matrix4) -> Geometry {
    match geometry {
        Geometry::Line(line) => Geometry::Line(line.transformed(matrix)),
        Geometry::Circle(circle) => Geometry::Circle(circle.transformed(matrix)),
        Geometry::Arc(arc) => Geometry::Arc(arc.transformed(matrix)),
        Geometry::Ellipse(ellipse) => Geometry::Ellipse(ellipse.transformed(matrix)),
        Geometry::Polyline(polyline) => Geometry::Polyline(polyline.transformed(matrix)),
        Geometry::Text(text) => Geometry::Text(text.transformed(matrix)),
        Geometry::Aggregate(aggregate) => Geometry::Aggregate(aggregate.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::IndexedColor;
    use crate::geometry::{Arc, Circle, Line, Text};
    use crate::math::{approx_eq, points_approx_eq};

    fn line(p1: Point3, p2: Point3) -> Entity {
        Entity::new(Line::new(p1, p2, IndexedColor::Auto))
    }

    #[test]
    fn test_rotate_line_about_origin() {
        let original = line(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let rotated = rotate(&original, &Point3::origin(), 90.0);
        let expected = line(Point3::origin(), Point3::new(0.0, 1.0, 0.0));
        assert!(rotated.equivalent_to(&expected));
        assert_eq!(rotated.id(), original.id());
    }

    #[test]
    fn test_rotate_line_about_other_point() {
        let original = line(Point3::new(2.0, 2.0, 0.0), Point3::new(3.0, 2.0, 0.0));
        let rotated = rotate(&original, &Point3::new(1.0, 1.0, 0.0), 90.0);
        let expected = line(Point3::new(0.0, 2.0, 0.0), Point3::new(0.0, 3.0, 0.0));
        assert!(rotated.equivalent_to(&expected));
    }

    #[test]
    fn test_rotate_arc() {
        let arc = Arc::new(Point3::origin(), 1.0, 0.0, 90.0, Vector3::z(), IndexedColor::Auto).unwrap();
        let rotated = rotate(&Entity::new(arc), &Point3::origin(), 90.0);
        match rotated.geometry() {
            Geometry::Arc(a) => {
                assert!(approx_eq(a.start_angle(), 90.0));
                assert!(approx_eq(a.end_angle(), 180.0));
                assert!(points_approx_eq(&a.start_point(), &Point3::new(0.0, 1.0, 0.0)));
            }
            other => panic!("expected arc, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_rotate_text_accumulates_rotation() {
        let text = Text::new(Point3::new(1.0, 0.0, 0.0), 1.0, 30.0, "abc", IndexedColor::Auto).unwrap();
        let rotated = rotate(&Entity::new(text), &Point3::origin(), 90.0);
        match rotated.geometry() {
            Geometry::Text(t) => {
                assert!(approx_eq(t.rotation(), 120.0));
                assert!(points_approx_eq(&t.location(), &Point3::new(0.0, 1.0, 0.0)));
            }
            other => panic!("expected text, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_move_circle_and_line() {
        let delta = Vector3::new(1.0, 2.0, 0.0);
        let circle = Circle::new(Point3::origin(), 2.0, Vector3::z(), IndexedColor::RED).unwrap();
        let moved = move_entity(&Entity::new(circle), &delta);
        match moved.geometry() {
            Geometry::Circle(c) => {
                assert!(points_approx_eq(&c.center(), &Point3::new(1.0, 2.0, 0.0)));
                assert!(approx_eq(c.radius(), 2.0));
                assert_eq!(c.color(), IndexedColor::RED);
            }
            other => panic!("expected circle, got {:?}", other.kind()),
        }

        let moved = move_entity(&line(Point3::origin(), Point3::new(1.0, 0.0, 0.0)), &delta);
        let expected = line(Point3::new(1.0, 2.0, 0.0), Point3::new(2.0, 2.0, 0.0));
        assert!(moved.equivalent_to(&expected));
    }

    #[test]
    fn test_aggregate_move_and_rotate() {
        let child = line(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let aggregate = Entity::new(Aggregate::new(
            Point3::new(2.0, 0.0, 0.0),
            vec![child],
            IndexedColor::Auto,
        ));

        let moved = move_entity(&aggregate, &Vector3::new(0.0, 1.0, 0.0));
        match moved.geometry() {
            Geometry::Aggregate(a) => {
                assert!(points_approx_eq(&a.location(), &Point3::new(2.0, 1.0, 0.0)));
                // 子实体保持局部坐标不变
                assert!(a.children()[0].equivalent_to(&line(Point3::origin(), Point3::new(1.0, 0.0, 0.0))));
            }
            other => panic!("expected aggregate, got {:?}", other.kind()),
        }

        let rotated = rotate(&aggregate, &Point3::origin(), 90.0);
        match rotated.geometry() {
            Geometry::Aggregate(a) => {
                assert!(points_approx_eq(&a.location(), &Point3::new(0.0, 2.0, 0.0)));
                assert!(a.children()[0].equivalent_to(&line(Point3::origin(), Point3::new(0.0, 1.0, 0.0))));
            }
            other => panic!("expected aggregate, got {:?}", other.kind()),
        }
        // 世界坐标下的图元与整体旋转一致
        let bbox = rotated.bounding_box();
        assert!(points_approx_eq(&bbox.min, &Point3::new(0.0, 2.0, 0.0)));
        assert!(points_approx_eq(&bbox.max, &Point3::new(0.0, 3.0, 0.0)));
    }
}
