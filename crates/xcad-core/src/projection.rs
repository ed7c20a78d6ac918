//! 投影
//!
//! 把3D实体投影到显示/打印平面，得到供渲染器、绘图仪使用的2D形状。
//!
//! 圆、圆弧、椭圆不能逐点投影：先把定义它们的两条共轭半轴通过投影矩阵变换，
//! 再用奇异值分解重新求出等价的平面椭圆（中心、两个半径、旋转角）。
//!
//! 每个投影结果都保留来源实体和图层的引用，以及外层聚合体传下来的颜色，
//! 渲染时按 实体 → 聚合体 → 图层 → 默认值 的顺序解析 `Auto` 颜色。

use crate::color::{ColorMap, IndexedColor, RealColor};
use crate::drawing::Drawing;
use crate::entity::Entity;
use crate::geometry::{Aggregate, Geometry, Text};
use crate::layer::Layer;
use crate::math::{correct_angle_degrees, Matrix2, Matrix4, Point3, Vector3, EPSILON};
use crate::primitive::PrimitiveEllipse;
use crate::transform::ScreenTransform;
use tracing::trace;

/// 投影后的二次曲线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedConic {
    pub center: Point3,
    pub radius_x: f64,
    pub radius_y: f64,
    /// X半径方向相对X轴的角度（度）
    pub rotation: f64,
    /// 投影后的起止参数角（度），闭合曲线为 `(0, 360)`
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ProjectedConic {
    /// 投影平面上参数角为 `degrees` 的点
    pub fn point_at(&self, degrees: f64) -> Point3 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (rs, rc) = self.rotation.to_radians().sin_cos();
        let x = self.radius_x * cos;
        let y = self.radius_y * sin;
        Point3::new(
            self.center.x + x * rc - y * rs,
            self.center.y + x * rs + y * rc,
            self.center.z,
        )
    }

    fn transformed(&self, transform: &ScreenTransform) -> Self {
        Self {
            center: transform.transform_point(&self.center),
            rotation: correct_angle_degrees(self.rotation + transform.rotation),
            ..*self
        }
    }
}

/// 由投影后的共轭半轴重新求椭圆
///
/// 投影后椭圆为 `C' + A·(cos θ, sin θ)`，其中 `A` 的两列是长轴和短轴的平面分量。
/// 分解 `A = U·Σ·Vᵀ` 后，`U` 给出旋转，`Σ` 给出两个半径，`Vᵀ` 把原参数角
/// 映射为新参数角。`Vᵀ` 为镜像时参数方向反转，起止角互换。
pub fn project_conic(ellipse: &PrimitiveEllipse, matrix: &Matrix4) -> Option<ProjectedConic> {
    let center = matrix.transform_point(&ellipse.center());
    let major = matrix.transform_vector(&ellipse.major_axis());
    let minor = matrix.transform_vector(&ellipse.minor_axis());

    let a = Matrix2::new(major.x, minor.x, major.y, minor.y);
    let svd = a.svd(true, true);
    let mut u = svd.u?;
    let mut v_t = svd.v_t?;
    let sigma = svd.singular_values;
    if sigma[0] <= EPSILON && sigma[1] <= EPSILON {
        return None;
    }

    if u.determinant() < 0.0 {
        u[(0, 1)] = -u[(0, 1)];
        u[(1, 1)] = -u[(1, 1)];
        v_t[(1, 0)] = -v_t[(1, 0)];
        v_t[(1, 1)] = -v_t[(1, 1)];
    }
    let rotation = correct_angle_degrees(u[(1, 0)].atan2(u[(0, 0)]).to_degrees());

    let (start_angle, end_angle) = if ellipse.is_closed() {
        (0.0, 360.0)
    } else {
        let map = |degrees: f64| {
            let (sin, cos) = degrees.to_radians().sin_cos();
            let q = v_t * nalgebra::Vector2::new(cos, sin);
            correct_angle_degrees(q.y.atan2(q.x).to_degrees())
        };
        let start = map(ellipse.start_angle());
        let end = map(ellipse.end_angle());
        if v_t.determinant() < 0.0 {
            (end, start)
        } else {
            (start, end)
        }
    };

    Some(ProjectedConic {
        center,
        radius_x: sigma[0],
        radius_y: sigma[1],
        rotation,
        start_angle,
        end_angle,
    })
}

/// 投影后的线段
#[derive(Debug, Clone)]
pub struct ProjectedLine<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub p1: Point3,
    pub p2: Point3,
}

/// 投影后的圆或闭合椭圆
#[derive(Debug, Clone)]
pub struct ProjectedCircle<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub conic: ProjectedConic,
}

/// 投影后的圆弧或椭圆弧
#[derive(Debug, Clone)]
pub struct ProjectedArc<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub conic: ProjectedConic,
}

impl ProjectedArc<'_> {
    pub fn start_point(&self) -> Point3 {
        self.conic.point_at(self.conic.start_angle)
    }

    pub fn end_point(&self) -> Point3 {
        self.conic.point_at(self.conic.end_angle)
    }
}

/// 投影后的文字
#[derive(Debug, Clone)]
pub struct ProjectedText<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub location: Point3,
    pub height: f64,
    /// 度
    pub rotation: f64,
    pub value: &'a str,
}

#[derive(Debug, Clone)]
pub struct ProjectedPolyline<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub points: Vec<Point3>,
}

/// 投影后的聚合体
///
/// 子形状按聚合体局部坐标投影，整体再平移 `offset`。
#[derive(Debug, Clone)]
pub struct ProjectedAggregate<'a> {
    pub entity: &'a Entity,
    pub layer: &'a Layer,
    pub inherited_color: IndexedColor,
    pub location: Point3,
    pub offset: Vector3,
    pub children: Vec<ProjectedEntity<'a>>,
}

impl<'a> ProjectedAggregate<'a> {
    /// 把偏移量施加到子形状上，嵌套聚合体递归展开
    pub fn flattened(&self) -> Vec<ProjectedEntity<'a>> {
        self.children
            .iter()
            .flat_map(|child| {
                let moved = child.translated(&self.offset);
                match moved {
                    ProjectedEntity::Aggregate(inner) => inner.flattened(),
                    other => vec![other],
                }
            })
            .collect()
    }
}

/// 投影结果
#[derive(Debug, Clone)]
pub enum ProjectedEntity<'a> {
    Line(ProjectedLine<'a>),
    Circle(ProjectedCircle<'a>),
    Arc(ProjectedArc<'a>),
    Text(ProjectedText<'a>),
    Polyline(ProjectedPolyline<'a>),
    Aggregate(ProjectedAggregate<'a>),
}

impl<'a> ProjectedEntity<'a> {
    pub fn entity(&self) -> &'a Entity {
        match self {
            ProjectedEntity::Line(p) => p.entity,
            ProjectedEntity::Circle(p) => p.entity,
            ProjectedEntity::Arc(p) => p.entity,
            ProjectedEntity::Text(p) => p.entity,
            ProjectedEntity::Polyline(p) => p.entity,
            ProjectedEntity::Aggregate(p) => p.entity,
        }
    }

    pub fn layer(&self) -> &'a Layer {
        match self {
            ProjectedEntity::Line(p) => p.layer,
            ProjectedEntity::Circle(p) => p.layer,
            ProjectedEntity::Arc(p) => p.layer,
            ProjectedEntity::Text(p) => p.layer,
            ProjectedEntity::Polyline(p) => p.layer,
            ProjectedEntity::Aggregate(p) => p.layer,
        }
    }

    pub fn inherited_color(&self) -> IndexedColor {
        match self {
            ProjectedEntity::Line(p) => p.inherited_color,
            ProjectedEntity::Circle(p) => p.inherited_color,
            ProjectedEntity::Arc(p) => p.inherited_color,
            ProjectedEntity::Text(p) => p.inherited_color,
            ProjectedEntity::Polyline(p) => p.inherited_color,
            ProjectedEntity::Aggregate(p) => p.inherited_color,
        }
    }

    /// 解析最终显示颜色：实体 → 外层聚合体 → 图层 → `default`
    pub fn resolve_color(&self, color_map: &ColorMap, default: RealColor) -> RealColor {
        color_map.resolve(
            &[
                self.entity().color(),
                self.inherited_color(),
                self.layer().color(),
            ],
            default,
        )
    }

    /// 施加屏幕变换（先旋转再平移）
    pub fn transformed(&self, transform: &ScreenTransform) -> ProjectedEntity<'a> {
        match self {
            ProjectedEntity::Line(p) => ProjectedEntity::Line(ProjectedLine {
                p1: transform.transform_point(&p.p1),
                p2: transform.transform_point(&p.p2),
                ..p.clone()
            }),
            ProjectedEntity::Circle(p) => ProjectedEntity::Circle(ProjectedCircle {
                conic: p.conic.transformed(transform),
                ..p.clone()
            }),
            ProjectedEntity::Arc(p) => ProjectedEntity::Arc(ProjectedArc {
                conic: p.conic.transformed(transform),
                ..p.clone()
            }),
            ProjectedEntity::Text(p) => ProjectedEntity::Text(ProjectedText {
                location: transform.transform_point(&p.location),
                rotation: correct_angle_degrees(p.rotation + transform.rotation),
                ..p.clone()
            }),
            ProjectedEntity::Polyline(p) => ProjectedEntity::Polyline(ProjectedPolyline {
                points: p.points.iter().map(|pt| transform.transform_point(pt)).collect(),
                ..p.clone()
            }),
            ProjectedEntity::Aggregate(p) => ProjectedEntity::Aggregate(ProjectedAggregate {
                location: transform.transform_point(&p.location),
                offset: transform.to_matrix().transform_vector(&p.offset),
                children: p.children.iter().map(|c| c.transformed(transform)).collect(),
                ..p.clone()
            }),
        }
    }

    pub fn translated(&self, offset: &Vector3) -> ProjectedEntity<'a> {
        self.transformed(&ScreenTransform::identity().then_translate(offset))
    }
}

/// 投影单个实体，退化（如侧视的文字）时返回 `None`
pub fn project<'a>(entity: &'a Entity, layer: &'a Layer, matrix: &Matrix4) -> Option<ProjectedEntity<'a>> {
    project_with_color(entity, layer, IndexedColor::Auto, matrix)
}

fn project_with_color<'a>(
    entity: &'a Entity,
    layer: &'a Layer,
    inherited_color: IndexedColor,
    matrix: &Matrix4,
) -> Option<ProjectedEntity<'a>> {
    let projected = match entity.geometry() {
        Geometry::Line(line) => ProjectedEntity::Line(ProjectedLine {
            entity,
            layer,
            inherited_color,
            p1: matrix.transform_point(&line.p1()),
            p2: matrix.transform_point(&line.p2()),
        }),
        Geometry::Circle(circle) => ProjectedEntity::Circle(ProjectedCircle {
            entity,
            layer,
            inherited_color,
            conic: project_conic(&circle.primitive(), matrix)?,
        }),
        Geometry::Arc(arc) => ProjectedEntity::Arc(ProjectedArc {
            entity,
            layer,
            inherited_color,
            conic: project_conic(&arc.primitive(), matrix)?,
        }),
        Geometry::Ellipse(ellipse) => {
            let conic = project_conic(&ellipse.primitive(), matrix)?;
            if ellipse.is_closed() {
                ProjectedEntity::Circle(ProjectedCircle {
                    entity,
                    layer,
                    inherited_color,
                    conic,
                })
            } else {
                ProjectedEntity::Arc(ProjectedArc {
                    entity,
                    layer,
                    inherited_color,
                    conic,
                })
            }
        }
        Geometry::Text(text) => project_text(entity, text, layer, inherited_color, matrix)?,
        Geometry::Polyline(polyline) => ProjectedEntity::Polyline(ProjectedPolyline {
            entity,
            layer,
            inherited_color,
            points: polyline.points().iter().map(|p| matrix.transform_point(p)).collect(),
        }),
        Geometry::Aggregate(aggregate) => {
            project_aggregate(entity, aggregate, layer, inherited_color, matrix)
        }
    };
    Some(projected)
}

fn project_text<'a>(
    entity: &'a Entity,
    text: &'a Text,
    layer: &'a Layer,
    inherited_color: IndexedColor,
    matrix: &Matrix4,
) -> Option<ProjectedEntity<'a>> {
    let (sin, cos) = text.rotation().to_radians().sin_cos();
    let direction = matrix.transform_vector(&Vector3::new(cos, sin, 0.0));
    let up = matrix.transform_vector(&Vector3::new(-sin, cos, 0.0)) * text.height();
    if direction.xy().norm() <= EPSILON || up.xy().norm() <= EPSILON {
        trace!("Text {} is edge-on, not projected", entity.id());
        return None;
    }
    Some(ProjectedEntity::Text(ProjectedText {
        entity,
        layer,
        inherited_color,
        location: matrix.transform_point(&text.location()),
        height: up.xy().norm(),
        rotation: correct_angle_degrees(direction.y.atan2(direction.x).to_degrees()),
        value: text.value(),
    }))
}

fn project_aggregate<'a>(
    entity: &'a Entity,
    aggregate: &'a Aggregate,
    layer: &'a Layer,
    inherited_color: IndexedColor,
    matrix: &Matrix4,
) -> ProjectedEntity<'a> {
    let child_color = aggregate.color().or(inherited_color);
    let children = aggregate
        .children()
        .iter()
        .filter_map(|child| project_with_color(child, layer, child_color, matrix))
        .collect();
    ProjectedEntity::Aggregate(ProjectedAggregate {
        entity,
        layer,
        inherited_color,
        location: matrix.transform_point(&aggregate.location()),
        offset: matrix.transform_vector(&aggregate.location().coords),
        children,
    })
}

/// 投影图纸中所有可见图层的实体（按图层名升序）
pub fn project_drawing<'a>(drawing: &'a Drawing, matrix: &Matrix4) -> Vec<ProjectedEntity<'a>> {
    drawing
        .layers()
        .filter(|layer| layer.is_visible())
        .flat_map(|layer| {
            layer
                .entities()
                .filter_map(move |entity| project(entity, layer, matrix))
        })
        .collect()
}
