//! 实体几何定义
//!
//! 支持的实体形状：
//! - 线段 (Line)
//! - 圆 (Circle)
//! - 圆弧 (Arc)
//! - 椭圆/椭圆弧 (Ellipse)
//! - 多段线 (Polyline)
//! - 文本 (Text)
//! - 聚合体 (Aggregate)：平移后的子实体组，颜色向下继承
//!
//! 所有形状都是不可变值。`update` 接收可选的字段覆盖并返回新值；
//! 曲线和文本在 `update` 时重新校验。

use crate::color::IndexedColor;
use crate::entity::{Entity, EntityKind};
use crate::error::GeometryError;
use crate::math::{
    approx_eq, angles_approx_eq, points_approx_eq, right_vector_from_normal, vectors_approx_eq,
    BoundingBox, Matrix4, Point3, Vector3, VectorExt,
};
use crate::primitive::{
    normalize_span, Primitive, PrimitiveEllipse, PrimitiveLine, PrimitiveText,
};
use crate::snap::SnapPoint;
use serde::{Deserialize, Serialize};

/// 文本宽度估算系数（字符数 × 高度 × 系数）
const TEXT_WIDTH_FACTOR: f64 = 0.6;

/// 几何类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Ellipse(Ellipse),
    Polyline(Polyline),
    Text(Text),
    Aggregate(Aggregate),
}

impl Geometry {
    pub fn kind(&self) -> EntityKind {
        match self {
            Geometry::Line(_) => EntityKind::Line,
            Geometry::Circle(_) => EntityKind::Circle,
            Geometry::Arc(_) => EntityKind::Arc,
            Geometry::Ellipse(_) => EntityKind::Ellipse,
            Geometry::Polyline(_) => EntityKind::Polyline,
            Geometry::Text(_) => EntityKind::Text,
            Geometry::Aggregate(_) => EntityKind::Aggregate,
        }
    }

    pub fn color(&self) -> IndexedColor {
        match self {
            Geometry::Line(g) => g.color,
            Geometry::Circle(g) => g.color,
            Geometry::Arc(g) => g.color,
            Geometry::Ellipse(g) => g.color,
            Geometry::Polyline(g) => g.color,
            Geometry::Text(g) => g.color,
            Geometry::Aggregate(g) => g.color,
        }
    }

    /// 派生图元
    pub fn primitives(&self) -> Vec<Primitive> {
        match self {
            Geometry::Line(g) => vec![g.primitive().into()],
            Geometry::Circle(g) => vec![g.primitive().into()],
            Geometry::Arc(g) => vec![g.primitive().into()],
            Geometry::Ellipse(g) => vec![g.primitive().into()],
            Geometry::Polyline(g) => g.primitives(),
            Geometry::Text(g) => vec![g.primitive().into()],
            Geometry::Aggregate(g) => g.primitives(),
        }
    }

    /// 捕捉点
    pub fn snap_points(&self) -> Vec<SnapPoint> {
        match self {
            Geometry::Line(g) => g.snap_points(),
            Geometry::Circle(g) => g.snap_points(),
            Geometry::Arc(g) => g.snap_points(),
            Geometry::Ellipse(g) => g.snap_points(),
            Geometry::Polyline(g) => g.snap_points(),
            Geometry::Text(g) => g.snap_points(),
            Geometry::Aggregate(g) => g.snap_points(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Geometry::Line(g) => g.bounding_box(),
            Geometry::Circle(g) => g.bounding_box(),
            Geometry::Arc(g) => g.bounding_box(),
            Geometry::Ellipse(g) => g.bounding_box(),
            Geometry::Polyline(g) => g.bounding_box(),
            Geometry::Text(g) => g.bounding_box(),
            Geometry::Aggregate(g) => g.bounding_box(),
        }
    }

    /// 几何等价（容差内相等，与方向/顺序无关）
    pub fn equivalent_to(&self, other: &Geometry) -> bool {
        match (self, other) {
            (Geometry::Line(a), Geometry::Line(b)) => a.equivalent_to(b),
            (Geometry::Circle(a), Geometry::Circle(b)) => a.equivalent_to(b),
            (Geometry::Arc(a), Geometry::Arc(b)) => a.equivalent_to(b),
            (Geometry::Ellipse(a), Geometry::Ellipse(b)) => a.equivalent_to(b),
            (Geometry::Polyline(a), Geometry::Polyline(b)) => a.equivalent_to(b),
            (Geometry::Text(a), Geometry::Text(b)) => a.equivalent_to(b),
            (Geometry::Aggregate(a), Geometry::Aggregate(b)) => a.equivalent_to(b),
            _ => false,
        }
    }
}

macro_rules! impl_from_shape {
    ($($shape:ident),*) => {
        $(
            impl From<$shape> for Geometry {
                fn from(value: $shape) -> Self {
                    Geometry::$shape(value)
                }
            }
        )*
    };
}

impl_from_shape!(Line, Circle, Arc, Ellipse, Polyline, Text, Aggregate);

/// 以法向量的“右”方向为零度方向的长轴
fn circular_major_axis(normal: &Vector3, radius: f64) -> Vector3 {
    right_vector_from_normal(normal)
        .map(|right| right * radius)
        .unwrap_or_else(|_| Vector3::x() * radius)
}

fn validate_radius(radius: f64) -> Result<f64, GeometryError> {
    if radius > 0.0 && radius.is_finite() {
        Ok(radius)
    } else {
        Err(GeometryError::InvalidRadius(radius))
    }
}

fn normals_parallel(a: &Vector3, b: &Vector3) -> bool {
    vectors_approx_eq(a, b) || vectors_approx_eq(a, &-b)
}

// ============================================================================
// 线段
// ============================================================================

/// 线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    p1: Point3,
    p2: Point3,
    color: IndexedColor,
}

/// 线段的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct LineUpdate {
    pub p1: Option<Point3>,
    pub p2: Option<Point3>,
    pub color: Option<IndexedColor>,
}

impl Line {
    pub fn new(p1: Point3, p2: Point3, color: IndexedColor) -> Self {
        Self { p1, p2, color }
    }

    pub fn p1(&self) -> Point3 {
        self.p1
    }

    pub fn p2(&self) -> Point3 {
        self.p2
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    pub fn midpoint(&self) -> Point3 {
        nalgebra::center(&self.p1, &self.p2)
    }

    pub fn update(&self, changes: LineUpdate) -> Line {
        Line {
            p1: changes.p1.unwrap_or(self.p1),
            p2: changes.p2.unwrap_or(self.p2),
            color: changes.color.unwrap_or(self.color),
        }
    }

    pub fn primitive(&self) -> PrimitiveLine {
        PrimitiveLine {
            p1: self.p1,
            p2: self.p2,
            color: self.color,
        }
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        vec![
            SnapPoint::end_point(self.p1),
            SnapPoint::end_point(self.p2),
            SnapPoint::mid_point(self.midpoint()),
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points([self.p1, self.p2])
    }

    /// 端点顺序无关
    pub fn equivalent_to(&self, other: &Line) -> bool {
        self.color == other.color
            && ((points_approx_eq(&self.p1, &other.p1) && points_approx_eq(&self.p2, &other.p2))
                || (points_approx_eq(&self.p1, &other.p2) && points_approx_eq(&self.p2, &other.p1)))
    }

    /// 刚体变换
    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Line {
        Line {
            p1: matrix.transform_point(&self.p1),
            p2: matrix.transform_point(&self.p2),
            color: self.color,
        }
    }
}

// ============================================================================
// 圆
// ============================================================================

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    center: Point3,
    radius: f64,
    normal: Vector3,
    color: IndexedColor,
}

/// 圆的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct CircleUpdate {
    pub center: Option<Point3>,
    pub radius: Option<f64>,
    pub normal: Option<Vector3>,
    pub color: Option<IndexedColor>,
}

impl Circle {
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        Ok(Self {
            center,
            radius: validate_radius(radius)?,
            normal: normal.normalized()?,
            color,
        })
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn update(&self, changes: CircleUpdate) -> Result<Circle, GeometryError> {
        Circle::new(
            changes.center.unwrap_or(self.center),
            changes.radius.unwrap_or(self.radius),
            changes.normal.unwrap_or(self.normal),
            changes.color.unwrap_or(self.color),
        )
    }

    /// 调用方保证 `radius > 0`
    pub(crate) fn with_radius(&self, radius: f64) -> Circle {
        Circle {
            radius,
            ..self.clone()
        }
    }

    pub fn primitive(&self) -> PrimitiveEllipse {
        PrimitiveEllipse::from_parts(
            self.center,
            circular_major_axis(&self.normal, self.radius),
            self.normal,
            1.0,
            0.0,
            360.0,
            self.color,
        )
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        let primitive = self.primitive();
        let mut points = vec![SnapPoint::center(self.center)];
        points.extend(
            [0.0, 90.0, 180.0, 270.0]
                .into_iter()
                .map(|a| SnapPoint::quadrant(primitive.point_at_angle(a))),
        );
        points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.primitive().bounding_box()
    }

    pub fn equivalent_to(&self, other: &Circle) -> bool {
        self.color == other.color
            && points_approx_eq(&self.center, &other.center)
            && approx_eq(self.radius, other.radius)
            && normals_parallel(&self.normal, &other.normal)
    }

    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Circle {
        Circle {
            center: matrix.transform_point(&self.center),
            normal: matrix.transform_vector(&self.normal).normalize(),
            ..self.clone()
        }
    }
}

// ============================================================================
// 圆弧
// ============================================================================

/// 圆弧（角度为度，按逆时针从起始角扫到终止角）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    center: Point3,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    normal: Vector3,
    color: IndexedColor,
}

/// 圆弧的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct ArcUpdate {
    pub center: Option<Point3>,
    pub radius: Option<f64>,
    pub start_angle: Option<f64>,
    pub end_angle: Option<f64>,
    pub normal: Option<Vector3>,
    pub color: Option<IndexedColor>,
}

impl Arc {
    pub fn new(
        center: Point3,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Ok(Self {
            center,
            radius: validate_radius(radius)?,
            start_angle,
            end_angle,
            normal: normal.normalized()?,
            color,
        })
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    pub fn end_angle(&self) -> f64 {
        self.end_angle
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn update(&self, changes: ArcUpdate) -> Result<Arc, GeometryError> {
        Arc::new(
            changes.center.unwrap_or(self.center),
            changes.radius.unwrap_or(self.radius),
            changes.start_angle.unwrap_or(self.start_angle),
            changes.end_angle.unwrap_or(self.end_angle),
            changes.normal.unwrap_or(self.normal),
            changes.color.unwrap_or(self.color),
        )
    }

    pub(crate) fn with_angles(&self, start_angle: f64, end_angle: f64) -> Arc {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Arc {
            start_angle,
            end_angle,
            ..self.clone()
        }
    }

    /// 由满周圆截取的圆弧
    pub(crate) fn from_circle(circle: &Circle, start_angle: f64, end_angle: f64) -> Arc {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Arc {
            center: circle.center,
            radius: circle.radius,
            start_angle,
            end_angle,
            normal: circle.normal,
            color: circle.color,
        }
    }

    pub fn primitive(&self) -> PrimitiveEllipse {
        PrimitiveEllipse::from_parts(
            self.center,
            circular_major_axis(&self.normal, self.radius),
            self.normal,
            1.0,
            self.start_angle,
            self.end_angle,
            self.color,
        )
    }

    pub fn start_point(&self) -> Point3 {
        self.primitive().start_point()
    }

    pub fn end_point(&self) -> Point3 {
        self.primitive().end_point()
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        let primitive = self.primitive();
        let mid = primitive.start_angle() + primitive.sweep() / 2.0;
        vec![
            SnapPoint::center(self.center),
            SnapPoint::end_point(primitive.start_point()),
            SnapPoint::end_point(primitive.end_point()),
            SnapPoint::mid_point(primitive.point_at_angle(mid)),
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.primitive().bounding_box()
    }

    pub fn equivalent_to(&self, other: &Arc) -> bool {
        self.color == other.color
            && points_approx_eq(&self.center, &other.center)
            && approx_eq(self.radius, other.radius)
            && vectors_approx_eq(&self.normal, &other.normal)
            && angles_approx_eq(self.start_angle, other.start_angle)
            && angles_approx_eq(self.end_angle, other.end_angle)
    }

    /// 刚体变换：零度方向随法向量重新确定，角度由变换后的端点反求
    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Arc {
        let start = matrix.transform_point(&self.start_point());
        let end = matrix.transform_point(&self.end_point());
        let center = matrix.transform_point(&self.center);
        let normal = matrix.transform_vector(&self.normal).normalize();
        let frame = PrimitiveEllipse::from_parts(
            center,
            circular_major_axis(&normal, self.radius),
            normal,
            1.0,
            0.0,
            360.0,
            self.color,
        );
        let (start_angle, end_angle) = match (frame.angle_of(&start), frame.angle_of(&end)) {
            (Some(s), Some(e)) => (s, e),
            _ => (self.start_angle, self.end_angle),
        };
        Arc {
            center,
            normal,
            ..self.with_angles(start_angle, end_angle)
        }
    }
}

// ============================================================================
// 椭圆
// ============================================================================

/// 椭圆或椭圆弧，`[0, 360]` 表示闭合曲线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    center: Point3,
    major_axis: Vector3,
    minor_axis_ratio: f64,
    start_angle: f64,
    end_angle: f64,
    normal: Vector3,
    color: IndexedColor,
}

/// 椭圆的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct EllipseUpdate {
    pub center: Option<Point3>,
    pub major_axis: Option<Vector3>,
    pub minor_axis_ratio: Option<f64>,
    pub start_angle: Option<f64>,
    pub end_angle: Option<f64>,
    pub normal: Option<Vector3>,
    pub color: Option<IndexedColor>,
}

impl Ellipse {
    pub fn new(
        center: Point3,
        major_axis: Vector3,
        minor_axis_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        // 复用图元的校验规则
        let primitive = PrimitiveEllipse::new(
            center,
            major_axis,
            normal,
            minor_axis_ratio,
            start_angle,
            end_angle,
            color,
        )?;
        Ok(Self {
            center,
            major_axis,
            minor_axis_ratio,
            start_angle: primitive.start_angle(),
            end_angle: primitive.end_angle(),
            normal: primitive.normal(),
            color,
        })
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn major_axis(&self) -> Vector3 {
        self.major_axis
    }

    pub fn minor_axis_ratio(&self) -> f64 {
        self.minor_axis_ratio
    }

    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    pub fn end_angle(&self) -> f64 {
        self.end_angle
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn is_closed(&self) -> bool {
        self.primitive().is_closed()
    }

    pub fn update(&self, changes: EllipseUpdate) -> Result<Ellipse, GeometryError> {
        Ellipse::new(
            changes.center.unwrap_or(self.center),
            changes.major_axis.unwrap_or(self.major_axis),
            changes.minor_axis_ratio.unwrap_or(self.minor_axis_ratio),
            changes.start_angle.unwrap_or(self.start_angle),
            changes.end_angle.unwrap_or(self.end_angle),
            changes.normal.unwrap_or(self.normal),
            changes.color.unwrap_or(self.color),
        )
    }

    pub(crate) fn with_angles(&self, start_angle: f64, end_angle: f64) -> Ellipse {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Ellipse {
            start_angle,
            end_angle,
            ..self.clone()
        }
    }

    pub fn primitive(&self) -> PrimitiveEllipse {
        PrimitiveEllipse::from_parts(
            self.center,
            self.major_axis,
            self.normal,
            self.minor_axis_ratio,
            self.start_angle,
            self.end_angle,
            self.color,
        )
    }

    /// 闭合时为圆心 + 四个象限点，否则为圆心 + 两端点 + 中点
    pub fn snap_points(&self) -> Vec<SnapPoint> {
        let primitive = self.primitive();
        let mut points = vec![SnapPoint::center(self.center)];
        if primitive.is_closed() {
            points.extend(
                [0.0, 90.0, 180.0, 270.0]
                    .into_iter()
                    .map(|a| SnapPoint::quadrant(primitive.point_at_angle(a))),
            );
        } else {
            let mid = primitive.start_angle() + primitive.sweep() / 2.0;
            points.push(SnapPoint::end_point(primitive.start_point()));
            points.push(SnapPoint::end_point(primitive.end_point()));
            points.push(SnapPoint::mid_point(primitive.point_at_angle(mid)));
        }
        points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.primitive().bounding_box()
    }

    pub fn equivalent_to(&self, other: &Ellipse) -> bool {
        self.color == other.color
            && points_approx_eq(&self.center, &other.center)
            && vectors_approx_eq(&self.major_axis, &other.major_axis)
            && approx_eq(self.minor_axis_ratio, other.minor_axis_ratio)
            && vectors_approx_eq(&self.normal, &other.normal)
            && angles_approx_eq(self.start_angle, other.start_angle)
            && angles_approx_eq(self.end_angle, other.end_angle)
    }

    /// 刚体变换：长轴随之变换，参数角保持不变
    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Ellipse {
        Ellipse {
            center: matrix.transform_point(&self.center),
            major_axis: matrix.transform_vector(&self.major_axis),
            normal: matrix.transform_vector(&self.normal).normalize(),
            ..self.clone()
        }
    }
}

// ============================================================================
// 多段线
// ============================================================================

/// 多段线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point3>,
    color: IndexedColor,
}

/// 多段线的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct PolylineUpdate {
    pub points: Option<Vec<Point3>>,
    pub color: Option<IndexedColor>,
}

impl Polyline {
    pub fn new(points: Vec<Point3>, color: IndexedColor) -> Self {
        Self { points, color }
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn update(&self, changes: PolylineUpdate) -> Polyline {
        Polyline {
            points: changes.points.unwrap_or_else(|| self.points.clone()),
            color: changes.color.unwrap_or(self.color),
        }
    }

    /// 相邻顶点之间的线段
    pub fn segments(&self) -> impl Iterator<Item = PrimitiveLine> + '_ {
        self.points.windows(2).map(|w| PrimitiveLine {
            p1: w[0],
            p2: w[1],
            color: self.color,
        })
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        self.segments().map(Primitive::Line).collect()
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        let mut points: Vec<SnapPoint> =
            self.points.iter().map(|p| SnapPoint::end_point(*p)).collect();
        points.extend(self.segments().map(|s| SnapPoint::mid_point(s.midpoint())));
        points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.points.iter().copied())
    }

    /// 顶点顺序一致或完全反向
    pub fn equivalent_to(&self, other: &Polyline) -> bool {
        if self.color != other.color || self.points.len() != other.points.len() {
            return false;
        }
        let forward = self
            .points
            .iter()
            .zip(other.points.iter())
            .all(|(a, b)| points_approx_eq(a, b));
        forward
            || self
                .points
                .iter()
                .zip(other.points.iter().rev())
                .all(|(a, b)| points_approx_eq(a, b))
    }

    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Polyline {
        Polyline {
            points: self.points.iter().map(|p| matrix.transform_point(p)).collect(),
            color: self.color,
        }
    }
}

// ============================================================================
// 文本
// ============================================================================

/// 单行文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    location: Point3,
    height: f64,
    /// 旋转角度（度）
    rotation: f64,
    value: String,
    color: IndexedColor,
}

/// 文本的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct TextUpdate {
    pub location: Option<Point3>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub value: Option<String>,
    pub color: Option<IndexedColor>,
}

impl Text {
    pub fn new(
        location: Point3,
        height: f64,
        rotation: f64,
        value: impl Into<String>,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        if !(height > 0.0 && height.is_finite()) {
            return Err(GeometryError::InvalidHeight(height));
        }
        Ok(Self {
            location,
            height,
            rotation: crate::math::correct_angle_degrees(rotation),
            value: value.into(),
            color,
        })
    }

    pub fn location(&self) -> Point3 {
        self.location
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn update(&self, changes: TextUpdate) -> Result<Text, GeometryError> {
        Text::new(
            changes.location.unwrap_or(self.location),
            changes.height.unwrap_or(self.height),
            changes.rotation.unwrap_or(self.rotation),
            changes.value.unwrap_or_else(|| self.value.clone()),
            changes.color.unwrap_or(self.color),
        )
    }

    /// 估算宽度
    pub fn width(&self) -> f64 {
        self.value.chars().count() as f64 * self.height * TEXT_WIDTH_FACTOR
    }

    /// 沿基线方向的单位向量
    fn direction(&self) -> Vector3 {
        let r = self.rotation.to_radians();
        Vector3::new(r.cos(), r.sin(), 0.0)
    }

    pub fn primitive(&self) -> PrimitiveText {
        PrimitiveText {
            location: self.location,
            normal: Vector3::z(),
            height: self.height,
            rotation: self.rotation,
            value: self.value.clone(),
            color: self.color,
        }
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        vec![SnapPoint::end_point(self.location)]
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let along = self.direction() * self.width();
        let up = Vector3::z().cross(&self.direction()) * self.height;
        BoundingBox::from_points([
            self.location,
            self.location + along,
            self.location + up,
            self.location + along + up,
        ])
    }

    pub fn equivalent_to(&self, other: &Text) -> bool {
        self.color == other.color
            && self.value == other.value
            && points_approx_eq(&self.location, &other.location)
            && approx_eq(self.height, other.height)
            && angles_approx_eq(self.rotation, other.rotation)
    }

    pub(crate) fn transformed(&self, matrix: &Matrix4) -> Text {
        let direction = matrix.transform_vector(&self.direction());
        let rotation = if direction.xy().norm() > crate::math::EPSILON {
            direction.to_angle()
        } else {
            self.rotation
        };
        Text {
            location: matrix.transform_point(&self.location),
            rotation,
            ..self.clone()
        }
    }
}

// ============================================================================
// 聚合体
// ============================================================================

/// 聚合体：子实体以 `location` 为局部原点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    location: Point3,
    children: Vec<Entity>,
    color: IndexedColor,
}

/// 聚合体的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct AggregateUpdate {
    pub location: Option<Point3>,
    pub children: Option<Vec<Entity>>,
    pub color: Option<IndexedColor>,
}

impl Aggregate {
    pub fn new(location: Point3, children: Vec<Entity>, color: IndexedColor) -> Self {
        Self {
            location,
            children,
            color,
        }
    }

    pub fn location(&self) -> Point3 {
        self.location
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    fn offset(&self) -> Vector3 {
        self.location.coords
    }

    pub fn update(&self, changes: AggregateUpdate) -> Aggregate {
        Aggregate {
            location: changes.location.unwrap_or(self.location),
            children: changes.children.unwrap_or_else(|| self.children.clone()),
            color: changes.color.unwrap_or(self.color),
        }
    }

    /// 子实体图元平移到世界坐标，`Auto` 颜色继承聚合体颜色
    pub fn primitives(&self) -> Vec<Primitive> {
        let offset = self.offset();
        self.children
            .iter()
            .flat_map(|child| child.primitives())
            .map(|p| p.translated(&offset).inherit_color(self.color))
            .collect()
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        let offset = self.offset();
        self.children
            .iter()
            .flat_map(|child| child.snap_points())
            .map(|s| SnapPoint {
                kind: s.kind,
                point: s.point + offset,
            })
            .collect()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.children
            .iter()
            .map(|child| child.bounding_box())
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
            .translated(&self.offset())
    }

    pub fn equivalent_to(&self, other: &Aggregate) -> bool {
        self.color == other.color
            && points_approx_eq(&self.location, &other.location)
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.equivalent_to(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapPointKind;

    #[test]
    fn test_line_equivalence_ignores_direction() {
        let a = Line::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0), IndexedColor::Auto);
        let b = Line::new(Point3::new(1.0, 0.0, 0.0), Point3::origin(), IndexedColor::Auto);
        assert!(a.equivalent_to(&b));
        assert!(!a.equivalent_to(&b.update(LineUpdate {
            color: Some(IndexedColor::RED),
            ..Default::default()
        })));
    }

    #[test]
    fn test_update_without_overrides() {
        let line = Line::new(Point3::origin(), Point3::new(1.0, 2.0, 3.0), IndexedColor::RED);
        assert!(line.update(LineUpdate::default()).equivalent_to(&line));

        let circle = Circle::new(Point3::new(1.0, 1.0, 0.0), 2.0, Vector3::z(), IndexedColor::Auto).unwrap();
        assert!(circle.update(CircleUpdate::default()).unwrap().equivalent_to(&circle));

        let arc = Arc::new(Point3::origin(), 1.0, 300.0, 30.0, Vector3::z(), IndexedColor::Auto).unwrap();
        assert!(arc.update(ArcUpdate::default()).unwrap().equivalent_to(&arc));

        let ellipse = Ellipse::new(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            0.5,
            0.0,
            360.0,
            Vector3::z(),
            IndexedColor::BLUE,
        )
        .unwrap();
        assert!(ellipse.update(EllipseUpdate::default()).unwrap().equivalent_to(&ellipse));

        let polyline = Polyline::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
            IndexedColor::Auto,
        );
        assert!(polyline.update(PolylineUpdate::default()).equivalent_to(&polyline));

        let text = Text::new(Point3::origin(), 2.5, 45.0, "abc", IndexedColor::Auto).unwrap();
        assert!(text.update(TextUpdate::default()).unwrap().equivalent_to(&text));

        let aggregate = Aggregate::new(
            Point3::new(5.0, 5.0, 0.0),
            vec![Entity::new(line.clone())],
            IndexedColor::Auto,
        );
        assert!(aggregate.update(AggregateUpdate::default()).equivalent_to(&aggregate));
    }

    #[test]
    fn test_update_with_overrides() {
        let circle = Circle::new(Point3::origin(), 2.0, Vector3::z(), IndexedColor::Auto).unwrap();
        let bigger = circle
            .update(CircleUpdate {
                radius: Some(3.0),
                ..Default::default()
            })
            .unwrap();
        assert!(approx_eq(bigger.radius(), 3.0));
        assert!(approx_eq(circle.radius(), 2.0));

        assert_eq!(
            circle.update(CircleUpdate {
                radius: Some(-1.0),
                ..Default::default()
            }),
            Err(GeometryError::InvalidRadius(-1.0))
        );
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Circle::new(Point3::origin(), 1.0, Vector3::zeros(), IndexedColor::Auto).is_err());
        assert!(Arc::new(Point3::origin(), 0.0, 0.0, 90.0, Vector3::z(), IndexedColor::Auto).is_err());
        assert_eq!(
            Ellipse::new(
                Point3::origin(),
                Vector3::new(1.0, 0.0, 1.0),
                0.5,
                0.0,
                360.0,
                Vector3::z(),
                IndexedColor::Auto
            ),
            Err(GeometryError::NonOrthogonalAxes)
        );
        assert!(Text::new(Point3::origin(), 0.0, 0.0, "x", IndexedColor::Auto).is_err());
    }

    #[test]
    fn test_snap_points() {
        let circle = Circle::new(Point3::origin(), 1.0, Vector3::z(), IndexedColor::Auto).unwrap();
        let snaps = circle.snap_points();
        assert_eq!(snaps.len(), 5);
        assert_eq!(snaps[0].kind, SnapPointKind::Center);
        assert!(points_approx_eq(&snaps[2].point, &Point3::new(0.0, 1.0, 0.0)));

        // 跨越0°的圆弧，中点在0°
        let arc = Arc::new(Point3::origin(), 1.0, 270.0, 90.0, Vector3::z(), IndexedColor::Auto).unwrap();
        let snaps = arc.snap_points();
        let mid = snaps.iter().find(|s| s.kind == SnapPointKind::MidPoint).unwrap();
        assert!(points_approx_eq(&mid.point, &Point3::new(1.0, 0.0, 0.0)));

        let ellipse = Ellipse::new(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            0.5,
            0.0,
            90.0,
            Vector3::z(),
            IndexedColor::Auto,
        )
        .unwrap();
        let kinds: Vec<_> = ellipse.snap_points().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SnapPointKind::Center,
                SnapPointKind::EndPoint,
                SnapPointKind::EndPoint,
                SnapPointKind::MidPoint
            ]
        );
    }

    #[test]
    fn test_aggregate_primitives_translate_and_inherit_color() {
        let child_auto = Entity::new(Line::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            IndexedColor::Auto,
        ));
        let child_blue = Entity::new(Line::new(
            Point3::origin(),
            Point3::new(0.0, 1.0, 0.0),
            IndexedColor::BLUE,
        ));
        let aggregate = Aggregate::new(
            Point3::new(10.0, 0.0, 0.0),
            vec![child_auto, child_blue],
            IndexedColor::RED,
        );
        let primitives = aggregate.primitives();
        assert_eq!(primitives.len(), 2);
        match &primitives[0] {
            Primitive::Line(l) => {
                assert!(points_approx_eq(&l.p1, &Point3::new(10.0, 0.0, 0.0)));
                assert_eq!(l.color, IndexedColor::RED);
            }
            _ => panic!("expected line"),
        }
        assert_eq!(primitives[1].color(), IndexedColor::BLUE);

        let bbox = aggregate.bounding_box();
        assert!(points_approx_eq(&bbox.min, &Point3::new(10.0, 0.0, 0.0)));
        assert!(points_approx_eq(&bbox.max, &Point3::new(11.0, 1.0, 0.0)));
    }

    #[test]
    fn test_polyline_reversed_is_equivalent() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)];
        let forward = Polyline::new(points.clone(), IndexedColor::Auto);
        let reversed = Polyline::new(points.into_iter().rev().collect(), IndexedColor::Auto);
        assert!(forward.equivalent_to(&reversed));
        assert_eq!(forward.primitives().len(), 2);
        assert_eq!(forward.snap_points().len(), 5);
    }

    #[test]
    fn test_text_bounding_box() {
        let text = Text::new(Point3::origin(), 1.0, 0.0, "abcde", IndexedColor::Auto).unwrap();
        let bbox = text.bounding_box();
        assert!(approx_eq(bbox.width(), 3.0));
        assert!(approx_eq(bbox.height(), 1.0));
    }
}
