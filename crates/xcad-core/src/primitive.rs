//! 几何图元
//!
//! 图元是由实体派生出的最小可渲染/可求交形状：
//! - 线段 (Line)
//! - 参数椭圆 (Ellipse)：圆是比例为1的满周椭圆，圆弧是部分扫掠
//! - 点 (Point)
//! - 文本 (Text)
//!
//! 求交引擎只处理图元。

use crate::color::IndexedColor;
use crate::error::GeometryError;
use crate::math::{
    correct_angle_degrees, angles_approx_eq, approx_eq, BoundingBox, Matrix4, Point3, Vector3,
    VectorExt,
};
use crate::transform::unit_circle_projection;
use serde::{Deserialize, Serialize};

/// 角度比较容差（度）
pub const ANGLE_TOLERANCE: f64 = 1e-6;

/// 单位圆空间中的“在曲线上”容差
pub const UNIT_TOLERANCE: f64 = 1e-8;

/// 图元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Line,
    Ellipse,
    Point,
    Text,
}

/// 图元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Line(PrimitiveLine),
    Ellipse(PrimitiveEllipse),
    Point(PrimitivePoint),
    Text(PrimitiveText),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Line(_) => PrimitiveKind::Line,
            Primitive::Ellipse(_) => PrimitiveKind::Ellipse,
            Primitive::Point(_) => PrimitiveKind::Point,
            Primitive::Text(_) => PrimitiveKind::Text,
        }
    }

    pub fn color(&self) -> IndexedColor {
        match self {
            Primitive::Line(l) => l.color,
            Primitive::Ellipse(e) => e.color,
            Primitive::Point(p) => p.color,
            Primitive::Text(t) => t.color,
        }
    }

    /// 替换颜色
    pub fn with_color(&self, color: IndexedColor) -> Primitive {
        let mut result = self.clone();
        match &mut result {
            Primitive::Line(l) => l.color = color,
            Primitive::Ellipse(e) => e.color = color,
            Primitive::Point(p) => p.color = color,
            Primitive::Text(t) => t.color = color,
        }
        result
    }

    /// 自身颜色为 `Auto` 时继承 `parent`
    pub fn inherit_color(&self, parent: IndexedColor) -> Primitive {
        self.with_color(self.color().or(parent))
    }

    /// 平移
    pub fn translated(&self, offset: &Vector3) -> Primitive {
        match self {
            Primitive::Line(l) => Primitive::Line(PrimitiveLine {
                p1: l.p1 + offset,
                p2: l.p2 + offset,
                color: l.color,
            }),
            Primitive::Ellipse(e) => Primitive::Ellipse(PrimitiveEllipse {
                center: e.center + offset,
                ..e.clone()
            }),
            Primitive::Point(p) => Primitive::Point(PrimitivePoint {
                location: p.location + offset,
                color: p.color,
            }),
            Primitive::Text(t) => Primitive::Text(PrimitiveText {
                location: t.location + offset,
                ..t.clone()
            }),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Primitive::Line(l) => BoundingBox::from_points([l.p1, l.p2]),
            Primitive::Ellipse(e) => e.bounding_box(),
            Primitive::Point(p) => BoundingBox::from_points([p.location]),
            Primitive::Text(t) => BoundingBox::from_points([t.location]),
        }
    }
}

impl From<PrimitiveLine> for Primitive {
    fn from(value: PrimitiveLine) -> Self {
        Primitive::Line(value)
    }
}

impl From<PrimitiveEllipse> for Primitive {
    fn from(value: PrimitiveEllipse) -> Self {
        Primitive::Ellipse(value)
    }
}

impl From<PrimitivePoint> for Primitive {
    fn from(value: PrimitivePoint) -> Self {
        Primitive::Point(value)
    }
}

impl From<PrimitiveText> for Primitive {
    fn from(value: PrimitiveText) -> Self {
        Primitive::Text(value)
    }
}

/// 线段图元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveLine {
    pub p1: Point3,
    pub p2: Point3,
    pub color: IndexedColor,
}

impl PrimitiveLine {
    pub fn new(p1: Point3, p2: Point3) -> Self {
        Self {
            p1,
            p2,
            color: IndexedColor::Auto,
        }
    }

    pub fn with_color(mut self, color: IndexedColor) -> Self {
        self.color = color;
        self
    }

    pub fn direction(&self) -> Vector3 {
        self.p2 - self.p1
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// 参数 `t` 处的点（0 为 P1，1 为 P2）
    pub fn point_at(&self, t: f64) -> Point3 {
        self.p1 + self.direction() * t
    }

    pub fn midpoint(&self) -> Point3 {
        self.point_at(0.5)
    }

    /// 点在线段上的投影参数（未截断）
    pub fn parameter_of(&self, point: &Point3) -> f64 {
        let d = self.direction();
        let len2 = d.norm_squared();
        if len2 < crate::math::EPSILON {
            return 0.0;
        }
        (point - self.p1).dot(&d) / len2
    }

    /// 点到线段的最短距离
    pub fn distance_to_point(&self, point: &Point3) -> f64 {
        let t = self.parameter_of(point).clamp(0.0, 1.0);
        (point - self.point_at(t)).norm()
    }

    /// 点是否位于线段上
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.distance_to_point(point) <= UNIT_TOLERANCE * self.length().max(1.0)
    }
}

/// 参数椭圆图元
///
/// 参数角 θ 处的点为 `C + M·cos θ + (n̂ × M)·r·sin θ`，其中 M 为长轴向量、
/// r 为短长轴比。角度以度为单位，满周曲线记为 `[0, 360]`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveEllipse {
    center: Point3,
    major_axis: Vector3,
    normal: Vector3,
    minor_axis_ratio: f64,
    start_angle: f64,
    end_angle: f64,
    pub color: IndexedColor,
}

impl PrimitiveEllipse {
    pub fn new(
        center: Point3,
        major_axis: Vector3,
        normal: Vector3,
        minor_axis_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        let normal = normal.normalized()?;
        if major_axis.is_zero_vector() {
            return Err(GeometryError::ZeroLengthVector);
        }
        if !major_axis.is_orthogonal_to(&normal) {
            return Err(GeometryError::NonOrthogonalAxes);
        }
        if !(minor_axis_ratio > 0.0 && minor_axis_ratio.is_finite()) {
            return Err(GeometryError::InvalidRatio(minor_axis_ratio));
        }
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Ok(Self {
            center,
            major_axis,
            normal,
            minor_axis_ratio,
            start_angle,
            end_angle,
            color,
        })
    }

    /// 由已校验过的实体字段构造
    pub(crate) fn from_parts(
        center: Point3,
        major_axis: Vector3,
        normal: Vector3,
        minor_axis_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        color: IndexedColor,
    ) -> Self {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Self {
            center,
            major_axis,
            normal: normal.normalize(),
            minor_axis_ratio,
            start_angle,
            end_angle,
            color,
        }
    }

    /// 圆（长轴由法向量的“右”方向决定）
    pub fn circle(
        center: Point3,
        radius: f64,
        normal: Vector3,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        Self::arc(center, radius, 0.0, 360.0, normal, color)
    }

    /// 圆弧
    pub fn arc(
        center: Point3,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
        color: IndexedColor,
    ) -> Result<Self, GeometryError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::InvalidRadius(radius));
        }
        let right = crate::math::right_vector_from_normal(&normal)?;
        Self::new(center, right * radius, normal, 1.0, start_angle, end_angle, color)
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn major_axis(&self) -> Vector3 {
        self.major_axis
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
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

    /// 短轴向量
    pub fn minor_axis(&self) -> Vector3 {
        self.normal.cross(&self.major_axis) * self.minor_axis_ratio
    }

    /// 是否为满周曲线
    pub fn is_closed(&self) -> bool {
        approx_eq(self.start_angle, 0.0) && approx_eq(self.end_angle, 360.0)
    }

    /// 是否为圆或圆弧
    pub fn is_circular(&self) -> bool {
        approx_eq(self.minor_axis_ratio, 1.0)
    }

    /// 替换角度范围
    pub fn with_angles(&self, start_angle: f64, end_angle: f64) -> Self {
        let (start_angle, end_angle) = normalize_span(start_angle, end_angle);
        Self {
            start_angle,
            end_angle,
            ..self.clone()
        }
    }

    /// 单位圆 → 椭圆
    pub fn unit_circle_projection(&self) -> Matrix4 {
        unit_circle_projection(
            &self.center,
            &self.major_axis,
            &self.normal,
            self.minor_axis_ratio,
        )
    }

    /// 椭圆 → 单位圆
    pub fn from_unit_circle(&self) -> Option<Matrix4> {
        self.unit_circle_projection().try_inverse()
    }

    /// 参数角处的点
    pub fn point_at_angle(&self, degrees: f64) -> Point3 {
        let r = degrees.to_radians();
        self.center + self.major_axis * r.cos() + self.minor_axis() * r.sin()
    }

    pub fn start_point(&self) -> Point3 {
        self.point_at_angle(self.start_angle)
    }

    pub fn end_point(&self) -> Point3 {
        self.point_at_angle(self.end_angle)
    }

    /// 点在单位圆空间中的参数角
    pub fn angle_of(&self, point: &Point3) -> Option<f64> {
        let unit = self.from_unit_circle()?.transform_point(point);
        Some(correct_angle_degrees(unit.y.atan2(unit.x).to_degrees()))
    }

    /// 扫掠角度（度）
    pub fn sweep(&self) -> f64 {
        if self.is_closed() {
            360.0
        } else {
            correct_angle_degrees(self.end_angle - self.start_angle)
        }
    }

    /// 参数角是否位于角度范围内（含端点）
    pub fn contains_angle(&self, degrees: f64) -> bool {
        if self.is_closed() {
            return true;
        }
        let a = correct_angle_degrees(degrees);
        if angles_approx_within(a, self.start_angle) || angles_approx_within(a, self.end_angle) {
            return true;
        }
        if self.start_angle < self.end_angle {
            a >= self.start_angle && a <= self.end_angle
        } else {
            a >= self.start_angle || a <= self.end_angle
        }
    }

    /// 点是否位于曲线上（含角度范围判断）
    pub fn contains_point(&self, point: &Point3) -> bool {
        let Some(inverse) = self.from_unit_circle() else {
            return false;
        };
        let unit = inverse.transform_point(point);
        if unit.z.abs() > UNIT_TOLERANCE {
            return false;
        }
        let radius = (unit.x * unit.x + unit.y * unit.y).sqrt();
        if (radius - 1.0).abs() > UNIT_TOLERANCE {
            return false;
        }
        self.contains_angle(unit.y.atan2(unit.x).to_degrees())
    }

    /// 解析包围盒：各坐标分量的极值点加上端点
    pub fn bounding_box(&self) -> BoundingBox {
        let u = self.major_axis;
        let v = self.minor_axis();
        let mut points = Vec::with_capacity(8);
        if !self.is_closed() {
            points.push(self.start_point());
            points.push(self.end_point());
        }
        for i in 0..3 {
            if approx_eq(u[i], 0.0) && approx_eq(v[i], 0.0) {
                continue;
            }
            let extreme = v[i].atan2(u[i]).to_degrees();
            for angle in [extreme, extreme + 180.0] {
                if self.contains_angle(angle) {
                    points.push(self.point_at_angle(angle));
                }
            }
        }
        if points.is_empty() {
            // 所有分量都退化时只剩圆心方向上的端点
            points.push(self.start_point());
        }
        BoundingBox::from_points(points)
    }
}

fn angles_approx_within(a: f64, b: f64) -> bool {
    let diff = correct_angle_degrees(a - b);
    diff < ANGLE_TOLERANCE || diff > 360.0 - ANGLE_TOLERANCE
}

/// 规范化角度范围：首尾重合视为满周 `[0, 360]`
pub(crate) fn normalize_span(start_angle: f64, end_angle: f64) -> (f64, f64) {
    let start = correct_angle_degrees(start_angle);
    let end = correct_angle_degrees(end_angle);
    if angles_approx_eq(start, end) {
        (0.0, 360.0)
    } else {
        (start, end)
    }
}

/// 点图元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitivePoint {
    pub location: Point3,
    pub color: IndexedColor,
}

impl PrimitivePoint {
    pub fn new(location: Point3) -> Self {
        Self {
            location,
            color: IndexedColor::Auto,
        }
    }
}

/// 文本图元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveText {
    pub location: Point3,
    pub normal: Vector3,
    pub height: f64,
    /// 旋转角度（度）
    pub rotation: f64,
    pub value: String,
    pub color: IndexedColor,
}
