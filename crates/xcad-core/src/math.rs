//! 数学基础类型
//!
//! 基于 nalgebra 提供的向量、点和矩阵类型的别名，以及容差比较和角度工具。
//! 所有角度在公开接口中以度为单位，范围 `[0, 360)`。

use crate::error::GeometryError;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// 3D点类型（绝对位置）
pub type Point3 = na::Point3<f64>;

/// 3D向量类型（方向/位移）
pub type Vector3 = na::Vector3<f64>;

/// 3D齐次变换矩阵
pub type Matrix4 = na::Matrix4<f64>;

/// 2x2矩阵（用于投影后的二次曲线分解）
pub type Matrix2 = na::Matrix2<f64>;

/// 数值容差，用于几何比较
pub const EPSILON: f64 = 1e-10;

/// 判断两个浮点数是否近似相等
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// 判断两个点是否近似相等
#[inline]
pub fn points_approx_eq(a: &Point3, b: &Point3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

/// 判断两个向量是否近似相等
#[inline]
pub fn vectors_approx_eq(a: &Vector3, b: &Vector3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

/// `value` 是否严格位于 `(lower, upper)` 内部（两端各收缩一个容差）
pub fn between_narrow(lower: f64, upper: f64, value: f64) -> bool {
    let (lo, hi) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };
    value > lo + EPSILON && value < hi - EPSILON
}

/// 将角度规范到 `[0, 360)`
pub fn correct_angle_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    if approx_eq(a, 360.0) {
        0.0
    } else {
        a
    }
}

/// 两个角度是否在模 360 意义下相等
pub fn angles_approx_eq(a: f64, b: f64) -> bool {
    let diff = correct_angle_degrees(a - b);
    diff < EPSILON || diff > 360.0 - EPSILON
}

/// 两个向量之间的夹角（度）
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    a.angle(b).to_degrees()
}

/// 由法向量计算“右”方向（任意轴算法的变体）
///
/// 法向量为 ±Z 时使用 `Y × n`，否则使用 `Z × n`。
pub fn right_vector_from_normal(normal: &Vector3) -> Result<Vector3, GeometryError> {
    let normal = normal.normalized()?;
    let right = if normal.is_parallel_to(&Vector3::z()) {
        Vector3::y().cross(&normal)
    } else {
        Vector3::z().cross(&normal)
    };
    right.normalized()
}

/// 向量的扩展操作
pub trait VectorExt {
    /// 是否为零向量
    fn is_zero_vector(&self) -> bool;

    /// 是否正交
    fn is_orthogonal_to(&self, other: &Vector3) -> bool;

    /// 是否平行（同向或反向）
    fn is_parallel_to(&self, other: &Vector3) -> bool;

    /// XY平面内的角度（度），范围 `[0, 360)`
    fn to_angle(&self) -> f64;

    /// 归一化；零向量返回错误
    fn normalized(&self) -> Result<Vector3, GeometryError>;
}

impl VectorExt for Vector3 {
    fn is_zero_vector(&self) -> bool {
        self.norm() < EPSILON
    }

    fn is_orthogonal_to(&self, other: &Vector3) -> bool {
        self.dot(other).abs() <= EPSILON * self.norm().max(1.0) * other.norm().max(1.0)
    }

    fn is_parallel_to(&self, other: &Vector3) -> bool {
        self.cross(other).norm() <= EPSILON * self.norm().max(1.0) * other.norm().max(1.0)
    }

    fn to_angle(&self) -> f64 {
        correct_angle_degrees(self.y.atan2(self.x).to_degrees())
    }

    fn normalized(&self) -> Result<Vector3, GeometryError> {
        self.try_normalize(EPSILON)
            .ok_or(GeometryError::ZeroLengthVector)
    }
}

/// 3D轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// 创建新的包围盒
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// 创建空的包围盒（无效状态）
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// 从点集创建包围盒
    pub fn from_points(points: impl IntoIterator<Item = Point3>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    /// 扩展包围盒以包含指定点
    pub fn expand_to_include(&mut self, point: &Point3) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// 合并两个包围盒
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// 平移
    pub fn translated(&self, offset: &Vector3) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.min + offset, self.max + offset)
    }

    /// 八个角点
    pub fn corners(&self) -> [Point3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// 检查是否与另一个包围盒相交
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// 检查是否包含指定点
    pub fn contains(&self, point: &Point3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// 获取中心点
    pub fn center(&self) -> Point3 {
        na::center(&self.min, &self.max)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> f64 {
        self.max.z - self.min.z
    }
}
