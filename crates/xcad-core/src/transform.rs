//! 3D变换操作
//!
//! - 单位圆参数化：把任意椭圆/圆弧/圆映射到原点处的标准单位圆
//! - 平面投影：把任意3D点映射到目标平面的局部2D坐标系
//! - 视口：显示/打印平面 + 缩放 + 坐标风格
//! - 屏幕变换：先绕自身参考点旋转，再平移

use crate::error::GeometryError;
use crate::math::{right_vector_from_normal, Matrix4, Point3, Vector3, VectorExt};
use serde::{Deserialize, Serialize};

/// 平移矩阵
pub fn translation(offset: &Vector3) -> Matrix4 {
    Matrix4::new_translation(offset)
}

/// 绕过 `center` 且平行于Z轴的轴旋转（度，逆时针为正）
pub fn rotation_about_z(center: &Point3, degrees: f64) -> Matrix4 {
    translation(&center.coords)
        * Matrix4::new_rotation(Vector3::z() * degrees.to_radians())
        * translation(&-center.coords)
}

/// 单位圆投影矩阵
///
/// 把单位圆上的点 `(cos θ, sin θ, 0)` 映射到椭圆上参数角为 θ 的点。
/// 调用方保证 `normal` 非零、`major_axis` 非零且与 `normal` 正交。
pub fn unit_circle_projection(
    center: &Point3,
    major_axis: &Vector3,
    normal: &Vector3,
    minor_axis_ratio: f64,
) -> Matrix4 {
    let length = major_axis.norm();
    let normal = normal.normalize();
    let minor = normal.cross(&major_axis.normalize()) * length * minor_axis_ratio;
    frame_matrix(center, major_axis, &minor, &normal)
}

/// 以三个列向量和原点构造仿射矩阵
fn frame_matrix(origin: &Point3, x: &Vector3, y: &Vector3, z: &Vector3) -> Matrix4 {
    Matrix4::new(
        x.x, y.x, z.x, origin.x,
        x.y, y.y, z.y, origin.y,
        x.z, y.z, z.z, origin.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// 正交标准基的逆变换（世界 → 局部）
fn inverse_orthonormal_frame(origin: &Point3, x: &Vector3, y: &Vector3, z: &Vector3) -> Matrix4 {
    let o = origin.coords;
    Matrix4::new(
        x.x, x.y, x.z, -x.dot(&o),
        y.x, y.y, y.z, -y.dot(&o),
        z.x, z.y, z.z, -z.dot(&o),
        0.0, 0.0, 0.0, 1.0,
    )
}

/// 平面（点 + 法向量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Point3,
    pub normal: Vector3,
}

impl Plane {
    pub fn new(point: Point3, normal: Vector3) -> Result<Self, GeometryError> {
        Ok(Self {
            point,
            normal: normal.normalized()?,
        })
    }

    /// 过原点的XY平面
    pub fn xy() -> Self {
        Self {
            point: Point3::origin(),
            normal: Vector3::z(),
        }
    }

    /// 点到平面的有符号距离
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.point).dot(&self.normal)
    }

    /// 把平面映射到XY平面的投影矩阵
    ///
    /// 平面上的点映射到 z = 0，`point` 映射到原点。
    pub fn to_xy_plane_projection(&self) -> Result<Matrix4, GeometryError> {
        let normal = self.normal.normalized()?;
        let right = right_vector_from_normal(&normal)?;
        let up = normal.cross(&right).normalized()?;
        Ok(inverse_orthonormal_frame(&self.point, &right, &up, &normal))
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::xy()
    }
}

/// 显示坐标风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionStyle {
    /// 原点在左上角，X向右、Y向下
    OriginTopLeft,
    /// 原点在左下角，X向右、Y向上
    OriginBottomLeft,
    /// 原点在中心，X/Y范围为 [-1, 1]
    OriginCenter,
}

/// 视口
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPort {
    /// 视图左下角（世界坐标）
    pub bottom_left: Point3,
    /// 视线方向（指向观察者）
    pub sight: Vector3,
    /// 向上方向
    pub up: Vector3,
    /// 视图高度（世界单位）
    pub view_height: f64,
}

impl ViewPort {
    pub fn new(bottom_left: Point3, sight: Vector3, up: Vector3, view_height: f64) -> Self {
        Self {
            bottom_left,
            sight,
            up,
            view_height,
        }
    }

    /// 俯视图
    pub fn top_view(bottom_left: Point3, view_height: f64) -> Self {
        Self::new(bottom_left, Vector3::z(), Vector3::y(), view_height)
    }

    /// 世界坐标 → 视图平面坐标（左下角为原点，单位不变）
    pub fn projection_matrix(&self) -> Result<Matrix4, GeometryError> {
        let sight = self.sight.normalized()?;
        let right = self.up.cross(&sight).normalized()?;
        let up = sight.cross(&right).normalized()?;
        Ok(inverse_orthonormal_frame(&self.bottom_left, &right, &up, &sight))
    }

    /// 世界坐标 → 显示坐标
    pub fn transformation_matrix(
        &self,
        display_width: f64,
        display_height: f64,
        style: ProjectionStyle,
    ) -> Result<Matrix4, GeometryError> {
        if self.view_height <= 0.0 {
            return Err(GeometryError::InvalidViewHeight(self.view_height));
        }
        if display_height <= 0.0 || display_width <= 0.0 {
            return Err(GeometryError::InvalidDisplaySize(display_width, display_height));
        }

        let projection = self.projection_matrix()?;
        let scale = display_height / self.view_height;
        let display = match style {
            ProjectionStyle::OriginBottomLeft => {
                Matrix4::new_nonuniform_scaling(&Vector3::new(scale, scale, 1.0))
            }
            ProjectionStyle::OriginTopLeft => {
                translation(&Vector3::new(0.0, display_height, 0.0))
                    * Matrix4::new_nonuniform_scaling(&Vector3::new(scale, -scale, 1.0))
            }
            ProjectionStyle::OriginCenter => {
                let view_width = self.view_height * display_width / display_height;
                translation(&Vector3::new(-1.0, -1.0, 0.0))
                    * Matrix4::new_nonuniform_scaling(&Vector3::new(
                        2.0 / view_width,
                        2.0 / self.view_height,
                        1.0,
                    ))
            }
        };

        Ok(display * projection)
    }
}

/// 屏幕/打印变换
///
/// 固定顺序：先绕 `pivot` 旋转，再平移。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenTransform {
    /// 旋转角度（度）
    pub rotation: f64,
    /// 旋转参考点
    pub pivot: Point3,
    /// 平移量
    pub translation: Vector3,
}

impl ScreenTransform {
    pub fn identity() -> Self {
        Self {
            rotation: 0.0,
            pivot: Point3::origin(),
            translation: Vector3::zeros(),
        }
    }

    pub fn rotation_about(pivot: Point3, degrees: f64) -> Self {
        Self {
            rotation: degrees,
            pivot,
            translation: Vector3::zeros(),
        }
    }

    /// 追加平移（仍在旋转之后生效）
    pub fn then_translate(mut self, offset: &Vector3) -> Self {
        self.translation += offset;
        self
    }

    pub fn to_matrix(&self) -> Matrix4 {
        translation(&self.translation) * rotation_about_z(&self.pivot, self.rotation)
    }

    pub fn transform_point(&self, point: &Point3) -> Point3 {
        self.to_matrix().transform_point(point)
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self::identity()
    }
}
