//! 捕捉点
//!
//! 捕捉点是实体几何上的特征点（圆心、象限点、端点、中点），由实体字段纯函数派生，
//! 供外部的点选/捕捉逻辑使用。

use crate::math::Point3;
use serde::{Deserialize, Serialize};

/// 捕捉点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapPointKind {
    /// 圆心/椭圆中心
    Center,
    /// 象限点
    Quadrant,
    /// 端点
    EndPoint,
    /// 中点
    MidPoint,
}

/// 捕捉点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    pub kind: SnapPointKind,
    pub point: Point3,
}

impl SnapPoint {
    pub fn center(point: Point3) -> Self {
        Self {
            kind: SnapPointKind::Center,
            point,
        }
    }

    pub fn quadrant(point: Point3) -> Self {
        Self {
            kind: SnapPointKind::Quadrant,
            point,
        }
    }

    pub fn end_point(point: Point3) -> Self {
        Self {
            kind: SnapPointKind::EndPoint,
            point,
        }
    }

    pub fn mid_point(point: Point3) -> Self {
        Self {
            kind: SnapPointKind::MidPoint,
            point,
        }
    }

    /// 是否在容差范围内
    pub fn is_near(&self, point: &Point3, tolerance: f64) -> bool {
        (self.point - point).norm() <= tolerance
    }
}

/// 查找距离 `point` 最近且在容差范围内的捕捉点
pub fn nearest_snap_point(
    snap_points: &[SnapPoint],
    point: &Point3,
    tolerance: f64,
) -> Option<SnapPoint> {
    snap_points
        .iter()
        .filter(|s| s.is_near(point, tolerance))
        .min_by(|a, b| {
            let da = (a.point - point).norm_squared();
            let db = (b.point - point).norm_squared();
            da.total_cmp(&db)
        })
        .copied()
}
