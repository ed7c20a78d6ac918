//! 实体标识和管理
//!
//! 实体是带有稳定句柄的不可变几何值。句柄只用于图层中的树形存储，
//! 几何比较使用 [`Entity::equivalent_to`]，与句柄无关。

use crate::color::IndexedColor;
use crate::geometry::Geometry;
use crate::math::BoundingBox;
use crate::primitive::Primitive;
use crate::snap::SnapPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 全局实体ID生成器
static ENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 实体唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// 创建新的实体ID
    pub fn new() -> Self {
        Self(ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// 从指定值创建（用于文件加载）
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Line,
    Circle,
    Arc,
    Ellipse,
    Polyline,
    Text,
    Aggregate,
}

/// CAD实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    geometry: Geometry,
}

impl Entity {
    /// 创建新实体（分配新的ID）
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            id: EntityId::new(),
            geometry: geometry.into(),
        }
    }

    /// 使用指定ID创建（用于文件加载）
    pub fn with_id(id: EntityId, geometry: impl Into<Geometry>) -> Self {
        Self {
            id,
            geometry: geometry.into(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kind(&self) -> EntityKind {
        self.geometry.kind()
    }

    pub fn color(&self) -> IndexedColor {
        self.geometry.color()
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        self.geometry.primitives()
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        self.geometry.snap_points()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.geometry.bounding_box()
    }

    /// 以新几何替换，得到新ID的新实体
    pub fn with_geometry(&self, geometry: impl Into<Geometry>) -> Entity {
        Entity::new(geometry)
    }

    /// 几何等价，忽略ID
    pub fn equivalent_to(&self, other: &Entity) -> bool {
        self.geometry.equivalent_to(&other.geometry)
    }
}
