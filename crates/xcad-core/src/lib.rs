//! XCAD 核心几何引擎
//!
//! 提供3D几何图元、不可变的图层/图纸文档结构，以及修剪、延伸、偏移、
//! 移动/旋转和投影等编辑与显示算法。
//!
//! # 架构设计
//!
//! - `Primitive`: 最小的可渲染/可求交单元（线段、椭圆弧、点、文字）
//! - `Geometry`: 用户可见的形状，分解为若干图元
//! - `Entity`: ID + 几何
//! - `Layer` / `Drawing`: 持久化的不可变文档，每次编辑返回新版本
//!
//! 所有算法都是纯函数，不修改输入。
//!
//! # 示例
//!
//! ```rust
//! use xcad_core::prelude::*;
//!
//! // 在当前图层添加一条线段
//! let line = Entity::new(Line::new(
//!     Point3::origin(),
//!     Point3::new(100.0, 50.0, 0.0),
//!     IndexedColor::Auto,
//! ));
//! let drawing = Drawing::new().add_to_current_layer(line).unwrap();
//!
//! assert_eq!(drawing.entity_count(), 1);
//! ```

pub mod color;
pub mod drawing;
pub mod edit;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod history;
pub mod intersection;
pub mod layer;
pub mod math;
pub mod offset;
pub mod primitive;
pub mod projection;
pub mod settings;
pub mod snap;
pub mod transform;
pub mod trim;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::color::{ColorMap, IndexedColor, RealColor};
    pub use crate::drawing::{Drawing, DrawingUpdate};
    pub use crate::edit::{move_entity, rotate};
    pub use crate::entity::{Entity, EntityId, EntityKind};
    pub use crate::error::{DocumentError, GeometryError};
    pub use crate::geometry::{Aggregate, Arc, Circle, Ellipse, Geometry, Line, Polyline, Text};
    pub use crate::history::DrawingHistory;
    pub use crate::intersection::intersect;
    pub use crate::layer::Layer;
    pub use crate::math::{BoundingBox, Point3, Vector3};
    pub use crate::offset::offset;
    pub use crate::primitive::{Primitive, PrimitiveEllipse, PrimitiveLine};
    pub use crate::projection::{project, project_drawing, ProjectedEntity};
    pub use crate::settings::{DrawingSettings, UnitFormat};
    pub use crate::transform::{Plane, ProjectionStyle, ScreenTransform, ViewPort};
    pub use crate::trim::{extend, trim, EditResult, SelectedEntity};
}
