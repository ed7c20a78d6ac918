//! 错误定义
//!
//! 几何构造错误在构造时立即失败；文档结构错误由图层/图纸的结构编辑返回。
//! 无法确定方向的编辑（参考点恰好落在几何上）以及不支持的实体类型
//! 不属于错误，而是以 `None` 或空的编辑结果表示。

use crate::entity::EntityId;
use thiserror::Error;

/// 几何输入错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Cannot normalize a zero-length vector")]
    ZeroLengthVector,

    #[error("Major axis must be orthogonal to the normal")]
    NonOrthogonalAxes,

    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    #[error("Invalid minor axis ratio: {0}")]
    InvalidRatio(f64),

    #[error("Invalid text height: {0}")]
    InvalidHeight(f64),

    #[error("Invalid view height: {0}")]
    InvalidViewHeight(f64),

    #[error("Invalid display size: {0} x {1}")]
    InvalidDisplaySize(f64, f64),

    #[error("Projection matrix is not invertible")]
    DegenerateProjection,
}

/// 图层/图纸结构编辑错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer already exists: {0}")]
    LayerAlreadyExists(String),

    #[error("Cannot remove current layer: {0}")]
    CannotRemoveCurrentLayer(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity already exists: {0}")]
    EntityAlreadyExists(EntityId),
}
