//! 图层管理
//!
//! 图层是不可变值：添加、替换、删除实体都返回新的图层，旧版本保持不变，
//! 新旧版本通过 `imbl::OrdMap` 共享未修改的子树。

use crate::color::IndexedColor;
use crate::entity::{Entity, EntityId};
use crate::error::DocumentError;
use crate::math::BoundingBox;
use imbl::OrdMap;
use tracing::trace;

/// 图层定义
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    color: IndexedColor,
    is_visible: bool,
    entities: OrdMap<EntityId, Entity>,
}

/// 图层的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct LayerUpdate {
    pub name: Option<String>,
    pub color: Option<IndexedColor>,
    pub is_visible: Option<bool>,
}

impl Layer {
    /// 创建新的空图层
    pub fn new(name: impl Into<String>, color: IndexedColor) -> Self {
        Self {
            name: name.into(),
            color,
            is_visible: true,
            entities: OrdMap::new(),
        }
    }

    /// 默认图层（0层）
    pub fn default_layer() -> Self {
        Self::new("0", IndexedColor::Auto)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> IndexedColor {
        self.color
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// 按ID顺序遍历实体
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// 添加实体
    pub fn add(&self, entity: Entity) -> Result<Layer, DocumentError> {
        let id = entity.id();
        if self.entity_exists(id) {
            return Err(DocumentError::EntityAlreadyExists(id));
        }
        trace!("Layer '{}': add entity {}", self.name, id);
        Ok(self.with_entities(self.entities.update(id, entity)))
    }

    /// 删除实体
    pub fn remove(&self, id: EntityId) -> Result<Layer, DocumentError> {
        if !self.entity_exists(id) {
            return Err(DocumentError::EntityNotFound(id));
        }
        trace!("Layer '{}': remove entity {}", self.name, id);
        Ok(self.with_entities(self.entities.without(&id)))
    }

    /// 用 `entity` 替换 `old_id` 对应的实体
    pub fn replace(&self, old_id: EntityId, entity: Entity) -> Result<Layer, DocumentError> {
        if !self.entity_exists(old_id) {
            return Err(DocumentError::EntityNotFound(old_id));
        }
        let new_id = entity.id();
        if new_id != old_id && self.entity_exists(new_id) {
            return Err(DocumentError::EntityAlreadyExists(new_id));
        }
        trace!("Layer '{}': replace entity {} with {}", self.name, old_id, new_id);
        Ok(self.with_entities(self.entities.without(&old_id).update(new_id, entity)))
    }

    pub fn update(&self, changes: LayerUpdate) -> Layer {
        Layer {
            name: changes.name.unwrap_or_else(|| self.name.clone()),
            color: changes.color.unwrap_or(self.color),
            is_visible: changes.is_visible.unwrap_or(self.is_visible),
            entities: self.entities.clone(),
        }
    }

    /// 所有实体包围盒的并集
    pub fn bounding_box(&self) -> BoundingBox {
        self.entities()
            .map(|e| e.bounding_box())
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    fn with_entities(&self, entities: OrdMap<EntityId, Entity>) -> Layer {
        Layer {
            name: self.name.clone(),
            color: self.color,
            is_visible: self.is_visible,
            entities,
        }
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::default_layer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Line;
    use crate::math::Point3;

    fn line(x: f64) -> Entity {
        Entity::new(Line::new(
            Point3::new(x, 0.0, 0.0),
            Point3::new(x, 1.0, 0.0),
            IndexedColor::Auto,
        ))
    }

    #[test]
    fn test_add_returns_new_version() {
        let empty = Layer::new("walls", IndexedColor::RED);
        let a = line(0.0);
        let id = a.id();
        let one = empty.add(a.clone()).unwrap();

        assert_eq!(empty.entity_count(), 0);
        assert_eq!(one.entity_count(), 1);
        assert!(one.entity_exists(id));
        assert_eq!(one.add(a), Err(DocumentError::EntityAlreadyExists(id)));
    }

    #[test]
    fn test_remove_and_replace() {
        let a = line(0.0);
        let b = line(1.0);
        let layer = Layer::default_layer().add(a.clone()).unwrap();

        let replaced = layer.replace(a.id(), b.clone()).unwrap();
        assert!(!replaced.entity_exists(a.id()));
        assert!(replaced.entity_exists(b.id()));
        assert!(layer.entity_exists(a.id()));

        let removed = replaced.remove(b.id()).unwrap();
        assert_eq!(removed.entity_count(), 0);
        assert_eq!(removed.remove(b.id()), Err(DocumentError::EntityNotFound(b.id())));
        assert!(removed.replace(a.id(), line(2.0)).is_err());
    }

    #[test]
    fn test_update_keeps_entities() {
        let layer = Layer::default_layer().add(line(3.0)).unwrap();
        let hidden = layer.update(LayerUpdate {
            is_visible: Some(false),
            ..Default::default()
        });
        assert!(!hidden.is_visible());
        assert!(layer.is_visible());
        assert_eq!(hidden.entity_count(), 1);
        assert_eq!(hidden.name(), "0");
    }

    #[test]
    fn test_bounding_box() {
        let layer = Layer::default_layer()
            .add(line(0.0))
            .and_then(|l| l.add(line(4.0)))
            .unwrap();
        let bbox = layer.bounding_box();
        assert!(crate::math::approx_eq(bbox.width(), 4.0));
        assert!(crate::math::approx_eq(bbox.height(), 1.0));
        assert!(Layer::default_layer().bounding_box().is_empty());
    }
}
