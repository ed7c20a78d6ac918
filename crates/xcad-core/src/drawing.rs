//! 图纸
//!
//! 图纸是不可变值，由设置、按名称索引的图层集合以及作者组成。
//! 对实体的增删改通过“定位所在图层 → 在图层上编辑 → 用新图层替换旧图层”实现，
//! 每次编辑都得到新的图纸版本，之前发布的版本不受影响。
//!
//! 不变量：图纸中的每个实体恰好属于一个图层，实体ID在整个图纸范围内唯一。

use crate::entity::{Entity, EntityId};
use crate::error::{DocumentError, GeometryError};
use crate::layer::Layer;
use crate::math::{BoundingBox, Point3, Vector3};
use crate::settings::DrawingSettings;
use crate::transform::ViewPort;
use imbl::OrdMap;
use tracing::{debug, warn};

/// 图纸
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    settings: DrawingSettings,
    layers: OrdMap<String, Layer>,
    current_layer_name: String,
    author: Option<String>,
}

/// 图纸的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct DrawingUpdate {
    pub settings: Option<DrawingSettings>,
    pub current_layer_name: Option<String>,
    pub author: Option<Option<String>>,
}

impl Drawing {
    /// 只包含默认图层“0”的空图纸
    pub fn new() -> Self {
        let layer = Layer::default_layer();
        let name = layer.name().to_string();
        Self {
            settings: DrawingSettings::default(),
            layers: OrdMap::unit(name.clone(), layer),
            current_layer_name: name,
            author: None,
        }
    }

    /// 由现有图层组装图纸（文件转换器使用）
    pub fn with_layers(
        settings: DrawingSettings,
        layers: impl IntoIterator<Item = Layer>,
        current_layer_name: impl Into<String>,
        author: Option<String>,
    ) -> Result<Self, DocumentError> {
        let mut map = OrdMap::new();
        for layer in layers {
            let name = layer.name().to_string();
            if map.contains_key(&name) {
                return Err(DocumentError::LayerAlreadyExists(name));
            }
            if let Some(id) = shared_entity(&layer, map.values()) {
                return Err(DocumentError::EntityAlreadyExists(id));
            }
            map.insert(name, layer);
        }
        let current_layer_name = current_layer_name.into();
        if !map.contains_key(&current_layer_name) {
            return Err(DocumentError::LayerNotFound(current_layer_name));
        }
        Ok(Self {
            settings,
            layers: map,
            current_layer_name,
            author,
        })
    }

    pub fn settings(&self) -> &DrawingSettings {
        &self.settings
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn current_layer_name(&self) -> &str {
        &self.current_layer_name
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.layers.get(&self.current_layer_name)
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    /// 按名称顺序遍历图层
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn update(&self, changes: DrawingUpdate) -> Result<Drawing, DocumentError> {
        let current_layer_name = changes
            .current_layer_name
            .unwrap_or_else(|| self.current_layer_name.clone());
        if !self.layers.contains_key(&current_layer_name) {
            return Err(DocumentError::LayerNotFound(current_layer_name));
        }
        Ok(Drawing {
            settings: changes.settings.unwrap_or_else(|| self.settings.clone()),
            layers: self.layers.clone(),
            current_layer_name,
            author: changes.author.unwrap_or_else(|| self.author.clone()),
        })
    }

    // ========================================================================
    // 图层操作
    // ========================================================================

    pub fn add_layer(&self, layer: Layer) -> Result<Drawing, DocumentError> {
        let name = layer.name().to_string();
        if self.layers.contains_key(&name) {
            return Err(DocumentError::LayerAlreadyExists(name));
        }
        debug!("Add layer '{}'", name);
        Ok(self.with_layer_map(self.layers.update(name, layer), self.current_layer_name.clone()))
    }

    /// 删除图层（当前图层不能删除）
    pub fn remove_layer(&self, name: &str) -> Result<Drawing, DocumentError> {
        if !self.layers.contains_key(name) {
            return Err(DocumentError::LayerNotFound(name.to_string()));
        }
        if name == self.current_layer_name {
            return Err(DocumentError::CannotRemoveCurrentLayer(name.to_string()));
        }
        debug!("Remove layer '{}'", name);
        Ok(self.with_layer_map(self.layers.without(name), self.current_layer_name.clone()))
    }

    /// 替换图层；图层改名时当前图层名随之更新
    pub fn replace_layer(&self, old_name: &str, layer: Layer) -> Result<Drawing, DocumentError> {
        if !self.layers.contains_key(old_name) {
            return Err(DocumentError::LayerNotFound(old_name.to_string()));
        }
        let new_name = layer.name().to_string();
        if new_name != old_name && self.layers.contains_key(&new_name) {
            return Err(DocumentError::LayerAlreadyExists(new_name));
        }
        let others = self.layers.values().filter(|l| l.name() != old_name);
        if let Some(id) = shared_entity(&layer, others) {
            return Err(DocumentError::EntityAlreadyExists(id));
        }
        let current = if self.current_layer_name == old_name {
            new_name.clone()
        } else {
            self.current_layer_name.clone()
        };
        Ok(self.with_layer_map(self.layers.without(old_name).update(new_name, layer), current))
    }

    // ========================================================================
    // 实体操作
    // ========================================================================

    /// 查找包含指定实体的图层
    ///
    /// 遍历所有图层；发现多个图层包含同一实体时记录警告并返回第一个。
    pub fn containing_layer(&self, id: EntityId) -> Option<&Layer> {
        let mut hits = self.layers.values().filter(|layer| layer.entity_exists(id));
        let first = hits.next();
        let extra = hits.count();
        if extra > 0 {
            warn!("Entity {} found in {} layers", id, extra + 1);
        }
        first
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.containing_layer(id).and_then(|layer| layer.get(id))
    }

    pub fn add_entity(&self, layer_name: &str, entity: Entity) -> Result<Drawing, DocumentError> {
        let layer = self
            .layers
            .get(layer_name)
            .ok_or_else(|| DocumentError::LayerNotFound(layer_name.to_string()))?;
        if self.containing_layer(entity.id()).is_some() {
            return Err(DocumentError::EntityAlreadyExists(entity.id()));
        }
        debug!("Add {:?} {} to layer '{}'", entity.kind(), entity.id(), layer_name);
        let layer = layer.add(entity)?;
        self.replace_layer(layer_name, layer)
    }

    pub fn add_to_current_layer(&self, entity: Entity) -> Result<Drawing, DocumentError> {
        let name = self.current_layer_name.clone();
        self.add_entity(&name, entity)
    }

    /// 用 `entity` 替换 `old_id`，新实体放在原实体所在的图层
    pub fn replace_entity(&self, old_id: EntityId, entity: Entity) -> Result<Drawing, DocumentError> {
        let layer = self
            .containing_layer(old_id)
            .ok_or(DocumentError::EntityNotFound(old_id))?;
        let new_id = entity.id();
        if new_id != old_id && self.containing_layer(new_id).is_some() {
            return Err(DocumentError::EntityAlreadyExists(new_id));
        }
        debug!("Replace entity {} with {} on layer '{}'", old_id, new_id, layer.name());
        let name = layer.name().to_string();
        let layer = layer.replace(old_id, entity)?;
        self.replace_layer(&name, layer)
    }

    pub fn remove_entity(&self, id: EntityId) -> Result<Drawing, DocumentError> {
        let layer = self
            .containing_layer(id)
            .ok_or(DocumentError::EntityNotFound(id))?;
        debug!("Remove entity {} from layer '{}'", id, layer.name());
        let name = layer.name().to_string();
        let layer = layer.remove(id)?;
        self.replace_layer(&name, layer)
    }

    /// 所有实体（按图层名、再按ID排序）
    pub fn get_entities(&self) -> impl Iterator<Item = &Entity> {
        self.layers.values().flat_map(|layer| layer.entities())
    }

    pub fn entity_count(&self) -> usize {
        self.layers.values().map(|layer| layer.entity_count()).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.layers
            .values()
            .map(|layer| layer.bounding_box())
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    /// 能完整显示所有实体的视口
    ///
    /// `pixel_buffer` 为显示区域四周保留的像素边距。
    pub fn show_all_viewport(
        &self,
        sight: Vector3,
        up: Vector3,
        display_width: f64,
        display_height: f64,
        pixel_buffer: f64,
    ) -> Result<ViewPort, GeometryError> {
        if display_width <= 0.0 || display_height <= 0.0 {
            return Err(GeometryError::InvalidDisplaySize(display_width, display_height));
        }

        let bbox = self.bounding_box();
        if bbox.is_empty() {
            return Ok(ViewPort::new(Point3::origin(), sight, up, display_height));
        }

        // 在视图平面坐标系中求范围
        let view = ViewPort::new(Point3::origin(), sight, up, 1.0).projection_matrix()?;
        let extents = BoundingBox::from_points(bbox.corners().iter().map(|c| view.transform_point(c)));

        let available_width = (display_width - 2.0 * pixel_buffer).max(1.0);
        let available_height = (display_height - 2.0 * pixel_buffer).max(1.0);
        let scale_x = if extents.width() > crate::math::EPSILON {
            available_width / extents.width()
        } else {
            f64::INFINITY
        };
        let scale_y = if extents.height() > crate::math::EPSILON {
            available_height / extents.height()
        } else {
            f64::INFINITY
        };
        let scale = scale_x.min(scale_y);
        let scale = if scale.is_finite() { scale } else { 1.0 };

        let view_width = display_width / scale;
        let view_height = display_height / scale;
        let center = extents.center();
        let local_bottom_left = Point3::new(
            center.x - view_width / 2.0,
            center.y - view_height / 2.0,
            extents.min.z,
        );
        let world_bottom_left = view
            .try_inverse()
            .ok_or(GeometryError::DegenerateProjection)?
            .transform_point(&local_bottom_left);

        debug!(
            "Show-all viewport: bottom_left={:?}, view_height={}",
            world_bottom_left, view_height
        );
        Ok(ViewPort::new(world_bottom_left, sight, up, view_height))
    }

    fn with_layer_map(&self, layers: OrdMap<String, Layer>, current_layer_name: String) -> Drawing {
        Drawing {
            settings: self.settings.clone(),
            layers,
            current_layer_name,
            author: self.author.clone(),
        }
    }
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new()
    }
}

/// `layer` 中第一个已存在于 `others` 某个图层的实体ID
fn shared_entity<'a>(layer: &Layer, others: impl Iterator<Item = &'a Layer>) -> Option<EntityId> {
    let others: Vec<&Layer> = others.collect();
    layer
        .entities()
        .map(|e| e.id())
        .find(|id| others.iter().any(|other| other.entity_exists(*id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::IndexedColor;
    use crate::geometry::Line;
    use crate::layer::LayerUpdate;
    use crate::math::{approx_eq, points_approx_eq};

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
        Entity::new(Line::new(
            Point3::new(x1, y1, 0.0),
            Point3::new(x2, y2, 0.0),
            IndexedColor::Auto,
        ))
    }

    #[test]
    fn test_add_entity_publishes_new_version() {
        let drawing = Drawing::new();
        let e = line(0.0, 0.0, 1.0, 0.0);
        let next = drawing.add_to_current_layer(e.clone()).unwrap();

        assert_eq!(drawing.entity_count(), 0);
        assert_eq!(next.entity_count(), 1);
        assert_eq!(next.containing_layer(e.id()).map(|l| l.name()), Some("0"));
        assert_eq!(
            next.add_to_current_layer(e.clone()),
            Err(DocumentError::EntityAlreadyExists(e.id()))
        );
    }

    #[test]
    fn test_entity_ids_unique_across_layers() {
        let e = line(0.0, 0.0, 1.0, 0.0);
        let drawing = Drawing::new()
            .add_layer(Layer::new("other", IndexedColor::RED))
            .and_then(|d| d.add_entity("0", e.clone()))
            .unwrap();
        assert_eq!(
            drawing.add_entity("other", e.clone()),
            Err(DocumentError::EntityAlreadyExists(e.id()))
        );
        assert!(matches!(
            drawing.add_entity("missing", line(0.0, 0.0, 2.0, 0.0)),
            Err(DocumentError::LayerNotFound(_))
        ));
    }

    #[test]
    fn test_replace_and_remove_entity() {
        let a = line(0.0, 0.0, 1.0, 0.0);
        let b = line(0.0, 0.0, 2.0, 0.0);
        let drawing = Drawing::new()
            .add_layer(Layer::new("walls", IndexedColor::Auto))
            .and_then(|d| d.add_entity("walls", a.clone()))
            .unwrap();

        let replaced = drawing.replace_entity(a.id(), b.clone()).unwrap();
        assert_eq!(replaced.containing_layer(b.id()).map(|l| l.name()), Some("walls"));
        assert!(replaced.containing_layer(a.id()).is_none());
        assert!(drawing.containing_layer(a.id()).is_some());

        let removed = replaced.remove_entity(b.id()).unwrap();
        assert_eq!(removed.entity_count(), 0);
        assert_eq!(removed.remove_entity(b.id()), Err(DocumentError::EntityNotFound(b.id())));
    }

    #[test]
    fn test_layer_operations() {
        let drawing = Drawing::new()
            .add_layer(Layer::new("a", IndexedColor::Auto))
            .unwrap();
        assert_eq!(drawing.layer_count(), 2);
        assert!(drawing.add_layer(Layer::new("a", IndexedColor::RED)).is_err());
        assert_eq!(
            drawing.remove_layer("0"),
            Err(DocumentError::CannotRemoveCurrentLayer("0".to_string()))
        );
        assert_eq!(drawing.remove_layer("a").unwrap().layer_count(), 1);

        // 改名当前图层
        let renamed = drawing
            .replace_layer("0", Layer::new("base", IndexedColor::Auto))
            .unwrap();
        assert_eq!(renamed.current_layer_name(), "base");
        assert!(renamed.current_layer().is_some());
    }

    #[test]
    fn test_update_current_layer() {
        let drawing = Drawing::new()
            .add_layer(Layer::new("a", IndexedColor::Auto))
            .unwrap();
        let switched = drawing
            .update(DrawingUpdate {
                current_layer_name: Some("a".to_string()),
                author: Some(Some("tester".to_string())),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(switched.current_layer_name(), "a");
        assert_eq!(switched.author(), Some("tester"));
        assert!(drawing
            .update(DrawingUpdate {
                current_layer_name: Some("nope".to_string()),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_with_layers_requires_current() {
        let result = Drawing::with_layers(
            DrawingSettings::default(),
            [Layer::new("x", IndexedColor::Auto)],
            "y",
            None,
        );
        assert_eq!(result, Err(DocumentError::LayerNotFound("y".to_string())));
    }

    #[test]
    fn test_replace_layer_rejects_entity_from_sibling() {
        let e = line(0.0, 0.0, 1.0, 0.0);
        let drawing = Drawing::new()
            .add_layer(Layer::new("walls", IndexedColor::Auto))
            .and_then(|d| d.add_entity("0", e.clone()))
            .unwrap();

        let stolen = Layer::new("walls", IndexedColor::RED).add(e.clone()).unwrap();
        assert_eq!(
            drawing.replace_layer("walls", stolen),
            Err(DocumentError::EntityAlreadyExists(e.id()))
        );

        // 替换包含该实体的图层本身是允许的
        let recolored = drawing.layer("0").unwrap().update(LayerUpdate {
            color: Some(IndexedColor::RED),
            ..Default::default()
        });
        let next = drawing.replace_layer("0", recolored).unwrap();
        assert_eq!(next.containing_layer(e.id()).map(|l| l.color()), Some(IndexedColor::RED));
    }

    #[test]
    fn test_with_layers_rejects_shared_entity() {
        let e = line(0.0, 0.0, 1.0, 0.0);
        let a = Layer::new("a", IndexedColor::Auto).add(e.clone()).unwrap();
        let b = Layer::new("b", IndexedColor::Auto).add(e.clone()).unwrap();
        let result = Drawing::with_layers(DrawingSettings::default(), [a, b], "a", None);
        assert_eq!(result, Err(DocumentError::EntityAlreadyExists(e.id())));
    }

    #[test]
    fn test_show_all_viewport() {
        let drawing = Drawing::new()
            .add_to_current_layer(line(0.0, 0.0, 10.0, 0.0))
            .and_then(|d| d.add_to_current_layer(line(0.0, 10.0, 10.0, 10.0)))
            .unwrap();
        let vp = drawing
            .show_all_viewport(Vector3::z(), Vector3::y(), 100.0, 100.0, 0.0)
            .unwrap();
        assert!(approx_eq(vp.view_height, 10.0));
        assert!(points_approx_eq(&vp.bottom_left, &Point3::new(0.0, 0.0, 0.0)));

        // 宽显示区：高度决定缩放，水平居中
        let vp = drawing
            .show_all_viewport(Vector3::z(), Vector3::y(), 200.0, 100.0, 0.0)
            .unwrap();
        assert!(approx_eq(vp.view_height, 10.0));
        assert!(points_approx_eq(&vp.bottom_left, &Point3::new(-5.0, 0.0, 0.0)));

        assert_eq!(
            drawing.show_all_viewport(Vector3::z(), Vector3::y(), -1.0, 100.0, 0.0),
            Err(GeometryError::InvalidDisplaySize(-1.0, 100.0))
        );
    }
}
