//! XCAD 演示程序
//!
//! 构造一张示例图纸，依次执行修剪、延伸、偏移和旋转，
//! 然后计算“显示全部”视口并输出投影结果。
//!
//! 用法：`xcad [settings.json]`，日志级别可通过环境变量 `XCAD_LOG` 设置。

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use xcad_core::color::{ColorMap, IndexedColor};
use xcad_core::drawing::{Drawing, DrawingUpdate};
use xcad_core::edit::rotate;
use xcad_core::entity::Entity;
use xcad_core::geometry::{Arc, Circle, Line, Text};
use xcad_core::history::DrawingHistory;
use xcad_core::layer::Layer;
use xcad_core::math::{Point3, Vector3};
use xcad_core::offset::offset;
use xcad_core::projection::{project_drawing, ProjectedEntity};
use xcad_core::settings::DrawingSettings;
use xcad_core::transform::ProjectionStyle;
use xcad_core::trim::{extend, trim, SelectedEntity};

const DISPLAY_WIDTH: f64 = 800.0;
const DISPLAY_HEIGHT: f64 = 600.0;
const PIXEL_BUFFER: f64 = 20.0;

fn load_settings() -> Result<DrawingSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {}", path))?;
            let settings = serde_json::from_str(&text)
                .with_context(|| format!("Invalid settings file {}", path))?;
            info!("Loaded settings from {}", path);
            Ok(settings)
        }
        None => Ok(DrawingSettings::default()),
    }
}

fn main() -> Result<()> {
    // 初始化日志
    let filter = EnvFilter::try_from_env("XCAD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_env_filter(filter).finish())?;

    info!("Starting XCAD demo");

    let settings = load_settings()?;
    let drawing = Drawing::new()
        .add_layer(Layer::new("geometry", IndexedColor::CYAN))?
        .update(DrawingUpdate {
            settings: Some(settings),
            current_layer_name: Some("geometry".to_string()),
            ..Default::default()
        })?;
    let mut history = DrawingHistory::new(drawing);

    let target = Entity::new(Line::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        IndexedColor::Auto,
    ));
    let boundary = Entity::new(Line::new(
        Point3::new(5.0, -5.0, 0.0),
        Point3::new(5.0, 5.0, 0.0),
        IndexedColor::RED,
    ));
    let short = Entity::new(Line::new(
        Point3::new(0.0, 3.0, 0.0),
        Point3::new(2.0, 3.0, 0.0),
        IndexedColor::Auto,
    ));
    let circle = Entity::new(Circle::new(
        Point3::new(5.0, 0.0, 0.0),
        2.0,
        Vector3::z(),
        IndexedColor::Auto,
    )?);
    let arc = Entity::new(Arc::new(
        Point3::new(0.0, 0.0, 0.0),
        3.0,
        0.0,
        45.0,
        Vector3::z(),
        IndexedColor::YELLOW,
    )?);
    let label = Entity::new(Text::new(
        Point3::new(0.0, -3.0, 0.0),
        0.5,
        0.0,
        "XCAD",
        IndexedColor::Auto,
    )?);

    let mut next = history.current().clone();
    for entity in [&target, &boundary, &short, &circle, &arc, &label] {
        next = next.add_to_current_layer(entity.clone())?;
    }
    history.push(next, "create geometry");

    // 修剪：删除边界左侧的部分
    let boundaries = boundary.primitives();
    let result = trim(
        &SelectedEntity::new(target.clone(), Point3::new(1.0, 0.0, 0.0)),
        &boundaries,
    );
    info!("Trim removed {}, added {}", result.removed.len(), result.added.len());
    let next = result.apply(history.current())?;
    history.push(next, "trim");

    // 延伸：短线段延伸到边界
    let result = extend(
        &SelectedEntity::new(short.clone(), Point3::new(2.0, 3.0, 0.0)),
        &boundaries,
    );
    info!("Extend removed {}, added {}", result.removed.len(), result.added.len());
    let next = result.apply(history.current())?;
    history.push(next, "extend");

    // 偏移：圆向外偏移
    match offset(history.current(), &circle, &Point3::new(10.0, 10.0, 0.0), 1.0) {
        Some(entity) => {
            let next = history.current().add_to_current_layer(entity)?;
            history.push(next, "offset");
        }
        None => warn!("Offset produced no entity"),
    }

    // 旋转：圆弧绕原点旋转90度
    let rotated = rotate(&arc, &Point3::origin(), 90.0);
    let next = history.current().replace_entity(arc.id(), rotated)?;
    history.push(next, "rotate");

    if history.undo() {
        info!("Undo: {} entities", history.current().entity_count());
    }
    if history.redo() {
        info!("Redo: {} entities", history.current().entity_count());
    }

    let drawing = history.current();
    let bbox = drawing.bounding_box();
    info!(
        "Drawing extents: {} x {}",
        drawing.settings().format_length(bbox.width()),
        drawing.settings().format_length(bbox.height())
    );

    let viewport = drawing.show_all_viewport(
        Vector3::z(),
        Vector3::y(),
        DISPLAY_WIDTH,
        DISPLAY_HEIGHT,
        PIXEL_BUFFER,
    )?;
    let matrix = viewport.transformation_matrix(
        DISPLAY_WIDTH,
        DISPLAY_HEIGHT,
        ProjectionStyle::OriginTopLeft,
    )?;

    let color_map = ColorMap::default();
    let default_color = drawing.settings().default_color;
    for projected in project_drawing(drawing, &matrix) {
        let color = projected.resolve_color(&color_map, default_color).to_hex_string();
        match &projected {
            ProjectedEntity::Line(l) => {
                info!("Line {} {:?} -> {:?} {}", l.entity.id(), l.p1, l.p2, color)
            }
            ProjectedEntity::Circle(c) => info!(
                "Circle {} center {:?} radii {:.2}/{:.2} {}",
                c.entity.id(),
                c.conic.center,
                c.conic.radius_x,
                c.conic.radius_y,
                color
            ),
            ProjectedEntity::Arc(a) => info!(
                "Arc {} {:?} -> {:?} {}",
                a.entity.id(),
                a.start_point(),
                a.end_point(),
                color
            ),
            ProjectedEntity::Text(t) => {
                info!("Text {} '{}' at {:?} {}", t.entity.id(), t.value, t.location, color)
            }
            ProjectedEntity::Polyline(p) => {
                info!("Polyline {} with {} points {}", p.entity.id(), p.points.len(), color)
            }
            ProjectedEntity::Aggregate(a) => {
                info!("Aggregate {} with {} children", a.entity.id(), a.flattened().len())
            }
        }
    }

    Ok(())
}
