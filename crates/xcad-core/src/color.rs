//! 颜色定义
//!
//! 实体与图层使用调色板索引颜色 [`IndexedColor`]，其中 `Auto` 表示从上下文继承
//! （实体 → 聚合体 → 图层 → 全局默认值）。只有在渲染/打印时才通过 [`ColorMap`]
//! 解析为真实的 [`RealColor`]。

use serde::{Deserialize, Serialize};

/// 调色板索引颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexedColor {
    /// 跟随上下文
    #[default]
    Auto,
    /// 调色板索引
    Index(u8),
}

impl IndexedColor {
    pub const RED: IndexedColor = IndexedColor::Index(1);
    pub const YELLOW: IndexedColor = IndexedColor::Index(2);
    pub const GREEN: IndexedColor = IndexedColor::Index(3);
    pub const CYAN: IndexedColor = IndexedColor::Index(4);
    pub const BLUE: IndexedColor = IndexedColor::Index(5);
    pub const MAGENTA: IndexedColor = IndexedColor::Index(6);
    pub const WHITE: IndexedColor = IndexedColor::Index(7);

    pub fn is_auto(&self) -> bool {
        matches!(self, IndexedColor::Auto)
    }

    /// 沿继承链返回第一个非 `Auto` 的颜色，全部为 `Auto` 时返回 `Auto`
    pub fn resolve(chain: &[IndexedColor]) -> IndexedColor {
        chain
            .iter()
            .copied()
            .find(|c| !c.is_auto())
            .unwrap_or(IndexedColor::Auto)
    }

    /// 自身为 `Auto` 时使用 `parent`
    pub fn or(self, parent: IndexedColor) -> IndexedColor {
        if self.is_auto() {
            parent
        } else {
            self
        }
    }
}

/// ARGB真实颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RealColor {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 255, r, g, b }
    }

    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// 从十六进制值创建（如 0xFF0000 表示红色）
    pub const fn from_hex(hex: u32) -> Self {
        Self::from_rgb(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// `#RRGGBB` 形式
    pub fn to_hex_string(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// 与当前颜色（通常是背景色）形成对比的自动颜色
    pub fn auto_contrast(&self) -> RealColor {
        let luminance = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        if luminance > 127.5 {
            RealColor::BLACK
        } else {
            RealColor::WHITE
        }
    }

    pub const BLACK: RealColor = RealColor::from_rgb(0, 0, 0);
    pub const WHITE: RealColor = RealColor::from_rgb(255, 255, 255);
}

impl Default for RealColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 索引颜色到真实颜色的映射表（256项）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    colors: Vec<RealColor>,
}

impl ColorMap {
    /// 从自定义颜色表创建，不足256项时用默认表补齐
    pub fn new(colors: impl IntoIterator<Item = RealColor>) -> Self {
        let mut table: Vec<RealColor> = colors.into_iter().take(256).collect();
        let defaults = Self::default();
        table.extend(defaults.colors.into_iter().skip(table.len()));
        Self { colors: table }
    }

    /// 查找索引颜色，`Auto` 没有对应的真实颜色
    pub fn get(&self, color: IndexedColor) -> Option<RealColor> {
        match color {
            IndexedColor::Auto => None,
            IndexedColor::Index(i) => self.colors.get(i as usize).copied(),
        }
    }

    /// 沿继承链解析真实颜色，链上全部为 `Auto` 时使用 `default`
    pub fn resolve(&self, chain: &[IndexedColor], default: RealColor) -> RealColor {
        self.get(IndexedColor::resolve(chain)).unwrap_or(default)
    }
}

impl Default for ColorMap {
    /// 兼容 AutoCAD 索引颜色的默认表
    fn default() -> Self {
        let mut colors = Vec::with_capacity(256);
        for index in 0..=255u8 {
            colors.push(default_palette_color(index));
        }
        Self { colors }
    }
}

fn default_palette_color(index: u8) -> RealColor {
    match index {
        0 => RealColor::BLACK,
        1 => RealColor::from_rgb(255, 0, 0),
        2 => RealColor::from_rgb(255, 255, 0),
        3 => RealColor::from_rgb(0, 255, 0),
        4 => RealColor::from_rgb(0, 255, 255),
        5 => RealColor::from_rgb(0, 0, 255),
        6 => RealColor::from_rgb(255, 0, 255),
        7 => RealColor::WHITE,
        8 => RealColor::from_rgb(128, 128, 128),
        9 => RealColor::from_rgb(192, 192, 192),
        10..=249 => {
            // 24个色相，每个色相5级亮度 × 全/半饱和度
            let hue = ((index - 10) / 10) as f64 * 15.0;
            let shade = (index % 10) / 2;
            let saturation = if index % 2 == 0 { 1.0 } else { 0.5 };
            let value = [1.0, 0.65, 0.5, 0.3, 0.15][shade as usize];
            hsv_to_rgb(hue, saturation, value)
        }
        250..=255 => {
            let level = 51 + (index - 250) as u32 * 40;
            let level = level.min(255) as u8;
            RealColor::from_rgb(level, level, level)
        }
    }
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> RealColor {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    RealColor::from_rgb(to_byte(r), to_byte(g), to_byte(b))
}
