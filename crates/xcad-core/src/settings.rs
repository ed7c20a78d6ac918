//! 图纸设置
//!
//! 单位格式、显示精度、偏移所用的绘图平面以及自动颜色链的全局默认颜色。
//! 设置可以从 JSON 读取，缺失字段使用默认值。

use crate::color::RealColor;
use crate::transform::Plane;
use serde::{Deserialize, Serialize};

/// 长度单位格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitFormat {
    /// 英尺-英寸-分数（内部单位为英寸）
    Architectural,
    /// 十进制小数
    #[default]
    Metric,
}

/// 图纸设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingSettings {
    /// 关联的文件名
    pub file_name: Option<String>,
    pub unit_format: UnitFormat,
    /// `Metric` 为小数位数，`Architectural` 为分数分母
    pub unit_precision: u32,
    /// 绘图平面（决定线段偏移的方向）
    pub drawing_plane: Plane,
    /// 自动颜色链的最终默认值
    pub default_color: RealColor,
}

/// 设置的字段覆盖
#[derive(Debug, Clone, Default)]
pub struct DrawingSettingsUpdate {
    pub file_name: Option<Option<String>>,
    pub unit_format: Option<UnitFormat>,
    pub unit_precision: Option<u32>,
    pub drawing_plane: Option<Plane>,
    pub default_color: Option<RealColor>,
}

impl Default for DrawingSettings {
    fn default() -> Self {
        Self {
            file_name: None,
            unit_format: UnitFormat::Metric,
            unit_precision: 8,
            drawing_plane: Plane::xy(),
            default_color: RealColor::WHITE,
        }
    }
}

impl DrawingSettings {
    pub fn new(file_name: Option<String>, unit_format: UnitFormat, unit_precision: u32) -> Self {
        Self {
            file_name,
            unit_format,
            unit_precision,
            ..Self::default()
        }
    }

    pub fn update(&self, changes: DrawingSettingsUpdate) -> DrawingSettings {
        DrawingSettings {
            file_name: changes.file_name.unwrap_or_else(|| self.file_name.clone()),
            unit_format: changes.unit_format.unwrap_or(self.unit_format),
            unit_precision: changes.unit_precision.unwrap_or(self.unit_precision),
            drawing_plane: changes.drawing_plane.unwrap_or(self.drawing_plane),
            default_color: changes.default_color.unwrap_or(self.default_color),
        }
    }

    /// 按当前单位格式格式化长度
    pub fn format_length(&self, value: f64) -> String {
        match self.unit_format {
            UnitFormat::Metric => format!("{:.prec$}", value, prec = self.unit_precision as usize),
            UnitFormat::Architectural => format_architectural(value, self.unit_precision.max(1)),
        }
    }
}

/// 建筑格式：`F'-I N/D"`
fn format_architectural(value: f64, denominator: u32) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let inches = value.abs();
    let mut feet = (inches / 12.0).floor() as i64;
    let remaining = inches - feet as f64 * 12.0;
    let mut whole = remaining.floor() as i64;
    let mut num = ((remaining - whole as f64) * denominator as f64).round() as i64;
    let mut denom = denominator as i64;

    // 进位
    if num == denom {
        num = 0;
        whole += 1;
    }
    if whole == 12 {
        whole = 0;
        feet += 1;
    }
    if num > 0 {
        let g = gcd(num, denom);
        num /= g;
        denom /= g;
    }

    let inch_part = if num > 0 {
        format!("{} {}/{}\"", whole, num, denom)
    } else {
        format!("{}\"", whole)
    };
    format!("{}{}'-{}", sign, feet, inch_part)
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DrawingSettings::default();
        assert_eq!(settings.unit_format, UnitFormat::Metric);
        assert_eq!(settings.unit_precision, 8);
        assert_eq!(settings.default_color, RealColor::WHITE);
    }

    #[test]
    fn test_update() {
        let settings = DrawingSettings::default();
        let changed = settings.update(DrawingSettingsUpdate {
            unit_format: Some(UnitFormat::Architectural),
            file_name: Some(Some("plan.dxf".to_string())),
            ..Default::default()
        });
        assert_eq!(changed.unit_format, UnitFormat::Architectural);
        assert_eq!(changed.file_name.as_deref(), Some("plan.dxf"));
        assert_eq!(settings.update(DrawingSettingsUpdate::default()), settings);
    }

    #[test]
    fn test_format_length() {
        let metric = DrawingSettings::new(None, UnitFormat::Metric, 2);
        assert_eq!(metric.format_length(3.14159), "3.14");

        let arch = DrawingSettings::new(None, UnitFormat::Architectural, 8);
        assert_eq!(arch.format_length(18.5), "1'-6 1/2\"");
        assert_eq!(arch.format_length(11.99), "1'-0\"");
        assert_eq!(arch.format_length(3.0), "0'-3\"");
    }
}
