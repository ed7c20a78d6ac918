//! 撤销/重做历史
//!
//! 历史保存的是完整的图纸版本。图纸是持久化结构，
//! 相邻版本共享未修改的部分，所以快照的开销与改动量成正比。

use crate::drawing::Drawing;
use std::collections::VecDeque;
use tracing::debug;

/// 默认最大撤销深度
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// 历史记录项
#[derive(Debug, Clone)]
struct HistoryEntry {
    drawing: Drawing,
    description: String,
}

/// 图纸历史
#[derive(Debug, Clone)]
pub struct DrawingHistory {
    current: Drawing,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// 描述当前版本是由哪个操作得到的
    current_description: String,
    max_depth: usize,
}

impl DrawingHistory {
    pub fn new(drawing: Drawing) -> Self {
        Self::with_max_depth(drawing, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(drawing: Drawing, max_depth: usize) -> Self {
        Self {
            current: drawing,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            current_description: String::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// 当前图纸
    pub fn current(&self) -> &Drawing {
        &self.current
    }

    /// 发布新版本，清空重做栈
    pub fn push(&mut self, drawing: Drawing, description: impl Into<String>) {
        let previous = std::mem::replace(&mut self.current, drawing);
        let previous_description =
            std::mem::replace(&mut self.current_description, description.into());
        self.undo_stack.push_back(HistoryEntry {
            drawing: previous,
            description: previous_description,
        });
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        debug!("History push: {}", self.current_description);
    }

    /// 撤销，返回是否发生了变化
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            return false;
        };
        let drawing = std::mem::replace(&mut self.current, entry.drawing);
        let description = std::mem::replace(&mut self.current_description, entry.description);
        debug!("History undo: {}", description);
        self.redo_stack.push(HistoryEntry {
            drawing,
            description,
        });
        true
    }

    /// 重做，返回是否发生了变化
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let drawing = std::mem::replace(&mut self.current, entry.drawing);
        let description = std::mem::replace(&mut self.current_description, entry.description);
        debug!("History redo: {}", self.current_description);
        self.undo_stack.push_back(HistoryEntry {
            drawing,
            description,
        });
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// 下一次撤销将回退的操作描述
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            Some(&self.current_description)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::IndexedColor;
    use crate::entity::Entity;
    use crate::geometry::Line;
    use crate::math::Point3;

    fn add_line(drawing: &Drawing) -> Drawing {
        drawing
            .add_to_current_layer(Entity::new(Line::new(
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                IndexedColor::Auto,
            )))
            .unwrap()
    }

    #[test]
    fn test_undo_redo() {
        let mut history = DrawingHistory::new(Drawing::new());
        assert!(!history.undo());

        let next = add_line(history.current());
        history.push(next, "add line");
        assert_eq!(history.current().entity_count(), 1);
        assert_eq!(history.undo_description(), Some("add line"));

        assert!(history.undo());
        assert_eq!(history.current().entity_count(), 0);
        assert!(history.can_redo());

        assert!(history.redo());
        assert_eq!(history.current().entity_count(), 1);
        assert!(!history.redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = DrawingHistory::new(Drawing::new());
        let next = add_line(history.current());
        history.push(next, "first");
        history.undo();
        let other = add_line(history.current());
        history.push(other, "second");
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn test_max_depth() {
        let mut history = DrawingHistory::with_max_depth(Drawing::new(), 2);
        for i in 0..5 {
            let next = add_line(history.current());
            history.push(next, format!("step {}", i));
        }
        assert_eq!(history.undo_count(), 2);
        assert!(history.undo());
        assert!(history.undo());
        assert!(!history.undo());
        assert_eq!(history.current().entity_count(), 3);
    }
}
