// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detection.rs - 目标检测结果归约
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! # 目标检测结果归约
//!
//! SSD 类模型输出四个并行张量：
//!
//! | 张量 | 元素个数 | 内容 |
//! |------|----------|------|
//! | `num_detections` | 1 | 有效检测数 |
//! | `classes` | `DETECTION_MAX` | 类别索引 |
//! | `scores` | `DETECTION_MAX` | 置信度 |
//! | `boxes` | `BOX_SIZE * DETECTION_MAX` | `[y_min, x_min, y_max, x_max]`，归一化坐标 |
//!
//! 任何一个张量校验失败，整帧检测结果作废，不产生部分结果。

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error};

use crate::tensor::{TensorError, TensorType, decode_scores};

pub const BOX_SIZE: usize = 4;
pub const LABEL_SIZE: usize = 91;
pub const DETECTION_MAX: usize = 100;
pub const MAX_OBJECT_DETECTION: usize = 5;

const DETECTION_TENSORS: usize = 4;

#[derive(Error, Debug, PartialEq)]
pub enum DetectionError {
  #[error("张量数量不匹配: 期望 {expected}, 实际 {actual}")]
  TensorCount { expected: usize, actual: usize },
  #[error("张量 {name} 元素个数不匹配: 期望 {expected}, 实际 {actual}")]
  BufferSize {
    name: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("无效的检测数量: {0}")]
  InvalidCount(f32),
  #[error("张量解码错误: {0}")]
  Tensor(#[from] TensorError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x, y, width, height]，归一化坐标
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &DetectItem> {
    self.items.iter()
  }
}

/// 检测张量布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionLayout {
  pub detection_max: usize,
  /// 每帧最多保留的检测数
  pub max_objects: usize,
}

impl Default for DetectionLayout {
  fn default() -> Self {
    Self {
      detection_max: DETECTION_MAX,
      max_objects: MAX_OBJECT_DETECTION,
    }
  }
}

impl DetectionLayout {
  pub fn with_max_objects(mut self, max_objects: usize) -> Self {
    self.max_objects = max_objects;
    self
  }

  fn check(name: &'static str, tensor: &[f32], expected: usize) -> Result<(), DetectionError> {
    if tensor.len() != expected {
      return Err(DetectionError::BufferSize {
        name,
        expected,
        actual: tensor.len(),
      });
    }
    Ok(())
  }

  /// 校验四个张量并组装检测结果，按置信度从高到低保留 `max_objects` 个。
  pub fn decode(
    &self,
    num_detections: &[f32],
    classes: &[f32],
    scores: &[f32],
    boxes: &[f32],
  ) -> Result<DetectResult, DetectionError> {
    Self::check("num_detections", num_detections, 1)?;
    Self::check("classes", classes, self.detection_max)?;
    Self::check("scores", scores, self.detection_max)?;
    Self::check("boxes", boxes, BOX_SIZE * self.detection_max)?;

    let count = num_detections[0];
    if !count.is_finite() || count < 0.0 || count > self.detection_max as f32 {
      return Err(DetectionError::InvalidCount(count));
    }
    let count = count as usize;

    let mut items: Vec<DetectItem> = (0..count)
      .filter_map(|i| {
        let class = classes[i];
        let score = scores[i];
        if !class.is_finite() || class < 0.0 || !score.is_finite() {
          return None;
        }

        let b = &boxes[i * BOX_SIZE..(i + 1) * BOX_SIZE];
        let (y_min, x_min, y_max, x_max) = (b[0], b[1], b[2], b[3]);
        let (width, height) = (x_max - x_min, y_max - y_min);
        if !(width > 0.0 && height > 0.0) {
          return None;
        }

        Some(DetectItem {
          class_id: class as u32,
          score: score.clamp(0.0, 1.0),
          bbox: [x_min, y_min, width, height],
        })
      })
      .collect();

    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(self.max_objects);

    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}

/// 最新一帧的检测结果，每帧整体替换。
#[derive(Debug, Default)]
pub struct DetectionSlot {
  latest: Mutex<Arc<DetectResult>>,
}

impl DetectionSlot {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn store(&self, result: DetectResult) {
    *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(result);
  }

  pub fn load(&self) -> Arc<DetectResult> {
    self
      .latest
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

/// 检测结果归约器
#[derive(Debug, Clone)]
pub struct DetectionReducer {
  layout: DetectionLayout,
  tensor_type: TensorType,
  slot: Arc<DetectionSlot>,
}

impl DetectionReducer {
  pub fn new(layout: DetectionLayout, tensor_type: TensorType, slot: Arc<DetectionSlot>) -> Self {
    Self {
      layout,
      tensor_type,
      slot,
    }
  }

  pub fn slot(&self) -> &Arc<DetectionSlot> {
    &self.slot
  }

  fn reduce(&self, tensors: &[&[u8]]) -> Result<DetectResult, DetectionError> {
    let [num_detections, classes, scores, boxes] = tensors else {
      return Err(DetectionError::TensorCount {
        expected: DETECTION_TENSORS,
        actual: tensors.len(),
      });
    };

    self.layout.decode(
      &decode_scores(num_detections, self.tensor_type)?,
      &decode_scores(classes, self.tensor_type)?,
      &decode_scores(scores, self.tensor_type)?,
      &decode_scores(boxes, self.tensor_type)?,
    )
  }

  /// 归约一帧的四个张量；失败时写入空结果。返回保留的检测数。
  pub fn on_tensors(&self, tensors: &[&[u8]]) -> usize {
    let result = self.reduce(tensors).unwrap_or_else(|e| {
      error!("丢弃本帧检测结果: {}", e);
      DetectResult::default()
    });
    let count = result.len();
    debug!("本帧保留 {} 个检测", count);
    self.slot.store(result);
    count
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn layout() -> DetectionLayout {
    DetectionLayout {
      detection_max: 3,
      max_objects: 2,
    }
  }

  fn bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
  }

  #[test]
  fn test_decode_converts_boxes_to_xywh() {
    let result = layout()
      .decode(
        &[1.0],
        &[17.0, 0.0, 0.0],
        &[0.8, 0.0, 0.0],
        &[0.1, 0.2, 0.5, 0.6, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
      )
      .unwrap();

    assert_eq!(result.len(), 1);
    let item = result.items[0];
    assert_eq!(item.class_id, 17);
    assert_eq!(item.score, 0.8);
    let expected = [0.2, 0.1, 0.4, 0.4];
    for (got, want) in item.bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-6);
    }
  }

  #[test]
  fn test_decode_keeps_highest_scores() {
    let result = layout()
      .decode(
        &[3.0],
        &[1.0, 2.0, 3.0],
        &[0.3, 0.9, 0.6],
        &[0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.5, 0.5],
      )
      .unwrap();

    let classes: Vec<u32> = result.iter().map(|d| d.class_id).collect();
    assert_eq!(classes, vec![2, 3]);
  }

  #[test]
  fn test_decode_rejects_wrong_box_count() {
    let err = layout()
      .decode(&[1.0], &[1.0, 0.0, 0.0], &[0.9, 0.0, 0.0], &[0.0; 8])
      .unwrap_err();
    assert_eq!(
      err,
      DetectionError::BufferSize {
        name: "boxes",
        expected: 12,
        actual: 8
      }
    );
  }

  #[test]
  fn test_single_slot_layout_reads_four_box_values() {
    let layout = DetectionLayout {
      detection_max: 1,
      max_objects: 1,
    };
    let result = layout
      .decode(&[1.0], &[5.0], &[0.7], &[0.0, 0.25, 0.5, 0.75])
      .unwrap();
    assert_eq!(result.items[0].bbox, [0.25, 0.0, 0.5, 0.5]);

    let err = layout
      .decode(&[1.0], &[5.0], &[0.7], &[0.0, 0.25])
      .unwrap_err();
    assert_eq!(
      err,
      DetectionError::BufferSize {
        name: "boxes",
        expected: 4,
        actual: 2
      }
    );
  }

  #[test]
  fn test_decode_rejects_count_over_max() {
    let err = layout()
      .decode(&[4.0], &[0.0; 3], &[0.0; 3], &[0.0; 12])
      .unwrap_err();
    assert_eq!(err, DetectionError::InvalidCount(4.0));
  }

  #[test]
  fn test_reducer_discards_whole_frame() {
    let slot = Arc::new(DetectionSlot::new());
    let reducer = DetectionReducer::new(layout(), TensorType::Float32, slot.clone());

    let num = bytes(&[1.0]);
    let classes = bytes(&[1.0, 0.0, 0.0]);
    let scores = bytes(&[0.9, 0.0, 0.0]);
    let boxes = bytes(&[0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let frame = [
      num.as_slice(),
      classes.as_slice(),
      scores.as_slice(),
      boxes.as_slice(),
    ];
    assert_eq!(reducer.on_tensors(&frame), 1);
    assert_eq!(slot.load().len(), 1);

    let short_boxes = bytes(&[0.0, 0.0, 0.5, 0.5]);
    let frame = [
      num.as_slice(),
      classes.as_slice(),
      scores.as_slice(),
      short_boxes.as_slice(),
    ];
    assert_eq!(reducer.on_tensors(&frame), 0);
    assert!(slot.load().is_empty());
  }

  #[test]
  fn test_reducer_requires_four_tensors() {
    let slot = Arc::new(DetectionSlot::new());
    let reducer = DetectionReducer::new(layout(), TensorType::Float32, slot.clone());
    let num = bytes(&[1.0]);

    assert_eq!(reducer.on_tensors(&[num.as_slice()]), 0);
    assert!(slot.load().is_empty());
  }
}
