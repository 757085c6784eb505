// 该文件是 Shanan （山南西风） 项目的一部分。
// src/app.rs - 示例应用
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 两个示例应用：文本标签分类与检测框叠加。两者都实现
//! [`PipelineEvents`]，由管道引擎驱动。

use std::sync::Arc;

use crate::{
  detection::{DetectResult, DetectionLayout, DetectionReducer, DetectionSlot},
  display::{DisplaySync, RunState},
  events::PipelineEvents,
  label::LabelCatalog,
  output::TextSurface,
  reducer::{ResultSlot, TopLabelReducer},
  tensor::TensorType,
};

/// 分类应用：分数最高的标签显示为叠加文本
pub struct LabelClassifier<S> {
  reducer: TopLabelReducer,
  display: DisplaySync<S>,
  run_state: RunState,
}

impl<S: TextSurface> LabelClassifier<S> {
  pub fn new(
    catalog: Arc<LabelCatalog>,
    tensor_type: TensorType,
    run_state: RunState,
    surface: S,
  ) -> Self {
    let slot = Arc::new(ResultSlot::new());
    let reducer = TopLabelReducer::new(catalog.len(), tensor_type, slot.clone());
    let display = DisplaySync::new(catalog, slot, run_state.clone(), surface);
    Self {
      reducer,
      display,
      run_state,
    }
  }

  pub fn new_index(&self) -> Option<usize> {
    self.reducer.slot().load()
  }

  pub fn display(&self) -> &DisplaySync<S> {
    &self.display
  }
}

impl<S: TextSurface + Send + Sync> PipelineEvents for LabelClassifier<S> {
  fn on_buffer(&self, tensors: &[&[u8]]) {
    if !self.run_state.is_running() {
      return;
    }
    for tensor in tensors {
      self.reducer.on_tensor(tensor);
    }
  }

  fn on_timer_tick(&self) -> bool {
    self.display.on_tick()
  }
}

/// 检测应用：每帧绘制最新的检测框
pub struct ObjectDetector {
  catalog: Arc<LabelCatalog>,
  reducer: DetectionReducer,
  run_state: RunState,
}

impl ObjectDetector {
  pub fn new(
    catalog: Arc<LabelCatalog>,
    layout: DetectionLayout,
    tensor_type: TensorType,
    run_state: RunState,
  ) -> Self {
    let reducer = DetectionReducer::new(layout, tensor_type, Arc::new(DetectionSlot::new()));
    Self {
      catalog,
      reducer,
      run_state,
    }
  }

  pub fn catalog(&self) -> &LabelCatalog {
    &self.catalog
  }

  /// 当前帧应绘制的检测结果；管道停止后为空。
  pub fn frame_detections(&self) -> Arc<DetectResult> {
    if !self.run_state.is_running() {
      return Arc::default();
    }
    self.reducer.slot().load()
  }
}

impl PipelineEvents for ObjectDetector {
  fn on_buffer(&self, tensors: &[&[u8]]) {
    if !self.run_state.is_running() {
      return;
    }
    self.reducer.on_tensors(tensors);
  }

  fn on_timer_tick(&self) -> bool {
    true
  }
}
