// 该文件是 Shanan （山南西风） 项目的一部分。
// src/display.rs - 显示同步
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use tracing::{debug, warn};

use crate::{label::LabelCatalog, output::TextSurface, reducer::ResultSlot};

/// 显示刷新周期
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// 管道运行标志，拆除开始后所有回调都不再触碰渲染表面。
#[derive(Debug, Clone, Default)]
pub struct RunState {
  running: Arc<AtomicBool>,
}

impl RunState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn start(&self) {
    self.running.store(true, Ordering::Release);
  }

  pub fn stop(&self) {
    self.running.store(false, Ordering::Release);
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }
}

/// 显示同步器
///
/// 以固定周期比较最新结果与已显示结果，仅在变化时推送一次文本。
/// `current_index` 只由本结构写入。
pub struct DisplaySync<S> {
  catalog: Arc<LabelCatalog>,
  new_index: Arc<ResultSlot>,
  current_index: ResultSlot,
  run_state: RunState,
  surface: S,
}

impl<S: TextSurface> DisplaySync<S> {
  pub fn new(
    catalog: Arc<LabelCatalog>,
    new_index: Arc<ResultSlot>,
    run_state: RunState,
    surface: S,
  ) -> Self {
    Self {
      catalog,
      new_index,
      current_index: ResultSlot::new(),
      run_state,
      surface,
    }
  }

  pub fn current_index(&self) -> Option<usize> {
    self.current_index.load()
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }

  /// 定时器回调，始终返回 `true` 以保持定时器运行。
  pub fn on_tick(&self) -> bool {
    if !self.run_state.is_running() {
      return true;
    }

    let latest = self.new_index.load();
    if latest == self.current_index.load() {
      return true;
    }

    let label = self.catalog.label_for(latest);
    match self.surface.set_text(label) {
      Ok(()) => {
        debug!("更新显示标签: {:?} -> [{}]", latest, label);
        self.current_index.store(latest);
      }
      // 保持 current_index 不变，下个周期重试
      Err(e) => warn!("更新显示标签失败: {}", e),
    }

    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{convert::Infallible, sync::Mutex};

  #[derive(Default)]
  struct Recorder {
    pushed: Mutex<Vec<String>>,
  }

  impl TextSurface for Recorder {
    type Error = Infallible;

    fn set_text(&self, text: &str) -> Result<(), Self::Error> {
      self.pushed.lock().unwrap().push(text.to_string());
      Ok(())
    }
  }

  fn setup() -> (Arc<ResultSlot>, RunState, DisplaySync<Recorder>) {
    let catalog = Arc::new(["cat", "dog", "bird"].into_iter().collect());
    let slot = Arc::new(ResultSlot::new());
    let run_state = RunState::new();
    let sync = DisplaySync::new(catalog, slot.clone(), run_state.clone(), Recorder::default());
    (slot, run_state, sync)
  }

  #[test]
  fn test_tick_pushes_once_per_change() {
    let (slot, run_state, sync) = setup();
    run_state.start();
    slot.store(Some(2));

    assert!(sync.on_tick());
    assert!(sync.on_tick());
    assert_eq!(*sync.surface().pushed.lock().unwrap(), vec!["bird"]);
    assert_eq!(sync.current_index(), Some(2));
  }

  #[test]
  fn test_tick_is_noop_when_stopped() {
    let (slot, _run_state, sync) = setup();
    slot.store(Some(0));

    assert!(sync.on_tick());
    assert!(sync.surface().pushed.lock().unwrap().is_empty());
    assert_eq!(sync.current_index(), None);
  }

  #[test]
  fn test_tick_without_result_pushes_nothing() {
    let (_slot, run_state, sync) = setup();
    run_state.start();

    assert!(sync.on_tick());
    assert!(sync.surface().pushed.lock().unwrap().is_empty());
  }

  struct Broken;

  impl TextSurface for Broken {
    type Error = &'static str;

    fn set_text(&self, _text: &str) -> Result<(), Self::Error> {
      Err("surface gone")
    }
  }

  #[test]
  fn test_failed_push_keeps_current_index() {
    let catalog = Arc::new(["cat"].into_iter().collect());
    let slot = Arc::new(ResultSlot::new());
    let run_state = RunState::new();
    run_state.start();
    let sync = DisplaySync::new(catalog, slot.clone(), run_state, Broken);

    slot.store(Some(0));
    assert!(sync.on_tick());
    assert_eq!(sync.current_index(), None);
  }
}
