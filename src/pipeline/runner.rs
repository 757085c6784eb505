// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline/runner.rs - GStreamer 管道运行
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! # GStreamer 管道运行
//!
//! 把 [`PipelineEvents`] 挂接到真实管道上：
//!
//! - `tensor_sink` 的 `new-data` 信号 → [`PipelineEvents::on_buffer`]
//! - `glib::timeout_add` 定时器 → [`PipelineEvents::on_timer_tick`]
//! - 总线监视 → [`PipelineEvents::on_bus_message`]，返回 [`BusAction::Quit`] 时退出主循环
//!
//! 三者都在 GLib 主循环或流线程上分发，共享状态只通过原子寄存器与互斥量传递。

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use gstreamer::{self as gst, glib, prelude::*};
use gstreamer_video as gst_video;
use tracing::{debug, info, warn};

use crate::{
  display::RunState,
  events::{BusAction, BusEvent, PipelineEvents},
  output::GStreamerTextOverlay,
  pipeline::{PipelineError, TENSOR_SINK_NAME, VIDEO_SINK_NAME},
};

pub struct PipelineRunner {
  pipeline: gst::Pipeline,
  main_loop: glib::MainLoop,
  run_state: RunState,
  title: Option<String>,
}

impl Drop for PipelineRunner {
  fn drop(&mut self) {
    self.run_state.stop();
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl PipelineRunner {
  pub fn new(description: &str, run_state: RunState) -> Result<Self, PipelineError> {
    gst::init()?;

    info!("GStreamer pipeline description: {}", description);

    let pipeline = gst::parse::launch(description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| PipelineError::PipelineError("Failed to create pipeline".to_string()))?;

    Ok(Self {
      pipeline,
      main_loop: glib::MainLoop::new(None, false),
      run_state,
      title: None,
    })
  }

  /// 管道进入 `Playing` 后设置的窗口标题
  pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn pipeline(&self) -> &gst::Pipeline {
    &self.pipeline
  }

  /// 主循环句柄，可在信号处理中调用 `quit`
  pub fn main_loop(&self) -> glib::MainLoop {
    self.main_loop.clone()
  }

  pub fn text_overlay(&self, name: &str) -> Result<GStreamerTextOverlay, PipelineError> {
    GStreamerTextOverlay::from_pipeline(&self.pipeline, name)
  }

  /// 向视频输出元素的 sink pad 发送标题标签事件
  pub fn set_window_title(&self, name: &str, title: &str) {
    let Some(element) = self.pipeline.by_name(name) else {
      return;
    };
    let Some(pad) = element.static_pad("sink") else {
      return;
    };

    let mut tags = gst::TagList::new();
    if let Some(tags) = tags.get_mut() {
      tags.add::<gst::tags::Title>(&title, gst::TagMergeMode::Append);
    }
    if !pad.send_event(gst::event::Tag::new(tags)) {
      debug!("窗口标题事件未被处理: {}", name);
    }
  }

  /// 在元素的 src pad 上安装缓冲区探针，`draw` 收到可写的 RGB 帧数据、宽、高与行跨度。
  pub fn attach_overlay<F>(&self, name: &str, draw: F) -> Result<(), PipelineError>
  where
    F: Fn(&mut [u8], u32, u32, usize) + Send + Sync + 'static,
  {
    let element = self
      .pipeline
      .by_name(name)
      .ok_or_else(|| PipelineError::ElementNotFound(name.to_string()))?;
    let pad = element
      .static_pad("src")
      .ok_or_else(|| PipelineError::PadNotFound(format!("{}.src", name)))?;

    pad.add_probe(gst::PadProbeType::BUFFER, move |pad, info| {
      let Some(caps) = pad.current_caps() else {
        return gst::PadProbeReturn::Ok;
      };
      let Ok(video_info) = gst_video::VideoInfo::from_caps(&caps) else {
        return gst::PadProbeReturn::Ok;
      };
      if video_info.format() != gst_video::VideoFormat::Rgb {
        debug!("跳过非 RGB 帧: {:?}", video_info.format());
        return gst::PadProbeReturn::Ok;
      }
      let (width, height) = (video_info.width(), video_info.height());
      let Ok(stride) = usize::try_from(video_info.stride()[0]) else {
        return gst::PadProbeReturn::Ok;
      };
      let offset = video_info.offset()[0];

      if let Some(gst::PadProbeData::Buffer(ref mut buffer)) = info.data {
        let buffer = buffer.make_mut();
        match buffer.map_writable() {
          Ok(mut map) => match map.as_mut_slice().get_mut(offset..) {
            Some(frame) => draw(frame, width, height, stride),
            None => warn!("帧偏移 {} 超出缓冲区", offset),
          },
          Err(e) => warn!("Failed to map buffer for writing: {}", e),
        }
      }

      gst::PadProbeReturn::Ok
    });

    Ok(())
  }

  /// 挂接回调并运行主循环，直到结束流或错误消息。
  pub fn run(
    &self,
    events: Arc<dyn PipelineEvents>,
    interval: Duration,
  ) -> Result<(), PipelineError> {
    let sink = self
      .pipeline
      .by_name(TENSOR_SINK_NAME)
      .ok_or_else(|| PipelineError::ElementNotFound(TENSOR_SINK_NAME.to_string()))?;

    let handler = events.clone();
    sink.connect("new-data", false, move |values| {
      let Some(buffer) = values.get(1).and_then(|v| v.get::<gst::Buffer>().ok()) else {
        warn!("new-data 信号缺少缓冲区");
        return None;
      };

      let maps: Vec<_> = buffer
        .iter_memories()
        .filter_map(|memory| {
          memory
            .map_readable()
            .map_err(|e| warn!("Failed to map memory for reading: {}", e))
            .ok()
        })
        .collect();
      let tensors: Vec<&[u8]> = maps.iter().map(|map| map.as_slice()).collect();
      handler.on_buffer(&tensors);

      None
    });

    let ticker = events.clone();
    let timer_alive = Arc::new(AtomicBool::new(true));
    let timer_flag = timer_alive.clone();
    let timer = glib::timeout_add(interval, move || {
      if ticker.on_timer_tick() {
        glib::ControlFlow::Continue
      } else {
        timer_flag.store(false, Ordering::Release);
        glib::ControlFlow::Break
      }
    });

    let bus = self.pipeline.bus().ok_or(PipelineError::BusNotFound)?;
    let main_loop = self.main_loop.clone();
    let watcher = events;
    let _bus_watch = bus.add_watch(move |_, msg| {
      if watcher.on_bus_message(&bus_event(msg)) == BusAction::Quit {
        main_loop.quit();
      }
      glib::ControlFlow::Continue
    })?;

    self.pipeline.set_state(gst::State::Playing)?;
    self.run_state.start();
    if let Some(title) = &self.title {
      self.set_window_title(VIDEO_SINK_NAME, title);
    }

    self.main_loop.run();

    self.run_state.stop();
    if timer_alive.load(Ordering::Acquire) {
      timer.remove();
    }
    self.pipeline.set_state(gst::State::Null)?;
    info!("管道已停止");

    Ok(())
  }
}

fn bus_event(msg: &gst::Message) -> BusEvent {
  use gst::MessageView;

  match msg.view() {
    MessageView::Eos(..) => BusEvent::Eos,
    MessageView::Error(err) => BusEvent::Error {
      message: err.error().to_string(),
      debug: err.debug().map(|d| d.to_string()),
    },
    MessageView::Warning(w) => BusEvent::Warning {
      message: w.error().to_string(),
      debug: w.debug().map(|d| d.to_string()),
    },
    MessageView::StreamStart(..) => BusEvent::StreamStart,
    MessageView::Qos(qos) => {
      let (processed, dropped) = qos.stats();
      BusEvent::Qos {
        format: format!("{:?}", processed.format()),
        processed: processed.value(),
        dropped: dropped.value(),
      }
    }
    _ => BusEvent::Other,
  }
}
