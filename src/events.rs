// 该文件是 Shanan （山南西风） 项目的一部分。
// src/events.rs - 管道事件接口
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

//! # 管道事件接口
//!
//! 管道引擎通过 [`PipelineEvents`] 把三类事件交给应用：
//! 新数据、定时器与总线消息。应用只依赖本接口，不依赖具体的管道类型。

use tracing::{debug, info, warn};

/// 与引擎无关的总线消息
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
  Eos,
  Error {
    message: String,
    debug: Option<String>,
  },
  Warning {
    message: String,
    debug: Option<String>,
  },
  StreamStart,
  Qos {
    format: String,
    processed: i64,
    dropped: i64,
  },
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAction {
  Continue,
  /// 退出主循环
  Quit,
}

/// 记录总线消息；仅结束流与错误会退出主循环。
pub fn handle_bus_event(event: &BusEvent) -> BusAction {
  match event {
    BusEvent::Eos => {
      info!("收到结束流消息");
      BusAction::Quit
    }
    BusEvent::Error {
      message,
      debug: detail,
    } => {
      warn!("[error] {} : {}", message, detail.as_deref().unwrap_or(""));
      BusAction::Quit
    }
    BusEvent::Warning {
      message,
      debug: detail,
    } => {
      warn!("[warning] {} : {}", message, detail.as_deref().unwrap_or(""));
      BusAction::Continue
    }
    BusEvent::StreamStart => {
      info!("收到流开始消息");
      BusAction::Continue
    }
    BusEvent::Qos {
      format,
      processed,
      dropped,
    } => {
      debug!(
        "[qos] format[{}] processed[{}] dropped[{}]",
        format, processed, dropped
      );
      BusAction::Continue
    }
    BusEvent::Other => BusAction::Continue,
  }
}

pub trait PipelineEvents: Send + Sync {
  /// 新数据回调，每个元素是一块已映射的内存
  fn on_buffer(&self, tensors: &[&[u8]]);

  /// 定时器回调，返回 `false` 时停止定时器
  fn on_timer_tick(&self) -> bool;

  fn on_bus_message(&self, event: &BusEvent) -> BusAction {
    handle_bus_event(event)
  }
}
