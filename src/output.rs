// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 渲染表面定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 接收文本的渲染表面
pub trait TextSurface {
  type Error: std::fmt::Display;
  fn set_text(&self, text: &str) -> Result<(), Self::Error>;
}

#[cfg(feature = "draw_overlay")]
pub mod draw;

#[cfg(feature = "gstreamer_pipeline")]
mod text_overlay;
#[cfg(feature = "gstreamer_pipeline")]
pub use self::text_overlay::GStreamerTextOverlay;
