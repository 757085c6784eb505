// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/text_overlay.rs - GStreamer 文本叠加
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use gstreamer::{self as gst, prelude::*};

use crate::{output::TextSurface, pipeline::PipelineError};

/// 以 `textoverlay` 元素的 `text` 属性作为渲染表面
pub struct GStreamerTextOverlay {
  element: gst::Element,
}

impl GStreamerTextOverlay {
  pub fn from_pipeline(pipeline: &gst::Pipeline, name: &str) -> Result<Self, PipelineError> {
    let element = pipeline
      .by_name(name)
      .ok_or_else(|| PipelineError::ElementNotFound(name.to_string()))?;
    Ok(Self { element })
  }
}

impl TextSurface for GStreamerTextOverlay {
  type Error = Infallible;

  fn set_text(&self, text: &str) -> Result<(), Self::Error> {
    self.element.set_property("text", text);
    Ok(())
  }
}
