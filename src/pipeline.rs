// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - NNStreamer 管道描述
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

//! # NNStreamer 管道描述
//!
//! 两个示例共用同一结构：视频源经 `tee` 分为显示分支与推理分支。
//!
//! ```text
//! source ! videoconvert ! videoscale ! video/x-raw,format=RGB ! tee name=t_raw
//! t_raw. ! queue ! <textoverlay | identity> ! videoconvert ! ximagesink name=img_tensor
//! t_raw. ! queue leaky=2 max-size-buffers=2 ! tensor_converter ! tensor_filter ... ! tensor_sink name=tensor_sink
//! ```
//!
//! 需要安装 GStreamer 与 NNStreamer 插件（`tensor_converter`、`tensor_filter`、`tensor_sink`）。

use std::path::PathBuf;

use thiserror::Error;

use crate::tensor::TensorType;

mod source;
pub use self::source::{DEFAULT_CAMERA, DEFAULT_HEIGHT, DEFAULT_WIDTH, SourceKind, VideoSource};

#[cfg(feature = "gstreamer_pipeline")]
pub mod runner;

pub const TENSOR_SINK_NAME: &str = "tensor_sink";
pub const TEXT_OVERLAY_NAME: &str = "tensor_res";
pub const VIDEO_SINK_NAME: &str = "img_tensor";
pub const OVERLAY_NAME: &str = "overlay";
const TEE_NAME: &str = "t_raw";

#[derive(Error, Debug)]
pub enum PipelineError {
  /// URI scheme 不匹配（期望 "gst://"）
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[cfg(feature = "gstreamer_pipeline")]
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gstreamer::glib::Error),
  #[cfg(feature = "gstreamer_pipeline")]
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gstreamer::glib::BoolError),
  #[cfg(feature = "gstreamer_pipeline")]
  #[error("State change error: {0}")]
  StateChangeError(#[from] gstreamer::StateChangeError),
  #[error("Element not found: {0}")]
  ElementNotFound(String),
  #[error("Pad not found: {0}")]
  PadNotFound(String),
  #[error("Pipeline has no bus")]
  BusNotFound,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
}

/// `tensor_filter` 元素参数
#[derive(Debug, Clone, PartialEq)]
pub struct TensorFilterSpec {
  pub framework: String,
  pub model: PathBuf,
  /// 输入维度，如 `3:640:480:1`
  pub input: Option<String>,
  pub input_name: Option<String>,
  pub input_type: Option<TensorType>,
  /// 输出维度，多个张量以逗号分隔
  pub output: Option<String>,
  pub output_name: Option<String>,
  pub output_type: Vec<TensorType>,
}

impl TensorFilterSpec {
  pub fn new(framework: impl Into<String>, model: impl Into<PathBuf>) -> Self {
    Self {
      framework: framework.into(),
      model: model.into(),
      input: None,
      input_name: None,
      input_type: None,
      output: None,
      output_name: None,
      output_type: Vec::new(),
    }
  }

  /// SSD 检测模型：单个 uint8 图像输入，四个 float32 输出
  /// （`num_detections`、`classes`、`scores`、`boxes`）。
  pub fn ssd_detection(
    framework: impl Into<String>,
    model: impl Into<PathBuf>,
    width: u32,
    height: u32,
  ) -> Self {
    let mut spec = Self::new(framework, model);
    spec.input = Some(format!("3:{}:{}:1", width, height));
    spec.input_name = Some("image_tensor".to_string());
    spec.input_type = Some(TensorType::UInt8);
    spec.output = Some("1,100:1,100:1,4:100:1".to_string());
    spec.output_name = Some(
      "num_detections,detection_classes,detection_scores,detection_boxes".to_string(),
    );
    spec.output_type = vec![TensorType::Float32; 4];
    spec
  }

  fn to_pipeline(&self) -> String {
    let mut desc = format!(
      "tensor_filter framework={} model={}",
      self.framework,
      self.model.display()
    );
    if let Some(input) = &self.input {
      desc.push_str(&format!(" input={}", input));
    }
    if let Some(name) = &self.input_name {
      desc.push_str(&format!(" inputname={}", name));
    }
    if let Some(ty) = self.input_type {
      desc.push_str(&format!(" inputtype={}", ty));
    }
    if let Some(output) = &self.output {
      desc.push_str(&format!(" output={}", output));
    }
    if let Some(name) = &self.output_name {
      desc.push_str(&format!(" outputname={}", name));
    }
    if !self.output_type.is_empty() {
      let types = self
        .output_type
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",");
      desc.push_str(&format!(" outputtype={}", types));
    }
    desc
  }
}

pub enum PipelineItem {
  Source(VideoSource),
  RawRgb { width: u32, height: u32 },
  Scale { width: u32, height: u32 },
  Tee { name: String },
  Branch { tee: String },
  Queue { leaky: bool },
  TextOverlay { name: String },
  Identity { name: String },
  VideoSink { name: String },
  TensorConverter,
  TensorFilter(TensorFilterSpec),
  TensorSink { name: String },
}

impl PipelineItem {
  fn to_pipeline(&self) -> String {
    match self {
      PipelineItem::Source(source) => source.to_pipeline(),
      PipelineItem::RawRgb { width, height } => format!(
        "videoconvert ! videoscale ! video/x-raw,width={},height={},format=RGB",
        width, height
      ),
      PipelineItem::Scale { width, height } => {
        format!("videoscale ! video/x-raw,width={},height={}", width, height)
      }
      PipelineItem::Tee { name } => format!("tee name={}", name),
      PipelineItem::Branch { tee } => format!("{}.", tee),
      PipelineItem::Queue { leaky } => {
        if *leaky {
          "queue leaky=2 max-size-buffers=2".to_string()
        } else {
          "queue".to_string()
        }
      }
      PipelineItem::TextOverlay { name } => format!(
        "videoconvert ! textoverlay name={} font-desc=Sans,24 valignment=top halignment=left",
        name
      ),
      PipelineItem::Identity { name } => format!("identity name={}", name),
      PipelineItem::VideoSink { name } => format!("videoconvert ! ximagesink name={}", name),
      PipelineItem::TensorConverter => "tensor_converter".to_string(),
      PipelineItem::TensorFilter(spec) => spec.to_pipeline(),
      PipelineItem::TensorSink { name } => format!("tensor_sink name={}", name),
    }
  }
}

/// 由若干条链组成的管道描述
#[derive(Default)]
pub struct PipelineBuilder {
  chains: Vec<Vec<PipelineItem>>,
}

impl PipelineBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn chain(mut self, items: Vec<PipelineItem>) -> Self {
    self.chains.push(items);
    self
  }

  pub fn describe(&self) -> String {
    self
      .chains
      .iter()
      .map(|chain| {
        chain
          .iter()
          .map(PipelineItem::to_pipeline)
          .collect::<Vec<String>>()
          .join(" ! ")
      })
      .collect::<Vec<String>>()
      .join(" ")
  }
}

fn source_chain(source: &VideoSource) -> Vec<PipelineItem> {
  vec![
    PipelineItem::Source(source.clone()),
    PipelineItem::RawRgb {
      width: source.width,
      height: source.height,
    },
    PipelineItem::Tee {
      name: TEE_NAME.to_string(),
    },
  ]
}

fn display_chain(overlay: PipelineItem) -> Vec<PipelineItem> {
  vec![
    PipelineItem::Branch {
      tee: TEE_NAME.to_string(),
    },
    PipelineItem::Queue { leaky: false },
    overlay,
    PipelineItem::VideoSink {
      name: VIDEO_SINK_NAME.to_string(),
    },
  ]
}

/// 分类管道：推理分支缩放到模型输入尺寸，结果显示在 `textoverlay` 上。
pub fn classification_pipeline(
  source: &VideoSource,
  filter: TensorFilterSpec,
  model_input: (u32, u32),
) -> String {
  PipelineBuilder::new()
    .chain(source_chain(source))
    .chain(display_chain(PipelineItem::TextOverlay {
      name: TEXT_OVERLAY_NAME.to_string(),
    }))
    .chain(vec![
      PipelineItem::Branch {
        tee: TEE_NAME.to_string(),
      },
      PipelineItem::Queue { leaky: true },
      PipelineItem::Scale {
        width: model_input.0,
        height: model_input.1,
      },
      PipelineItem::TensorConverter,
      PipelineItem::TensorFilter(filter),
      PipelineItem::TensorSink {
        name: TENSOR_SINK_NAME.to_string(),
      },
    ])
    .describe()
}

/// 检测管道：推理分支使用完整帧，检测框由 `identity` 上的探针绘制。
pub fn detection_pipeline(source: &VideoSource, filter: TensorFilterSpec) -> String {
  PipelineBuilder::new()
    .chain(source_chain(source))
    .chain(display_chain(PipelineItem::Identity {
      name: OVERLAY_NAME.to_string(),
    }))
    .chain(vec![
      PipelineItem::Branch {
        tee: TEE_NAME.to_string(),
      },
      PipelineItem::Queue { leaky: true },
      PipelineItem::TensorConverter,
      PipelineItem::TensorFilter(filter),
      PipelineItem::TensorSink {
        name: TENSOR_SINK_NAME.to_string(),
      },
    ])
    .describe()
}
