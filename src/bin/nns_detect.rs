// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/nns_detect.rs - 摄像头目标检测示例
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use shanan_nns::{
  FromUrl,
  app::ObjectDetector,
  config::ModelFiles,
  detection::{DetectionLayout, LABEL_SIZE, MAX_OBJECT_DETECTION},
  display::{DEFAULT_TICK_INTERVAL, RunState},
  output::draw::{DEFAULT_THRESHOLD, Draw},
  pipeline::{
    OVERLAY_NAME, TensorFilterSpec, VideoSource, detection_pipeline, runner::PipelineRunner,
  },
  tensor::TensorType,
};

/// 目标检测示例参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// SSD 模型文件路径
  #[arg(long, value_name = "MODEL")]
  pub model: PathBuf,
  /// 标签文件路径，每行一个标签
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 视频源
  #[arg(long, value_name = "SOURCE", default_value = "gst://camera/dev/video0")]
  pub source: Url,
  /// tensor_filter 推理框架
  #[arg(long, default_value = "tensorflow")]
  pub framework: String,
  /// 绘制阈值
  #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
  pub threshold: f32,
  /// 每帧最多绘制的目标数
  #[arg(long, default_value_t = MAX_OBJECT_DETECTION)]
  pub max_objects: usize,
  /// 标签字体文件，未指定时只绘制边框
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// 窗口标题
  #[arg(long, default_value = "NNStreamer Example")]
  pub title: String,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("标签文件路径: {}", args.labels.display());
  info!("视频源: {}", args.source);

  let catalog = Arc::new(ModelFiles::new(&args.model, &args.labels).check()?);
  if catalog.len() != LABEL_SIZE {
    warn!("标签数量 [{}] 与模型类别数 [{}] 不一致", catalog.len(), LABEL_SIZE);
  }
  let source = VideoSource::from_url(&args.source)?;

  let filter = TensorFilterSpec::ssd_detection(
    &args.framework,
    &args.model,
    source.width,
    source.height,
  );
  let description = detection_pipeline(&source, filter);

  let run_state = RunState::new();
  let runner = PipelineRunner::new(&description, run_state.clone())?.with_window_title(&args.title);

  let detector = Arc::new(ObjectDetector::new(
    catalog,
    DetectionLayout::default().with_max_objects(args.max_objects),
    TensorType::Float32,
    run_state,
  ));

  let mut draw = Draw::default().with_threshold(args.threshold);
  if let Some(font) = &args.font {
    draw = draw.with_font_file(font)?;
  }
  let painter = detector.clone();
  runner.attach_overlay(OVERLAY_NAME, move |data, width, height, stride| {
    let detections = painter.frame_detections();
    draw.draw_rgb_frame(data, width, height, stride, &detections, painter.catalog());
  })?;

  let main_loop = runner.main_loop();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    main_loop.quit();
  })?;

  info!("开始推理...");
  runner.run(detector, DEFAULT_TICK_INTERVAL)?;
  info!("程序结束");

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_args_defaults() {
    let args = Args::try_parse_from([
      "nns-detect",
      "--model",
      "ssd.pb",
      "--labels",
      "coco.txt",
    ])
    .unwrap();

    assert_eq!(args.threshold, DEFAULT_THRESHOLD);
    assert_eq!(args.max_objects, MAX_OBJECT_DETECTION);
    assert!(args.font.is_none());
  }

  #[test]
  fn test_args_reject_tick_interval() {
    assert!(
      Args::try_parse_from([
        "nns-detect",
        "--model",
        "ssd.pb",
        "--labels",
        "coco.txt",
        "--interval-ms",
        "100",
      ])
      .is_err()
    );
  }
}
