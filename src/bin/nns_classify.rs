// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/nns_classify.rs - 摄像头图像分类示例
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_nns::{
  FromUrl,
  app::LabelClassifier,
  config::ModelFiles,
  display::{DEFAULT_TICK_INTERVAL, RunState},
  pipeline::{
    TEXT_OVERLAY_NAME, TensorFilterSpec, VideoSource, classification_pipeline,
    runner::PipelineRunner,
  },
  tensor::TensorType,
};

/// 图像分类示例参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件路径
  #[arg(long, value_name = "MODEL")]
  pub model: PathBuf,
  /// 标签文件路径，每行一个标签
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 视频源
  #[arg(long, value_name = "SOURCE", default_value = "gst://camera/dev/video0")]
  pub source: Url,
  /// tensor_filter 推理框架
  #[arg(long, default_value = "tensorflow-lite")]
  pub framework: String,
  /// 模型输入宽度
  #[arg(long, default_value_t = 224)]
  pub input_width: u32,
  /// 模型输入高度
  #[arg(long, default_value_t = 224)]
  pub input_height: u32,
  /// 输出张量元素类型
  #[arg(long, default_value = "uint8")]
  pub output_type: TensorType,
  /// 叠加文本刷新周期（毫秒）
  #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL.as_millis() as u64)]
  pub interval_ms: u64,
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
  let source = VideoSource::from_url(&args.source)?;

  let mut filter = TensorFilterSpec::new(&args.framework, &args.model);
  filter.output_type = vec![args.output_type];
  let description = classification_pipeline(&source, filter, (args.input_width, args.input_height));

  let run_state = RunState::new();
  let runner = PipelineRunner::new(&description, run_state.clone())?.with_window_title(&args.title);
  let surface = runner.text_overlay(TEXT_OVERLAY_NAME)?;
  let classifier = Arc::new(LabelClassifier::new(
    catalog,
    args.output_type,
    run_state,
    surface,
  ));

  let main_loop = runner.main_loop();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    main_loop.quit();
  })?;

  info!("开始推理...");
  runner.run(classifier, Duration::from_millis(args.interval_ms))?;
  info!("程序结束");

  Ok(())
}
