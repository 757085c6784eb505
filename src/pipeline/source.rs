// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline/source.rs - 视频源描述
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

//! # 视频源
//!
//! 视频源以 `gst://` URL 描述：
//!
//! - `gst://camera/dev/video0?width=640&height=480&fps=30&io-mode=2` - V4L2 摄像头
//! - `gst://file/path/to/video.mp4` - 视频文件
//! - `gst://test` - `videotestsrc` 测试源
//!
//! `width` 与 `height` 是送往显示与推理分支的 RGB 帧尺寸，默认 640x480。

use std::collections::HashMap;

use url::Url;

use crate::{FromUrl, FromUrlWithScheme, pipeline::PipelineError};

pub const DEFAULT_CAMERA: &str = "/dev/video0";
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
  Camera {
    device: String,
    io_mode: Option<u32>,
    fps: Option<u32>,
  },
  File(String),
  Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
  pub kind: SourceKind,
  pub width: u32,
  pub height: u32,
}

impl Default for VideoSource {
  fn default() -> Self {
    Self {
      kind: SourceKind::Camera {
        device: DEFAULT_CAMERA.to_string(),
        io_mode: None,
        fps: None,
      },
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }
}

impl VideoSource {
  pub fn to_pipeline(&self) -> String {
    match &self.kind {
      SourceKind::Camera {
        device,
        io_mode,
        fps,
      } => {
        let io_mode_str = if let Some(mode) = io_mode {
          format!(" io-mode={}", mode)
        } else {
          "".to_string()
        };
        let fps_str = if let Some(fps) = fps {
          format!(" ! video/x-raw,framerate={}/1", fps)
        } else {
          "".to_string()
        };
        format!("v4l2src name=src device={}{}{}", device, io_mode_str, fps_str)
      }
      SourceKind::File(path) => format!("filesrc location={} ! decodebin", path),
      SourceKind::Test => "videotestsrc name=src is-live=true".to_string(),
    }
  }
}

impl FromUrlWithScheme for VideoSource {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for VideoSource {
  type Error = PipelineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(PipelineError::SchemeMismatch(url.scheme().to_string()));
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let number = |key: &str| query.get(key).and_then(|v| v.parse::<u32>().ok());

    let kind = match url.host_str() {
      Some("camera") => {
        let device = match url.path() {
          "" | "/" => DEFAULT_CAMERA.to_string(),
          path => path.to_string(),
        };
        SourceKind::Camera {
          device,
          io_mode: number("io-mode"),
          fps: number("fps"),
        }
      }
      Some("file") => SourceKind::File(url.path().to_string()),
      Some("test") => SourceKind::Test,
      _ => return Err(PipelineError::SchemeMismatch(url.to_string())),
    };

    Ok(VideoSource {
      kind,
      width: number("width").unwrap_or(DEFAULT_WIDTH),
      height: number("height").unwrap_or(DEFAULT_HEIGHT),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(s: &str) -> Result<VideoSource, PipelineError> {
    VideoSource::from_url(&Url::parse(s).unwrap())
  }

  #[test]
  fn test_camera_with_query() {
    let source = parse("gst://camera/dev/video2?width=320&height=240&fps=15&io-mode=4").unwrap();
    assert_eq!(
      source.kind,
      SourceKind::Camera {
        device: "/dev/video2".to_string(),
        io_mode: Some(4),
        fps: Some(15),
      }
    );
    assert_eq!((source.width, source.height), (320, 240));
    assert_eq!(
      source.to_pipeline(),
      "v4l2src name=src device=/dev/video2 io-mode=4 ! video/x-raw,framerate=15/1"
    );
  }

  #[test]
  fn test_camera_defaults() {
    let source = parse("gst://camera").unwrap();
    assert_eq!(source, VideoSource::default());
    assert_eq!(source.to_pipeline(), "v4l2src name=src device=/dev/video0");
  }

  #[test]
  fn test_file_and_test_sources() {
    let file = parse("gst://file/tmp/clip.mp4").unwrap();
    assert_eq!(
      file.to_pipeline(),
      "filesrc location=/tmp/clip.mp4 ! decodebin"
    );

    let test = parse("gst://test").unwrap();
    assert_eq!(test.kind, SourceKind::Test);
  }

  #[test]
  fn test_scheme_mismatch() {
    assert!(matches!(
      parse("rtsp://camera/stream"),
      Err(PipelineError::SchemeMismatch(_))
    ));
    assert!(matches!(
      parse("gst://unknown/x"),
      Err(PipelineError::SchemeMismatch(_))
    ));
  }
}
