// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  ops::{Deref, DerefMut},
  path::Path,
};

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use thiserror::Error;
use tracing::warn;

use crate::{detection::DetectResult, label::LabelCatalog};

/// 默认置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.5;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 检测框绘制器
///
/// 每帧从头绘制，不保留上一帧的任何状态。未设置字体时只绘制边框。
pub struct Draw {
  threshold: f32,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
  label_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_THRESHOLD,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: None,
      label_color: LABEL_COLOR,
    }
  }
}

impl Draw {
  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  // bbox 为归一化坐标 [x, y, width, height]
  fn draw_bbox_with_label<C>(
    &self,
    image: &mut ImageBuffer<Rgb<u8>, C>,
    bbox: &[f32; 4],
    label: &str,
  ) where
    C: Deref<Target = [u8]> + DerefMut,
  {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let color = self.label_color;

    let mut x_min = (bbox[0] * w).floor() as i32;
    let mut y_min = (bbox[1] * h).floor() as i32;
    let mut x_max = ((bbox[0] + bbox[2]) * w).ceil() as i32;
    let mut y_max = ((bbox[1] + bbox[3]) * h).ceil() as i32;

    x_min = x_min.clamp(0, w as i32 - 1);
    y_min = y_min.clamp(0, h as i32 - 1);
    x_max = x_max.clamp(0, w as i32 - 1);
    y_max = y_max.clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框（加粗为2像素）
    for thickness in 0..2 {
      let x_min_t = (x_min + thickness).min(x_max) as u32;
      let y_min_t = (y_min + thickness).min(y_max) as u32;
      let x_max_t = (x_max - thickness).max(x_min) as u32;
      let y_max_t = (y_max - thickness).max(y_min) as u32;

      for x in x_min_t..=x_max_t {
        image.put_pixel(x, y_min_t, Rgb(color));
        image.put_pixel(x, y_max_t, Rgb(color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t, y, Rgb(color));
        image.put_pixel(x_max_t, y, Rgb(color));
      }
    }

    let Some(font) = &self.font else {
      return;
    };

    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    // 标签背景放在边框上方，且不超出图像边界
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(w as i32 - label_x).max(0) as u32;
    let label_height = self.label_text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(color));
      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        label,
      );
    }
  }

  /// 绘制置信度高于阈值的检测，返回绘制的数量。
  pub fn draw_detections<C>(
    &self,
    image: &mut ImageBuffer<Rgb<u8>, C>,
    result: &DetectResult,
    catalog: &LabelCatalog,
  ) -> usize
  where
    C: Deref<Target = [u8]> + DerefMut,
  {
    if image.width() == 0 || image.height() == 0 {
      return 0;
    }

    let mut drawn = 0;
    for item in result.iter().filter(|d| d.score > self.threshold) {
      let label = format!(
        "{} {:.2}",
        catalog.label_for(Some(item.class_id as usize)),
        item.score
      );
      self.draw_bbox_with_label(image, &item.bbox, &label);
      drawn += 1;
    }
    drawn
  }

  /// 在 RGB 帧数据上原地绘制，`stride` 为每行字节数（可含行尾填充）。
  pub fn draw_rgb_frame(
    &self,
    data: &mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    result: &DetectResult,
    catalog: &LabelCatalog,
  ) -> usize {
    if result.is_empty() || width == 0 || height == 0 {
      return 0;
    }

    let row = width as usize * 3;
    let rows = height as usize;
    let required = stride * (rows - 1) + row;
    if stride < row || data.len() < required {
      warn!(
        "帧数据长度 {} 与 {}x{} RGB (行跨度 {}) 不匹配, 跳过绘制",
        data.len(),
        width,
        height,
        stride
      );
      return 0;
    }

    if stride == row {
      let Some(mut image) =
        ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, &mut data[..required])
      else {
        return 0;
      };
      return self.draw_detections(&mut image, result, catalog);
    }

    // 行尾有填充：先拼成紧凑帧，绘制后逐行写回
    let mut packed = Vec::with_capacity(row * rows);
    for line in data.chunks(stride).take(rows) {
      packed.extend_from_slice(&line[..row]);
    }
    let Some(mut image) = RgbImage::from_raw(width, height, packed) else {
      return 0;
    };
    let drawn = self.draw_detections(&mut image, result, catalog);
    for (line, src) in data.chunks_mut(stride).zip(image.as_raw().chunks(row)) {
      line[..row].copy_from_slice(src);
    }
    drawn
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::DetectItem;

  fn result(score: f32) -> DetectResult {
    DetectResult {
      items: vec![DetectItem {
        class_id: 1,
        score,
        bbox: [0.1, 0.1, 0.5, 0.5],
      }]
      .into_boxed_slice(),
    }
  }

  fn catalog() -> LabelCatalog {
    ["background", "person"].into_iter().collect()
  }

  #[test]
  fn test_draws_box_above_threshold() {
    let mut image = RgbImage::new(100, 100);
    let drawn = Draw::default().draw_detections(&mut image, &result(0.9), &catalog());

    assert_eq!(drawn, 1);
    assert_eq!(image.get_pixel(10, 10), &Rgb(LABEL_COLOR));
    assert_eq!(image.get_pixel(60, 60), &Rgb(LABEL_COLOR));
    assert_eq!(image.get_pixel(30, 30), &Rgb([0, 0, 0]));
  }

  #[test]
  fn test_skips_box_below_threshold() {
    let mut image = RgbImage::new(100, 100);
    let drawn = Draw::default()
      .with_threshold(0.95)
      .draw_detections(&mut image, &result(0.9), &catalog());

    assert_eq!(drawn, 0);
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }

  #[test]
  fn test_score_equal_to_threshold_is_not_drawn() {
    let mut image = RgbImage::new(100, 100);
    let drawn = Draw::default().draw_detections(&mut image, &result(DEFAULT_THRESHOLD), &catalog());

    assert_eq!(drawn, 0);
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }

  #[test]
  fn test_draw_rgb_frame_with_padded_stride() {
    // 10 像素宽的 RGB 行按 4 字节对齐为 32 字节
    let (width, height, stride) = (10u32, 10u32, 32usize);
    let mut data = vec![0xAAu8; stride * height as usize];
    for line in data.chunks_mut(stride) {
      line[..30].fill(0);
    }

    let drawn = Draw::default().draw_rgb_frame(&mut data, width, height, stride, &result(0.8), &catalog());

    assert_eq!(drawn, 1);
    // (1, 1) 在边框左上角，位于第二行
    let idx = stride + 3;
    assert_eq!(&data[idx..idx + 3], &LABEL_COLOR);
    // 行尾填充保持不变
    for line in data.chunks(stride) {
      assert!(line[30..].iter().all(|b| *b == 0xAA));
    }
  }

  #[test]
  fn test_empty_result_leaves_frame_untouched() {
    let mut data = vec![7u8; 4 * 4 * 3];
    let drawn = Draw::default().draw_rgb_frame(
      &mut data,
      4,
      4,
      12,
      &DetectResult::default(),
      &catalog(),
    );

    assert_eq!(drawn, 0);
    assert!(data.iter().all(|b| *b == 7));
  }

  #[test]
  fn test_draw_rgb_frame_writes_back() {
    let mut data = vec![0u8; 20 * 20 * 3];
    let drawn = Draw::default().draw_rgb_frame(&mut data, 20, 20, 60, &result(0.8), &catalog());

    assert_eq!(drawn, 1);
    // (2, 2) 在边框左上角
    let idx = (2 * 20 + 2) * 3;
    assert_eq!(&data[idx..idx + 3], &LABEL_COLOR);
  }

  #[test]
  fn test_draw_rgb_frame_rejects_short_buffer() {
    let mut data = vec![0u8; 10];
    let drawn = Draw::default().draw_rgb_frame(&mut data, 20, 20, 60, &result(0.8), &catalog());
    assert_eq!(drawn, 0);
  }
}
