// 该文件是 Shanan （山南西风） 项目的一部分。
// src/reducer.rs - 推理结果归约
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

//! # 推理结果归约
//!
//! 每个推理周期交付一段分数缓冲区，本模块校验其尺寸并归约为
//! 分数最高的类别索引，写入 [`ResultSlot`] 供显示同步器读取。

use std::sync::{
  Arc,
  atomic::{AtomicI64, Ordering},
};

use thiserror::Error;
use tracing::error;

use crate::tensor::{TensorType, decode_scores};

/// 无检测结果的哨兵值
pub const NO_DETECTION: i64 = -1;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("缓冲区尺寸不匹配: 期望 {expected}, 实际 {actual}")]
pub struct ShapeMismatch {
  pub expected: usize,
  pub actual: usize,
}

/// 单值原子寄存器，保存一个类别索引或哨兵值。
///
/// 每个寄存器只有一个写者：归约器写 `new_index`，显示同步器写 `current_index`。
#[derive(Debug)]
pub struct ResultSlot {
  index: AtomicI64,
}

impl Default for ResultSlot {
  fn default() -> Self {
    Self {
      index: AtomicI64::new(NO_DETECTION),
    }
  }
}

impl ResultSlot {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn store(&self, index: Option<usize>) {
    let raw = index
      .and_then(|i| i64::try_from(i).ok())
      .unwrap_or(NO_DETECTION);
    self.index.store(raw, Ordering::Release);
  }

  pub fn load(&self) -> Option<usize> {
    usize::try_from(self.index.load(Ordering::Acquire)).ok()
  }
}

/// 返回最大值及其首次出现的下标，NaN 被跳过。
pub fn arg_max(scores: &[f32]) -> Option<(usize, f32)> {
  scores
    .iter()
    .copied()
    .enumerate()
    .filter(|(_, score)| !score.is_nan())
    .fold(None, |best, (i, score)| match best {
      Some((_, max)) if score <= max => best,
      _ => Some((i, score)),
    })
}

/// 校验尺寸并归约为类别索引。
///
/// 最大分数不为正时视为无检测，返回 `Ok(None)`。
pub fn top_label_index(scores: &[f32], expected: usize) -> Result<Option<usize>, ShapeMismatch> {
  if scores.len() != expected {
    return Err(ShapeMismatch {
      expected,
      actual: scores.len(),
    });
  }

  Ok(
    arg_max(scores)
      .filter(|(_, max)| *max > 0.0)
      .map(|(i, _)| i),
  )
}

/// 分类结果归约器
#[derive(Debug, Clone)]
pub struct TopLabelReducer {
  expected: usize,
  tensor_type: TensorType,
  slot: Arc<ResultSlot>,
}

impl TopLabelReducer {
  /// `expected` 为标签目录大小
  pub fn new(expected: usize, tensor_type: TensorType, slot: Arc<ResultSlot>) -> Self {
    Self {
      expected,
      tensor_type,
      slot,
    }
  }

  pub fn slot(&self) -> &Arc<ResultSlot> {
    &self.slot
  }

  /// 归约一段已解码的分数，结果写入寄存器并返回。
  pub fn on_scores(&self, scores: &[f32]) -> Option<usize> {
    let index = top_label_index(scores, self.expected).unwrap_or_else(|e| {
      error!("意外的数据尺寸 [{}]: {}", scores.len(), e);
      None
    });
    self.slot.store(index);
    index
  }

  /// 解码 `tensor_sink` 交付的原始字节后归约。
  pub fn on_tensor(&self, bytes: &[u8]) -> Option<usize> {
    match decode_scores(bytes, self.tensor_type) {
      Ok(scores) => self.on_scores(&scores),
      Err(e) => {
        error!("无法解码张量 ({}): {}", self.tensor_type, e);
        self.slot.store(None);
        None
      }
    }
  }
}
