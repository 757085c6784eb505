// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 张量字节解码
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

//! # 张量字节解码
//!
//! `tensor_sink` 交付的每块内存是一段按 `tensor_filter` 声明的
//! `outputtype` 排列的原始字节（本机字节序）。这里把它显式转换为
//! `f32` 分数序列，元素个数才是与标签数比较的尺寸。

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
  #[error("字节长度 {len} 不是元素大小 {element_size} 的整数倍")]
  UnalignedLength { len: usize, element_size: usize },
  #[error("不支持的张量类型: {0}")]
  UnknownType(String),
}

/// NNStreamer 张量元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorType {
  Int8,
  #[default]
  UInt8,
  Int16,
  UInt16,
  Int32,
  UInt32,
  Float32,
  Float64,
}

impl TensorType {
  pub fn element_size(self) -> usize {
    match self {
      TensorType::Int8 | TensorType::UInt8 => 1,
      TensorType::Int16 | TensorType::UInt16 => 2,
      TensorType::Int32 | TensorType::UInt32 | TensorType::Float32 => 4,
      TensorType::Float64 => 8,
    }
  }

  /// `tensor_filter` 的 `inputtype` / `outputtype` 属性写法
  pub fn as_str(self) -> &'static str {
    match self {
      TensorType::Int8 => "int8",
      TensorType::UInt8 => "uint8",
      TensorType::Int16 => "int16",
      TensorType::UInt16 => "uint16",
      TensorType::Int32 => "int32",
      TensorType::UInt32 => "uint32",
      TensorType::Float32 => "float32",
      TensorType::Float64 => "float64",
    }
  }
}

impl FromStr for TensorType {
  type Err = TensorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "int8" => Ok(TensorType::Int8),
      "uint8" => Ok(TensorType::UInt8),
      "int16" => Ok(TensorType::Int16),
      "uint16" => Ok(TensorType::UInt16),
      "int32" => Ok(TensorType::Int32),
      "uint32" => Ok(TensorType::UInt32),
      "float32" => Ok(TensorType::Float32),
      "float64" => Ok(TensorType::Float64),
      other => Err(TensorError::UnknownType(other.to_string())),
    }
  }
}

impl std::fmt::Display for TensorType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 按元素类型把原始字节解码为分数序列
pub fn decode_scores(bytes: &[u8], ty: TensorType) -> Result<Vec<f32>, TensorError> {
  let element_size = ty.element_size();
  if bytes.len() % element_size != 0 {
    return Err(TensorError::UnalignedLength {
      len: bytes.len(),
      element_size,
    });
  }

  let chunks = bytes.chunks_exact(element_size);
  let scores = match ty {
    TensorType::Int8 => chunks.map(|c| c[0] as i8 as f32).collect(),
    TensorType::UInt8 => chunks.map(|c| c[0] as f32).collect(),
    TensorType::Int16 => chunks
      .map(|c| i16::from_ne_bytes([c[0], c[1]]) as f32)
      .collect(),
    TensorType::UInt16 => chunks
      .map(|c| u16::from_ne_bytes([c[0], c[1]]) as f32)
      .collect(),
    TensorType::Int32 => chunks
      .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as f32)
      .collect(),
    TensorType::UInt32 => chunks
      .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as f32)
      .collect(),
    TensorType::Float32 => chunks
      .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
      .collect(),
    TensorType::Float64 => chunks
      .map(|c| f64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
      .collect(),
  };

  Ok(scores)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
  }

  #[test]
  fn test_decode_uint8_is_one_score_per_byte() {
    let scores = decode_scores(&[0, 17, 255], TensorType::UInt8).unwrap();
    assert_eq!(scores, vec![0.0, 17.0, 255.0]);
  }

  #[test]
  fn test_decode_float32() {
    let bytes = f32_bytes(&[0.25, -1.5, 3.0]);
    let scores = decode_scores(&bytes, TensorType::Float32).unwrap();
    assert_eq!(scores, vec![0.25, -1.5, 3.0]);
  }

  #[test]
  fn test_decode_int8_keeps_sign() {
    let scores = decode_scores(&[0xff, 0x01], TensorType::Int8).unwrap();
    assert_eq!(scores, vec![-1.0, 1.0]);
  }

  #[test]
  fn test_decode_rejects_partial_element() {
    let err = decode_scores(&[0, 0, 0, 0, 0], TensorType::Float32).unwrap_err();
    assert_eq!(
      err,
      TensorError::UnalignedLength {
        len: 5,
        element_size: 4
      }
    );
  }

  #[test]
  fn test_parse_type_names() {
    assert_eq!("float32".parse::<TensorType>(), Ok(TensorType::Float32));
    assert_eq!("uint8".parse::<TensorType>(), Ok(TensorType::UInt8));
    assert!("float16".parse::<TensorType>().is_err());
  }
}
