// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 标签目录
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

//! # 标签目录
//!
//! 标签文件为纯文本，每行一个标签，行号（从 0 开始）即类别索引。
//! 文件没有表头，也没有转义。

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum LabelError {
  /// 标签文件不存在
  #[error("找不到标签文件: {0}")]
  FileNotFound(PathBuf),
  #[error("读取标签文件 {path} 失败: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 有序的类别标签列表，加载后不可变。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
  labels: Box<[String]>,
}

impl LabelCatalog {
  /// 从标签文件加载目录。
  ///
  /// 文件不存在时返回 [`LabelError::FileNotFound`]，调用方应当中止启动。
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        error!("找不到标签文件 [{}]", path.display());
        LabelError::FileNotFound(path.to_path_buf())
      } else {
        LabelError::IoError {
          path: path.to_path_buf(),
          source: e,
        }
      }
    })?;

    let catalog = Self::parse(&content);
    info!("标签加载完成, 共 [{}] 个", catalog.len());
    Ok(catalog)
  }

  /// 按行解析标签文本，去掉行尾的 `\n` 或 `\r\n`。
  pub fn parse(content: &str) -> Self {
    content.lines().map(String::from).collect()
  }

  /// 返回索引对应的标签；哨兵值或越界索引返回空字符串。
  pub fn label_for(&self, index: Option<usize>) -> &str {
    index
      .and_then(|i| self.labels.get(i))
      .map(String::as_str)
      .unwrap_or("")
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl FromIterator<String> for LabelCatalog {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}

impl<'a> FromIterator<&'a str> for LabelCatalog {
  fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
    iter.into_iter().map(String::from).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_load_keeps_line_order() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "background\nperson\nbicycle\n").unwrap();

    let catalog = LabelCatalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.label_for(Some(0)), "background");
    assert_eq!(catalog.label_for(Some(1)), "person");
    assert_eq!(catalog.label_for(Some(2)), "bicycle");
  }

  #[test]
  fn test_load_strips_crlf_and_keeps_blank_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "cat\r\n\r\ndog").unwrap();

    let catalog = LabelCatalog::load(file.path()).unwrap();
    assert_eq!(catalog.iter().collect::<Vec<_>>(), vec!["cat", "", "dog"]);
  }

  #[test]
  fn test_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("labels.txt");

    match LabelCatalog::load(&missing) {
      Err(LabelError::FileNotFound(path)) => assert_eq!(path, missing),
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  fn test_label_for_out_of_range() {
    let catalog: LabelCatalog = ["cat", "dog"].into_iter().collect();
    assert_eq!(catalog.label_for(None), "");
    assert_eq!(catalog.label_for(Some(2)), "");
    assert_eq!(catalog.label_for(Some(usize::MAX)), "");
  }
}
