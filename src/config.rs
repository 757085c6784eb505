// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 模型与标签文件检查
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::label::{LabelCatalog, LabelError};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("找不到模型文件: {0}")]
  ModelNotFound(PathBuf),
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
}

/// 启动所需的模型文件与标签文件
#[derive(Debug, Clone)]
pub struct ModelFiles {
  pub model: PathBuf,
  pub labels: PathBuf,
}

impl ModelFiles {
  pub fn new(model: impl Into<PathBuf>, labels: impl Into<PathBuf>) -> Self {
    Self {
      model: model.into(),
      labels: labels.into(),
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model
  }

  /// 检查模型文件存在并加载标签；任一失败都应中止启动。
  pub fn check(&self) -> Result<LabelCatalog, ConfigError> {
    if !self.model.is_file() {
      error!("找不到模型文件 [{}]", self.model.display());
      return Err(ConfigError::ModelNotFound(self.model.clone()));
    }
    info!("模型文件: {}", self.model.display());

    Ok(LabelCatalog::load(&self.labels)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let files = ModelFiles::new(dir.path().join("model.pb"), dir.path().join("labels.txt"));

    assert!(matches!(files.check(), Err(ConfigError::ModelNotFound(_))));
  }

  #[test]
  fn test_missing_labels_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.pb");
    std::fs::write(&model, b"opaque").unwrap();
    let files = ModelFiles::new(model, dir.path().join("labels.txt"));

    assert!(matches!(
      files.check(),
      Err(ConfigError::Label(LabelError::FileNotFound(_)))
    ));
  }

  #[test]
  fn test_check_loads_labels() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.pb");
    std::fs::write(&model, b"opaque").unwrap();
    let labels = dir.path().join("labels.txt");
    let mut file = std::fs::File::create(&labels).unwrap();
    writeln!(file, "cat").unwrap();
    writeln!(file, "dog").unwrap();

    let catalog = ModelFiles::new(model, labels).check().unwrap();
    assert_eq!(catalog.len(), 2);
  }
}
