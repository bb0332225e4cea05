// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 推理框架张量封装
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

use ndarray::{Array1, Array2, ArrayD, Ix2, IxDyn, ShapeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
  #[error("张量形状错误: {0}")]
  Shape(#[from] ShapeError),
  #[error("张量维度不匹配: 期望 {expected} 维, 实际形状 {actual:?}")]
  Rank { expected: usize, actual: Vec<usize> },
}

/// 上游推理引擎交出的张量，数据已位于主机内存。
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
  data: ArrayD<T>,
}

impl<T> Tensor<T> {
  pub fn from_shape_vec(shape: &[usize], data: Vec<T>) -> Result<Self, TensorError> {
    let data = ArrayD::from_shape_vec(IxDyn(shape), data)?;
    Ok(Self { data })
  }

  pub fn shape(&self) -> &[usize] {
    self.data.shape()
  }

  pub fn ndim(&self) -> usize {
    self.data.ndim()
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 按二维矩阵取出，秩必须为 2。
  pub fn into_matrix(self) -> Result<Array2<T>, TensorError> {
    if self.data.ndim() != 2 {
      return Err(TensorError::Rank {
        expected: 2,
        actual: self.data.shape().to_vec(),
      });
    }
    Ok(self.data.into_dimensionality::<Ix2>()?)
  }
}

impl<T: Clone> Tensor<T> {
  /// 等价于 `reshape(-1, 1)`：按逻辑顺序展平为 N×1。
  pub fn into_column(self) -> Result<Array2<T>, TensorError> {
    let flat: Vec<T> = self.data.iter().cloned().collect();
    Ok(Array2::from_shape_vec((flat.len(), 1), flat)?)
  }
}

impl<T> From<ArrayD<T>> for Tensor<T> {
  fn from(data: ArrayD<T>) -> Self {
    Self { data }
  }
}

impl<T> From<Array1<T>> for Tensor<T> {
  fn from(data: Array1<T>) -> Self {
    Self {
      data: data.into_dyn(),
    }
  }
}

impl<T> From<Array2<T>> for Tensor<T> {
  fn from(data: Array2<T>) -> Self {
    Self {
      data: data.into_dyn(),
    }
  }
}
