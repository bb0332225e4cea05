// 该文件是 Shanan （山南西风） 项目的一部分。
// src/points.rs - 点云格式转换
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

//! KITTI 训练的模型使用 (x, y, z, intensity) 作为输入，强度归一化到 [0, 1]；
//! nuScenes 训练的模型使用 (x, y, z, intensity, 0) 作为输入，强度范围为 [0, 255]。

use std::{fmt, str::FromStr};

use ndarray::{Array2, Axis, ShapeError, concatenate, s};
use thiserror::Error;
use tracing::debug;

/// 强度所在的列
pub const INTENSITY_COLUMN: usize = 3;
/// nuScenes 补零列插入的位置
pub const PAD_COLUMN: usize = 4;
const INTENSITY_SCALE: f32 = 255.0;

#[derive(Error, Debug)]
pub enum PointsError {
  #[error("点云列数不足: 至少需要 {expected} 列, 实际 {actual} 列")]
  TooFewColumns { expected: usize, actual: usize },
  #[error("未知的点云类型: {0}")]
  UnknownPcType(String),
  #[error("点云形状错误: {0}")]
  Shape(#[from] ShapeError),
}

/// 目标模型训练所用的数据集约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PcType {
  #[value(name = "kitti")]
  Kitti,
  #[value(name = "nus")]
  Nus,
}

impl PcType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PcType::Kitti => "kitti",
      PcType::Nus => "nus",
    }
  }

  /// 模型期望的输入列数
  pub fn channels(&self) -> usize {
    match self {
      PcType::Kitti => 4,
      PcType::Nus => 5,
    }
  }
}

impl fmt::Display for PcType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PcType {
  type Err = PointsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "kitti" => Ok(PcType::Kitti),
      "nus" => Ok(PcType::Nus),
      other => Err(PointsError::UnknownPcType(other.to_string())),
    }
  }
}

/// 将点云转换为目标模型需要的格式。
///
/// 强度列会在传入的缓冲区上原地缩放；`Nus` 会在第 4 列插入全零列，
/// 原有第 4 列及之后的列整体右移。
pub fn format_points(mut points: Array2<f32>, pc_type: PcType) -> Result<Array2<f32>, PointsError> {
  if points.ncols() <= INTENSITY_COLUMN {
    return Err(PointsError::TooFewColumns {
      expected: INTENSITY_COLUMN + 1,
      actual: points.ncols(),
    });
  }

  debug!(
    "格式化点云: 类型 {}, 形状 {}x{}",
    pc_type,
    points.nrows(),
    points.ncols()
  );

  match pc_type {
    PcType::Kitti => {
      points
        .column_mut(INTENSITY_COLUMN)
        .mapv_inplace(|v| v / INTENSITY_SCALE);
      Ok(points)
    }
    PcType::Nus => {
      points
        .column_mut(INTENSITY_COLUMN)
        .mapv_inplace(|v| v * INTENSITY_SCALE);
      let zeros = Array2::<f32>::zeros((points.nrows(), 1));
      let padded = concatenate(
        Axis(1),
        &[
          points.slice(s![.., ..PAD_COLUMN]),
          zeros.view(),
          points.slice(s![.., PAD_COLUMN..]),
        ],
      )?;
      debug!("补零后点云形状: {}x{}", padded.nrows(), padded.ncols());
      Ok(padded)
    }
  }
}
