// 该文件是 Shanan （山南西风） 项目的一部分。
// src/result.rs - 3D 检测结果归一化
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

//! mmdet3d 与 det3d 输出的检测结果字段布局不同，这里统一转换为
//! `boxes_3d` (N×7)、`scores_3d` (N)、`labels_3d` (N×1)。

use std::{fmt, str::FromStr};

use ndarray::{Array1, Array2, Axis};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  label::WithLabel,
  tensor::{Tensor, TensorError},
};

/// 3D 框的最少字段数: x, y, z, dx, dy, dz, yaw
pub const BOX_DIM: usize = 7;
/// 带速度的 3D 框字段数 (nuScenes): ..., vx, vy
pub const BOX_DIM_WITH_VELOCITY: usize = 9;

#[derive(Error, Debug)]
pub enum ResultError {
  #[error("检测结果为空")]
  EmptyBatch,
  #[error("未知的代码库: {0}")]
  UnknownCodebase(String),
  #[error("代码库不匹配: 期望 {expected}, 实际 {actual}")]
  CodebaseMismatch { expected: Codebase, actual: Codebase },
  #[error("3D 框字段数不足: 至少需要 7 个, 实际 {0} 个")]
  BoxDim(usize),
  #[error("检测数量不一致: boxes {boxes}, scores {scores}, labels {labels}")]
  LengthMismatch {
    boxes: usize,
    scores: usize,
    labels: usize,
  },
  #[error("张量错误: {0}")]
  Tensor(#[from] TensorError),
}

/// 产生检测结果的框架
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Codebase {
  #[value(name = "mmdet3d")]
  Mmdet3d,
  #[value(name = "det3d")]
  Det3d,
}

impl Codebase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Codebase::Mmdet3d => "mmdet3d",
      Codebase::Det3d => "det3d",
    }
  }
}

impl fmt::Display for Codebase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Codebase {
  type Err = ResultError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "mmdet3d" => Ok(Codebase::Mmdet3d),
      "det3d" => Ok(Codebase::Det3d),
      other => Err(ResultError::UnknownCodebase(other.to_string())),
    }
  }
}

/// mmdet3d 的 3D 框对象，数据位于 `tensor` 字段
#[derive(Debug, Clone, PartialEq)]
pub struct Boxes3d {
  pub tensor: Tensor<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mmdet3dBoxSet {
  pub boxes_3d: Boxes3d,
  pub scores_3d: Tensor<f32>,
  pub labels_3d: Tensor<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mmdet3dResult {
  /// KITTI 模型: 字段位于顶层
  Flat(Mmdet3dBoxSet),
  /// nuScenes 模型: 字段嵌套在 `pts_bbox` 下
  PtsBbox(Mmdet3dBoxSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Det3dBoxSet {
  pub box3d_lidar: Tensor<f32>,
  pub scores: Tensor<f32>,
  pub label_preds: Tensor<i64>,
}

/// 上游推理引擎输出的原始结果，由上游决定具体形态
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
  Mmdet3d(Mmdet3dResult),
  Det3d(Det3dBoxSet),
}

impl RawResult {
  pub fn codebase(&self) -> Codebase {
    match self {
      RawResult::Mmdet3d(_) => Codebase::Mmdet3d,
      RawResult::Det3d(_) => Codebase::Det3d,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem3d<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [f32; BOX_DIM], // [x, y, z, dx, dy, dz, yaw]
  pub velocity: Option<[f32; 2]>,
}

/// 归一化后的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct DetResult3d {
  pub boxes_3d: Array2<f32>,
  pub scores_3d: Array1<f32>,
  pub labels_3d: Array2<i64>,
}

/// 将不同框架的检测结果转换为统一格式。
///
/// `result` 为推理接口返回的批次，只使用第一个元素。
pub fn format_result(result: Vec<RawResult>, codebase: Codebase) -> Result<DetResult3d, ResultError> {
  let batch = result.len();
  let first = result.into_iter().next().ok_or(ResultError::EmptyBatch)?;
  if batch > 1 {
    warn!("检测结果批次大小为 {}, 仅使用第一个", batch);
  }

  let (boxes, scores, labels) = match (codebase, first) {
    (Codebase::Mmdet3d, RawResult::Mmdet3d(res)) => {
      let set = match res {
        Mmdet3dResult::PtsBbox(set) => {
          debug!("mmdet3d 结果: 使用 pts_bbox 字段");
          set
        }
        Mmdet3dResult::Flat(set) => {
          debug!("mmdet3d 结果: 使用顶层字段");
          set
        }
      };
      (set.boxes_3d.tensor, set.scores_3d, set.labels_3d)
    }
    (Codebase::Det3d, RawResult::Det3d(set)) => {
      debug!("det3d 结果");
      (set.box3d_lidar, set.scores, set.label_preds)
    }
    (expected, other) => {
      return Err(ResultError::CodebaseMismatch {
        expected,
        actual: other.codebase(),
      });
    }
  };

  DetResult3d::from_tensors(boxes, scores, labels)
}

impl DetResult3d {
  pub fn from_tensors(
    boxes: Tensor<f32>,
    scores: Tensor<f32>,
    labels: Tensor<i64>,
  ) -> Result<Self, ResultError> {
    let boxes_3d = boxes.into_matrix()?;
    let scores_3d = scores.into_column()?.index_axis_move(Axis(1), 0);
    let labels_3d = labels.into_column()?;

    if boxes_3d.ncols() < BOX_DIM {
      return Err(ResultError::BoxDim(boxes_3d.ncols()));
    }

    if boxes_3d.nrows() != scores_3d.len() || boxes_3d.nrows() != labels_3d.nrows() {
      return Err(ResultError::LengthMismatch {
        boxes: boxes_3d.nrows(),
        scores: scores_3d.len(),
        labels: labels_3d.nrows(),
      });
    }

    debug!(
      "归一化检测结果: {} 个目标, 框字段数 {}",
      boxes_3d.nrows(),
      boxes_3d.ncols()
    );

    Ok(Self {
      boxes_3d,
      scores_3d,
      labels_3d,
    })
  }

  pub fn len(&self) -> usize {
    self.scores_3d.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores_3d.is_empty()
  }

  pub fn items<T: WithLabel>(&self) -> Vec<DetectItem3d<T>> {
    self
      .boxes_3d
      .outer_iter()
      .zip(self.scores_3d.iter())
      .zip(self.labels_3d.column(0).iter())
      .map(|((row, &score), &label)| {
        let mut bbox = [0.0f32; BOX_DIM];
        for (dst, src) in bbox.iter_mut().zip(row.iter()) {
          *dst = *src;
        }
        let velocity = (row.len() >= BOX_DIM_WITH_VELOCITY).then(|| [row[BOX_DIM], row[BOX_DIM + 1]]);
        DetectItem3d {
          kind: T::from_label_id(label),
          score,
          bbox,
          velocity,
        }
      })
      .collect()
  }

  /// 保留置信度不低于阈值的目标
  pub fn filter_score(&self, threshold: f32) -> Self {
    let keep: Vec<usize> = self
      .scores_3d
      .iter()
      .enumerate()
      .filter(|(_, s)| **s >= threshold)
      .map(|(i, _)| i)
      .collect();
    debug!("置信度过滤: {} -> {}", self.len(), keep.len());

    Self {
      boxes_3d: self.boxes_3d.select(Axis(0), &keep),
      scores_3d: self.scores_3d.select(Axis(0), &keep),
      labels_3d: self.labels_3d.select(Axis(0), &keep),
    }
  }

  pub fn to_json(&self) -> Value {
    let boxes: Vec<Vec<f32>> = self.boxes_3d.outer_iter().map(|r| r.to_vec()).collect();
    let labels: Vec<Vec<i64>> = self.labels_3d.outer_iter().map(|r| r.to_vec()).collect();
    json!({
      "boxes_3d": boxes,
      "scores_3d": self.scores_3d.to_vec(),
      "labels_3d": labels,
    })
  }

  /// 每个目标一行: `label, score, x, y, z, dx, dy, dz, yaw`
  pub fn to_records<T: WithLabel>(&self, label_with_name: bool) -> Vec<String> {
    self
      .items::<T>()
      .iter()
      .map(|item| {
        let name = if label_with_name {
          item.kind.to_label_str()
        } else {
          format!("{}", item.kind.to_label_id())
        };
        let b = &item.bbox;
        format!(
          "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
          name, item.score, b[0], b[1], b[2], b[3], b[4], b[5], b[6]
        )
      })
      .collect()
  }
}
