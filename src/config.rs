// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 格式转换配置
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

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  points::{PcType, PointsError},
  result::{Codebase, ResultError},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少代码库名称")]
  MissingCodebase,
  #[error("缺少点云类型参数 pc")]
  MissingPcType,
  #[error("无效的置信度阈值: {0}")]
  InvalidThreshold(String),
  #[error("点云类型错误: {0}")]
  PcType(#[from] PointsError),
  #[error("代码库错误: {0}")]
  Codebase(#[from] ResultError),
}

/// 一次推理管线使用的格式转换配置。
///
/// URL 形式: `det3d://<mmdet3d|det3d>?pc=<kitti|nus>&score=<阈值>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatConfig {
  pub pc_type: PcType,
  pub codebase: Codebase,
  pub score_threshold: f32,
}

impl FormatConfig {
  pub fn new(pc_type: PcType, codebase: Codebase) -> Self {
    Self {
      pc_type,
      codebase,
      score_threshold: 0.0,
    }
  }

  pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
    self.score_threshold = score_threshold;
    self
  }
}

impl FromUrlWithScheme for FormatConfig {
  const SCHEME: &'static str = "det3d";
}

impl FromUrl for FormatConfig {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConfigError::SchemeMismatch);
    }

    let codebase: Codebase = match url.host_str() {
      Some(host) if !host.is_empty() => host.parse()?,
      _ => return Err(ConfigError::MissingCodebase),
    };

    let mut pc_type = None;
    let mut score_threshold = 0.0;
    for (k, v) in url.query_pairs() {
      match &*k {
        "pc" => pc_type = Some(v.parse::<PcType>()?),
        "score" => {
          score_threshold = v
            .parse::<f32>()
            .ok()
            .filter(|s| (0.0..=1.0).contains(s))
            .ok_or_else(|| ConfigError::InvalidThreshold(v.to_string()))?;
        }
        other => debug!("忽略未知参数: {}", other),
      }
    }

    let pc_type = pc_type.ok_or(ConfigError::MissingPcType)?;
    debug!(
      "格式配置: 点云 {}, 代码库 {}, 阈值 {}",
      pc_type, codebase, score_threshold
    );

    Ok(FormatConfig {
      pc_type,
      codebase,
      score_threshold,
    })
  }
}
