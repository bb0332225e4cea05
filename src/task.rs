// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::Instant;

use ndarray::Array2;
use tracing::{debug, info};

use crate::{
  config::FormatConfig,
  points::format_points,
  result::{DetResult3d, RawResult, format_result},
};

/// 上游推理引擎
pub trait Detector3d {
  type Error;
  fn detect(&self, points: &Array2<f32>) -> Result<Vec<RawResult>, Self::Error>;
}

/// 下游结果消费者（可视化、评测等）
pub trait Consume {
  type Error;
  fn consume(&self, points: &Array2<f32>, result: &DetResult3d) -> Result<(), Self::Error>;
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn process_frame<M, O>(
  config: &FormatConfig,
  points: Array2<f32>,
  model: &M,
  output: &O,
) -> anyhow::Result<usize>
where
  M: Detector3d,
  M::Error: std::error::Error + Sync + Send + 'static,
  O: Consume,
  O::Error: std::error::Error + Sync + Send + 'static,
{
  let points = format_points(points, config.pc_type)?;
  let now = Instant::now();
  let raw = model.detect(&points)?;
  let elapsed = now.elapsed();
  info!("推理完成，耗时: {:.2?}", elapsed);

  let result = format_result(raw, config.codebase)?.filter_score(config.score_threshold);
  debug!("检测到 {} 个目标", result.len());
  output.consume(&points, &result)?;
  Ok(result.len())
}

pub struct OneShotTask {
  config: FormatConfig,
}

impl OneShotTask {
  pub fn new(config: FormatConfig) -> Self {
    Self { config }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Array2<f32>>,
  M: Detector3d<Error = ME>,
  O: Consume<Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let points = input.next().ok_or_else(|| anyhow::anyhow!("没有输入点云"))?;
    info!("输入点云获取成功: {} 个点", points.nrows());
    let count = process_frame(&self.config, points, &model, &output)?;
    info!("任务完成，共 {} 个目标", count);
    Ok(())
  }
}

#[derive(Debug)]
pub struct ContinuousTask {
  config: FormatConfig,
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn new(config: FormatConfig) -> Self {
    Self {
      config,
      frame_number: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Array2<f32>>,
  M: Detector3d<Error = ME>,
  O: Consume<Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let mut frame_index = 0usize;
    let mut total = 0usize;
    for points in input {
      frame_index += 1;
      info!("处理第 {} 帧点云", frame_index);
      total += process_frame(&self.config, points, &model, &output)?;
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
    }

    info!("任务完成，共 {} 帧 {} 个目标", frame_index, total);
    Ok(())
  }
}
