// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 推理任务集成测试
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

use std::{cell::RefCell, convert::Infallible};

use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};
use thiserror::Error;
use url::Url;

use shanan_det3d::{
  Codebase, DetResult3d, FormatConfig, FromUrl, PcType, RawResult,
  result::{Boxes3d, Det3dBoxSet, Mmdet3dBoxSet, Mmdet3dResult},
  task::{Consume, ContinuousTask, Detector3d, OneShotTask, Task},
  tensor::Tensor,
};

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn cloud(intensity: f32) -> Array2<f32> {
  array![[1.0, 2.0, 3.0, intensity], [4.0, 5.0, 6.0, intensity]]
}

#[derive(Error, Debug)]
#[error("推理失败")]
struct DetectFailed;

/// 按点云宽度返回 nuScenes 或 KITTI 风格的结果，并记录看到的输入
struct FakeDetector {
  codebase: Codebase,
  seen: RefCell<Vec<Array2<f32>>>,
  fail: bool,
}

impl FakeDetector {
  fn new(codebase: Codebase) -> Self {
    Self {
      codebase,
      seen: RefCell::new(Vec::new()),
      fail: false,
    }
  }
}

impl Detector3d for FakeDetector {
  type Error = DetectFailed;

  fn detect(&self, points: &Array2<f32>) -> Result<Vec<RawResult>, Self::Error> {
    if self.fail {
      return Err(DetectFailed);
    }
    self.seen.borrow_mut().push(points.clone());

    let boxes = array![
      [0.0f32, 0.0, 0.0, 4.0, 1.8, 1.5, 0.0],
      [5.0, 5.0, 0.0, 0.6, 0.6, 1.7, 0.3]
    ];
    let scores = array![0.95f32, 0.1];
    let labels = array![0i64, 8];

    let raw = match self.codebase {
      Codebase::Mmdet3d => {
        let set = Mmdet3dBoxSet {
          boxes_3d: Boxes3d {
            tensor: Tensor::from(boxes),
          },
          scores_3d: Tensor::from(scores),
          labels_3d: Tensor::from(labels),
        };
        if points.ncols() == PcType::Nus.channels() {
          RawResult::Mmdet3d(Mmdet3dResult::PtsBbox(set))
        } else {
          RawResult::Mmdet3d(Mmdet3dResult::Flat(set))
        }
      }
      Codebase::Det3d => RawResult::Det3d(Det3dBoxSet {
        box3d_lidar: Tensor::from(boxes),
        scores: Tensor::from(scores.insert_axis(ndarray::Axis(1))),
        label_preds: Tensor::from(labels),
      }),
    };
    Ok(vec![raw])
  }
}

#[derive(Default)]
struct Collect {
  results: RefCell<Vec<DetResult3d>>,
}

impl Consume for &Collect {
  type Error = Infallible;

  fn consume(&self, _points: &Array2<f32>, result: &DetResult3d) -> Result<(), Self::Error> {
    self.results.borrow_mut().push(result.clone());
    Ok(())
  }
}

impl Detector3d for &FakeDetector {
  type Error = DetectFailed;

  fn detect(&self, points: &Array2<f32>) -> Result<Vec<RawResult>, Self::Error> {
    (**self).detect(points)
  }
}

#[test]
fn one_shot_formats_points_and_results() {
  init_tracing();
  let config = FormatConfig::new(PcType::Nus, Codebase::Mmdet3d);
  let detector = FakeDetector::new(Codebase::Mmdet3d);
  let collect = Collect::default();

  OneShotTask::new(config)
    .run_task(vec![cloud(1.0), cloud(2.0)].into_iter(), &detector, &collect)
    .unwrap();

  let seen = detector.seen.borrow();
  assert_eq!(seen.len(), 1);
  assert_eq!(seen[0].shape(), &[2, 5]);
  assert_abs_diff_eq!(seen[0][[0, 3]], 255.0);
  assert_eq!(seen[0][[1, 4]], 0.0);

  let results = collect.results.borrow();
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].len(), 2);
  assert_eq!(results[0].labels_3d.shape(), &[2, 1]);
}

#[test]
fn continuous_respects_frame_limit_and_threshold() {
  init_tracing();
  let config = FormatConfig::from_url(&Url::parse("det3d://det3d?pc=kitti&score=0.5").unwrap()).unwrap();
  let detector = FakeDetector::new(Codebase::Det3d);
  let collect = Collect::default();

  ContinuousTask::new(config)
    .with_frame_number(Some(2))
    .run_task(
      vec![cloud(255.0), cloud(51.0), cloud(0.0)].into_iter(),
      &detector,
      &collect,
    )
    .unwrap();

  let seen = detector.seen.borrow();
  assert_eq!(seen.len(), 2);
  assert_eq!(seen[1].shape(), &[2, 4]);
  assert_abs_diff_eq!(seen[0][[0, 3]], 1.0);
  assert_abs_diff_eq!(seen[1][[1, 3]], 0.2, epsilon = 1e-6);

  let results = collect.results.borrow();
  assert_eq!(results.len(), 2);
  assert!(results.iter().all(|r| r.len() == 1));
  assert_eq!(results[0].scores_3d.ndim(), 1);
}

#[test]
fn codebase_mismatch_stops_the_task() {
  init_tracing();
  let config = FormatConfig::new(PcType::Kitti, Codebase::Mmdet3d);
  let detector = FakeDetector::new(Codebase::Det3d);
  let collect = Collect::default();

  let err = ContinuousTask::new(config)
    .run_task(vec![cloud(10.0)].into_iter(), &detector, &collect)
    .unwrap_err();
  assert!(err.to_string().contains("代码库不匹配"));
  assert!(collect.results.borrow().is_empty());
}

#[test]
fn detector_errors_propagate() {
  init_tracing();
  let config = FormatConfig::new(PcType::Kitti, Codebase::Det3d);
  let mut detector = FakeDetector::new(Codebase::Det3d);
  detector.fail = true;
  let collect = Collect::default();

  let err = OneShotTask::new(config)
    .run_task(vec![cloud(10.0)].into_iter(), &detector, &collect)
    .unwrap_err();
  assert!(err.downcast_ref::<DetectFailed>().is_some());
}

#[test]
fn one_shot_without_input_fails() {
  let config = FormatConfig::new(PcType::Kitti, Codebase::Det3d);
  let detector = FakeDetector::new(Codebase::Det3d);
  let collect = Collect::default();

  let result = OneShotTask::new(config).run_task(std::iter::empty::<Array2<f32>>(), &detector, &collect);
  assert!(result.is_err());
}
