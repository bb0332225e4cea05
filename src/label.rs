// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 检测类别标签
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

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> i64;
  fn from_label_id(id: i64) -> Self;
}

/// KITTI 3D 检测类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KittiLabel {
  Car,
  Pedestrian,
  Cyclist,
  Unknown(i64),
}

static KITTI_LABELS: [KittiLabel; 3] = [KittiLabel::Car, KittiLabel::Pedestrian, KittiLabel::Cyclist];

impl WithLabel for KittiLabel {
  fn to_label_str(&self) -> String {
    match self {
      KittiLabel::Car => "Car".to_string(),
      KittiLabel::Pedestrian => "Pedestrian".to_string(),
      KittiLabel::Cyclist => "Cyclist".to_string(),
      KittiLabel::Unknown(id) => format!("unknown-{}", id),
    }
  }

  fn to_label_id(&self) -> i64 {
    match self {
      KittiLabel::Car => 0,
      KittiLabel::Pedestrian => 1,
      KittiLabel::Cyclist => 2,
      KittiLabel::Unknown(id) => *id,
    }
  }

  fn from_label_id(id: i64) -> Self {
    usize::try_from(id)
      .ok()
      .and_then(|i| KITTI_LABELS.get(i).copied())
      .unwrap_or(KittiLabel::Unknown(id))
  }
}

/// nuScenes 检测任务的 10 个类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NusLabel {
  Car,
  Truck,
  ConstructionVehicle,
  Bus,
  Trailer,
  Barrier,
  Motorcycle,
  Bicycle,
  Pedestrian,
  TrafficCone,
  Unknown(i64),
}

static NUS_LABELS: [(NusLabel, &str); 10] = [
  (NusLabel::Car, "car"),
  (NusLabel::Truck, "truck"),
  (NusLabel::ConstructionVehicle, "construction_vehicle"),
  (NusLabel::Bus, "bus"),
  (NusLabel::Trailer, "trailer"),
  (NusLabel::Barrier, "barrier"),
  (NusLabel::Motorcycle, "motorcycle"),
  (NusLabel::Bicycle, "bicycle"),
  (NusLabel::Pedestrian, "pedestrian"),
  (NusLabel::TrafficCone, "traffic_cone"),
];

impl WithLabel for NusLabel {
  fn to_label_str(&self) -> String {
    match self {
      NusLabel::Unknown(id) => format!("unknown-{}", id),
      known => NUS_LABELS
        .iter()
        .find(|(label, _)| label == known)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default(),
    }
  }

  fn to_label_id(&self) -> i64 {
    match self {
      NusLabel::Unknown(id) => *id,
      known => NUS_LABELS
        .iter()
        .position(|(label, _)| label == known)
        .map(|i| i as i64)
        .unwrap_or(-1),
    }
  }

  fn from_label_id(id: i64) -> Self {
    usize::try_from(id)
      .ok()
      .and_then(|i| NUS_LABELS.get(i))
      .map(|(label, _)| *label)
      .unwrap_or(NusLabel::Unknown(id))
  }
}
