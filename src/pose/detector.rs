use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};
use super::preprocess::BLAZEPOSE_INPUT_SIZE;

/// ランドマーク1点あたりの出力値数 (x, y, z, visibility, presence)
const VALUES_PER_LANDMARK: usize = 5;

/// BlazePose を使用した姿勢検出器
///
/// 外部モデルのラッパー。ポーズが写っていないフレームでは None を返す。
pub struct PoseDetector {
    session: Session,
    presence_threshold: f32,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, presence_threshold: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self {
            session,
            presence_threshold,
        })
    }

    /// 前処理済みテンソルから姿勢を検出
    ///
    /// 入力: [1, 256, 256, 3] の f32 テンソル
    /// 出力: ポーズ存在スコアが閾値以上なら LandmarkSet、未満なら None
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Option<LandmarkSet>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["input" => input_tensor])
            .context("Inference failed")?;

        // Identity_1: ポーズ存在スコア [1, 1]
        let flag: ndarray::ArrayViewD<f32> = outputs["Identity_1"]
            .try_extract_array()
            .context("Failed to extract pose flag tensor")?;
        if flag[[0, 0]] < self.presence_threshold {
            return Ok(None);
        }

        // Identity: ランドマーク [1, 195] (39点 x [x, y, z, visibility, presence]、
        // 末尾6点は補助点なので先頭33点のみ読む)
        // 座標は入力解像度ピクセル、visibilityはロジット
        let output: ndarray::ArrayViewD<f32> = outputs["Identity"]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;

        let scale = BLAZEPOSE_INPUT_SIZE as f32;
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];

        for i in 0..LandmarkIndex::COUNT {
            let base = i * VALUES_PER_LANDMARK;
            let x = output[[0, base]] / scale;
            let y = output[[0, base + 1]] / scale;
            let visibility = sigmoid(output[[0, base + 3]]);

            landmarks[i] = Landmark::new(x, y, visibility);
        }

        Ok(Some(LandmarkSet::new(landmarks)))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
