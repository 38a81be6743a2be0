use anyhow::Result;
use opencv::core::Mat;
use opencv::prelude::*;
use std::time::{Duration, Instant};

use super::garment::Garment;
use super::placement::{self, PlacementCoefficients, Transform};
use super::smooth::PointSmoother;
use crate::pose::LandmarkSet;
use crate::render::canvas;

/// ポーズ未検出時の案内表示
pub const NO_POSE_LINES: [&str; 2] = ["Stand in front of camera", "to try on clothes"];
/// 衣服未選択時の案内表示
pub const NO_GARMENT_LINES: [&str; 2] = ["Select a product", "to try it on"];

/// レンダリングループの状態
///
/// 遷移は毎フレーム、入力の有無だけから再評価される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// フレーム未到着
    AwaitingCamera,
    /// フレームはあるがポーズまたは衣服がない
    AwaitingPose,
    /// ランドマークと衣服が揃い、合成中
    Overlaying,
}

/// クライアント側セッション状態
///
/// 選択中の衣服とミラーフラグをひとつのオブジェクトに集約する。
/// モジュールグローバルには置かない。
pub struct SessionState {
    pub garment: Option<Garment>,
    pub mirror: bool,
}

impl SessionState {
    pub fn new(mirror: bool) -> Self {
        Self {
            garment: None,
            mirror,
        }
    }

    /// 衣服を差し替える。読み込み失敗時はNoneを渡して未選択に戻す
    pub fn select_garment(&mut self, garment: Option<Garment>) {
        match &garment {
            Some(g) => tracing::info!("garment selected: {} ({:?})", g.name, g.category),
            None => tracing::info!("garment cleared"),
        }
        self.garment = garment;
    }

    pub fn toggle_mirror(&mut self) {
        self.mirror = !self.mirror;
    }
}

/// フレーム間隔の下限ゲート
///
/// 早すぎるフレームはドロップする。判定時刻は引数で受け取る。
pub struct FrameThrottle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(max_fps: u32) -> Self {
        let max_fps = max_fps.max(1);
        Self {
            min_interval: Duration::from_secs_f64(1.0 / max_fps as f64),
            last: None,
        }
    }

    /// このフレームを処理すべきなら true を返し、基準時刻を進める
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// 1フレーム分の描画判断
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDecision {
    /// フレーム未到着。何も描かない
    Blank,
    /// カメラフレーム + 案内テキスト
    Instructions(&'static [&'static str]),
    /// カメラフレーム + 配置済み衣服
    Overlay(Transform),
}

/// 試着オーバーレイエンジン
///
/// 毎フレームの配置計算と合成。ランドマーク検出は外部、キャンバスは
/// 単一所有で、同一フレームへの並行描画は行わない。
pub struct TryOnEngine {
    coefficients: PlacementCoefficients,
    visibility_threshold: f32,
    smoother: PointSmoother,
    state: EngineState,
}

impl TryOnEngine {
    pub fn new(
        coefficients: PlacementCoefficients,
        visibility_threshold: f32,
        smooth_alpha: f32,
    ) -> Self {
        Self {
            coefficients,
            visibility_threshold,
            smoother: PointSmoother::new(smooth_alpha),
            state: EngineState::AwaitingCamera,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// 入力の有無から今フレームの描画判断を導く
    ///
    /// ランドマークがなくても失敗しない。配置が計算できない場合は
    /// 案内表示に戻る。
    pub fn advance(
        &mut self,
        canvas_size: Option<(u32, u32)>,
        landmarks: Option<&LandmarkSet>,
        session: &SessionState,
    ) -> FrameDecision {
        let (width, height) = match canvas_size {
            Some(size) => size,
            None => {
                self.state = EngineState::AwaitingCamera;
                return FrameDecision::Blank;
            }
        };

        let garment = match &session.garment {
            Some(g) => g,
            None => {
                self.state = EngineState::AwaitingPose;
                self.smoother.reset();
                return FrameDecision::Instructions(&NO_GARMENT_LINES);
            }
        };

        let set = match landmarks {
            Some(set) => set,
            None => {
                self.state = EngineState::AwaitingPose;
                self.smoother.reset();
                return FrameDecision::Instructions(&NO_POSE_LINES);
            }
        };

        let transform = placement::compute_transform(
            set,
            width,
            height,
            session.mirror,
            garment.category,
            &self.coefficients,
            self.visibility_threshold,
        );

        match transform {
            Some(mut transform) => {
                transform.anchor = self.smoother.apply(transform.anchor);
                self.state = EngineState::Overlaying;
                FrameDecision::Overlay(transform)
            }
            None => {
                self.state = EngineState::AwaitingPose;
                self.smoother.reset();
                FrameDecision::Instructions(&NO_POSE_LINES)
            }
        }
    }

    /// 判断に従ってキャンバスへ描画する
    ///
    /// カメラフレームを敷いてから、案内テキストまたは衣服を重ねる。
    pub fn render(
        &self,
        decision: &FrameDecision,
        frame: &Mat,
        session: &SessionState,
        canvas: &mut Mat,
    ) -> Result<()> {
        frame.copy_to(canvas)?;

        match decision {
            FrameDecision::Blank => {}
            FrameDecision::Instructions(lines) => {
                canvas::draw_instructions(canvas, lines)?;
            }
            FrameDecision::Overlay(transform) => {
                if let Some(garment) = &session.garment {
                    canvas::composite_garment(canvas, &garment.image, transform)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::garment::GarmentCategory;
    use crate::pose::{Landmark, LandmarkIndex, LandmarkSet};

    fn engine() -> TryOnEngine {
        TryOnEngine::new(PlacementCoefficients::default(), 0.5, 1.0)
    }

    fn session_with_garment() -> SessionState {
        let mut session = SessionState::new(false);
        session.garment = Some(Garment {
            name: "White T-Shirt".to_string(),
            category: GarmentCategory::Top,
            image: Mat::default(),
        });
        session
    }

    fn full_body_set() -> LandmarkSet {
        use LandmarkIndex::*;
        let mut set = LandmarkSet::default();
        let mut put = |idx: LandmarkIndex, x: f32, y: f32| {
            set.landmarks[idx as usize] = Landmark::new(x, y, 0.9);
        };
        put(LeftShoulder, 0.45, 0.2);
        put(RightShoulder, 0.55, 0.2);
        put(LeftHip, 0.46, 0.35);
        put(RightHip, 0.54, 0.35);
        put(LeftKnee, 0.47, 0.41);
        put(RightKnee, 0.53, 0.41);
        put(LeftAnkle, 0.47, 0.55);
        put(RightAnkle, 0.53, 0.55);
        set
    }

    #[test]
    fn test_awaiting_camera_without_frame() {
        let mut engine = engine();
        let session = session_with_garment();
        let decision = engine.advance(None, None, &session);
        assert_eq!(decision, FrameDecision::Blank);
        assert_eq!(engine.state(), EngineState::AwaitingCamera);
    }

    #[test]
    fn test_instructions_without_garment() {
        let mut engine = engine();
        let session = SessionState::new(false);
        let set = full_body_set();
        let decision = engine.advance(Some((640, 480)), Some(&set), &session);
        assert_eq!(decision, FrameDecision::Instructions(&NO_GARMENT_LINES));
        assert_eq!(engine.state(), EngineState::AwaitingPose);
    }

    #[test]
    fn test_instructions_without_pose() {
        // ランドマークなしでもパニックせず案内表示になる
        let mut engine = engine();
        let session = session_with_garment();
        let decision = engine.advance(Some((640, 480)), None, &session);
        assert_eq!(decision, FrameDecision::Instructions(&NO_POSE_LINES));
        assert_eq!(engine.state(), EngineState::AwaitingPose);
    }

    #[test]
    fn test_overlay_with_pose_and_garment() {
        let mut engine = engine();
        let session = session_with_garment();
        let set = full_body_set();
        let decision = engine.advance(Some((640, 480)), Some(&set), &session);
        assert!(matches!(decision, FrameDecision::Overlay(_)));
        assert_eq!(engine.state(), EngineState::Overlaying);
    }

    #[test]
    fn test_unusable_landmarks_fall_back_to_instructions() {
        let mut engine = engine();
        let session = session_with_garment();
        let set = LandmarkSet::default(); // 全点 visibility 0.0
        let decision = engine.advance(Some((640, 480)), Some(&set), &session);
        assert_eq!(decision, FrameDecision::Instructions(&NO_POSE_LINES));
        assert_eq!(engine.state(), EngineState::AwaitingPose);
    }

    #[test]
    fn test_state_recovers_every_frame() {
        let mut engine = engine();
        let session = session_with_garment();
        let set = full_body_set();

        engine.advance(Some((640, 480)), Some(&set), &session);
        assert_eq!(engine.state(), EngineState::Overlaying);

        // ポーズ喪失 → AwaitingPose
        engine.advance(Some((640, 480)), None, &session);
        assert_eq!(engine.state(), EngineState::AwaitingPose);

        // 復帰 → Overlaying
        engine.advance(Some((640, 480)), Some(&set), &session);
        assert_eq!(engine.state(), EngineState::Overlaying);
    }

    #[test]
    fn test_throttle_drops_fast_frames() {
        let mut throttle = FrameThrottle::new(15);
        let t0 = Instant::now();
        assert!(throttle.ready(t0));
        // 15fps → 約66ms未満はドロップ
        assert!(!throttle.ready(t0 + Duration::from_millis(10)));
        assert!(!throttle.ready(t0 + Duration::from_millis(60)));
        assert!(throttle.ready(t0 + Duration::from_millis(70)));
    }

    #[test]
    fn test_throttle_first_frame_passes() {
        let mut throttle = FrameThrottle::new(15);
        assert!(throttle.ready(Instant::now()));
    }

    #[test]
    fn test_toggle_mirror() {
        let mut session = SessionState::new(true);
        session.toggle_mirror();
        assert!(!session.mirror);
        session.toggle_mirror();
        assert!(session.mirror);
    }
}
