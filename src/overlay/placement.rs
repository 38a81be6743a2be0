use serde::Deserialize;

use super::garment::GarmentCategory;
use super::geometry::{self, PixelPoint};
use crate::pose::{LandmarkIndex, LandmarkSet};

/// 1カテゴリ分のサイズ決定係数
///
/// インラインのマジックナンバーを排し、一点で調整できるようにする。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SizingRule {
    /// 描画幅 = ペア間距離 × width_factor
    pub width_factor: f32,
    /// 描画高 = 垂直距離 × height_factor
    pub height_factor: f32,
    /// 描画高の下限（ピクセル）
    pub min_height: f32,
    /// 上方向シフト量 = 描画高 × lift
    pub lift: f32,
}

/// カテゴリ別の配置係数
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PlacementCoefficients {
    pub top: SizingRule,
    pub bottom: SizingRule,
    pub shorts: SizingRule,
}

impl Default for PlacementCoefficients {
    fn default() -> Self {
        Self {
            // トップス: 肩幅基準、襟元が肩のラインに揃うよう少し持ち上げる
            top: SizingRule {
                width_factor: 1.9,
                height_factor: 2.0,
                min_height: 20.0,
                lift: 0.18,
            },
            // ボトムス（フルレングス）: 腰幅基準、腰→足首
            bottom: SizingRule {
                width_factor: 2.5,
                height_factor: 1.4,
                min_height: 40.0,
                lift: 0.15,
            },
            // ショートパンツ: 腰→膝
            shorts: SizingRule {
                width_factor: 1.8,
                height_factor: 1.2,
                min_height: 30.0,
                lift: 0.1,
            },
        }
    }
}

/// 1フレーム分の描画配置
///
/// アンカー点を原点、angleだけ回転した座標系で軸平行の矩形として描く。
/// フレームごとに再計算され、保持されない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub anchor: PixelPoint,
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub angle: f32,
}

/// サイズ係数を適用して (幅, 高さ, 縦オフセット) を求める
fn size_rect(span: f32, extent: f32, rule: &SizingRule) -> (f32, f32, f32) {
    let width = span * rule.width_factor;
    let height = (extent * rule.height_factor).max(rule.min_height);
    let offset_y = -rule.lift * height;
    (width, height, offset_y)
}

fn usable_pair(
    set: &LandmarkSet,
    left: LandmarkIndex,
    right: LandmarkIndex,
    threshold: f32,
) -> bool {
    set.get(left).is_usable(threshold) && set.get(right).is_usable(threshold)
}

fn project_pair(
    set: &LandmarkSet,
    left: LandmarkIndex,
    right: LandmarkIndex,
    width: u32,
    height: u32,
    mirror: bool,
) -> (PixelPoint, PixelPoint) {
    (
        geometry::project(set.get(left), width, height, mirror),
        geometry::project(set.get(right), width, height, mirror),
    )
}

/// ランドマークとカテゴリから描画配置を計算する
///
/// 肩・腰が使えないフレームでは None（案内表示に戻る）。
/// 下半身カテゴリで膝・足首の可視度が閾値未満の場合は、信頼できない
/// データを使わず肩基準のサイズ決定にフォールバックする。
pub fn compute_transform(
    set: &LandmarkSet,
    canvas_width: u32,
    canvas_height: u32,
    mirror: bool,
    category: GarmentCategory,
    coeffs: &PlacementCoefficients,
    visibility_threshold: f32,
) -> Option<Transform> {
    use LandmarkIndex::*;

    // 全カテゴリが肩と腰を要求する
    if !usable_pair(set, LeftShoulder, RightShoulder, visibility_threshold)
        || !usable_pair(set, LeftHip, RightHip, visibility_threshold)
    {
        return None;
    }

    let (l_shoulder, r_shoulder) =
        project_pair(set, LeftShoulder, RightShoulder, canvas_width, canvas_height, mirror);
    let (l_hip, r_hip) = project_pair(set, LeftHip, RightHip, canvas_width, canvas_height, mirror);

    let shoulder_center = geometry::pair_center(l_shoulder, r_shoulder);
    let hip_center = geometry::pair_center(l_hip, r_hip);

    let top_variant = |coeffs: &PlacementCoefficients| {
        let span = geometry::span_width(l_shoulder, r_shoulder);
        let extent = geometry::vertical_extent(shoulder_center, hip_center);
        let (width, height, offset_y) = size_rect(span, extent, &coeffs.top);
        Transform {
            anchor: shoulder_center,
            width,
            height,
            offset_x: -width / 2.0,
            offset_y,
            angle: geometry::pair_angle(l_shoulder, r_shoulder),
        }
    };

    let transform = match category {
        GarmentCategory::Top => top_variant(coeffs),
        GarmentCategory::Bottom => {
            if !usable_pair(set, LeftAnkle, RightAnkle, visibility_threshold) {
                top_variant(coeffs)
            } else {
                let (l_ankle, r_ankle) =
                    project_pair(set, LeftAnkle, RightAnkle, canvas_width, canvas_height, mirror);
                let ankle_center = geometry::pair_center(l_ankle, r_ankle);
                let span = geometry::span_width(l_hip, r_hip);
                let leg_length = geometry::vertical_extent(hip_center, ankle_center);
                let (width, height, offset_y) = size_rect(span, leg_length, &coeffs.bottom);
                Transform {
                    anchor: hip_center,
                    width,
                    height,
                    offset_x: -width / 2.0,
                    offset_y,
                    angle: geometry::pair_angle(l_hip, r_hip),
                }
            }
        }
        GarmentCategory::Shorts => {
            if !usable_pair(set, LeftKnee, RightKnee, visibility_threshold) {
                top_variant(coeffs)
            } else {
                let (l_knee, r_knee) =
                    project_pair(set, LeftKnee, RightKnee, canvas_width, canvas_height, mirror);
                let knee_center = geometry::pair_center(l_knee, r_knee);
                let span = geometry::span_width(l_hip, r_hip);
                let knee_distance = geometry::vertical_extent(hip_center, knee_center);
                let (width, height, offset_y) = size_rect(span, knee_distance, &coeffs.shorts);
                Transform {
                    anchor: hip_center,
                    width,
                    height,
                    offset_x: -width / 2.0,
                    offset_y,
                    angle: geometry::pair_angle(l_hip, r_hip),
                }
            }
        }
    };

    Some(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    /// 1000x1000キャンバス上にテスト用のLandmarkSetを組み立てる
    fn make_set() -> LandmarkSet {
        use LandmarkIndex::*;
        let mut set = LandmarkSet::default();
        let mut put = |idx: LandmarkIndex, x: f32, y: f32, v: f32| {
            set.landmarks[idx as usize] = Landmark::new(x, y, v);
        };
        // 肩: span 100px, 中心 (500, 200)
        put(LeftShoulder, 0.45, 0.2, 0.9);
        put(RightShoulder, 0.55, 0.2, 0.9);
        // 腰: span 80px, 中心 (500, 350) → 肩からの垂直距離 150px
        put(LeftHip, 0.46, 0.35, 0.9);
        put(RightHip, 0.54, 0.35, 0.9);
        // 膝: 中心 (500, 410) → 腰から 60px
        put(LeftKnee, 0.47, 0.41, 0.9);
        put(RightKnee, 0.53, 0.41, 0.9);
        // 足首: 中心 (500, 550) → 腰から 200px
        put(LeftAnkle, 0.47, 0.55, 0.9);
        put(RightAnkle, 0.53, 0.55, 0.9);
        set
    }

    fn compute(set: &LandmarkSet, category: GarmentCategory) -> Option<Transform> {
        compute_transform(
            set,
            1000,
            1000,
            false,
            category,
            &PlacementCoefficients::default(),
            0.5,
        )
    }

    #[test]
    fn test_top_sizing() {
        // span=100, extent=150 → 190 x 300, 縦オフセット -54
        let t = compute(&make_set(), GarmentCategory::Top).unwrap();
        assert!(approx_eq(t.width, 190.0, 1e-3));
        assert!(approx_eq(t.height, 300.0, 1e-3));
        assert!(approx_eq(t.offset_y, -54.0, 1e-3));
        assert!(approx_eq(t.offset_x, -95.0, 1e-3));
        assert!(approx_eq(t.anchor.x, 500.0, 1e-3));
        assert!(approx_eq(t.anchor.y, 200.0, 1e-3));
        assert!(approx_eq(t.angle, 0.0, 1e-6));
    }

    #[test]
    fn test_bottom_sizing() {
        // hipSpan=80, legLength=200 → 200 x 280, 縦オフセット -42
        let t = compute(&make_set(), GarmentCategory::Bottom).unwrap();
        assert!(approx_eq(t.width, 200.0, 1e-3));
        assert!(approx_eq(t.height, 280.0, 1e-3));
        assert!(approx_eq(t.offset_y, -42.0, 1e-3));
        assert!(approx_eq(t.anchor.y, 350.0, 1e-3));
    }

    #[test]
    fn test_shorts_sizing() {
        // hipSpan=80, kneeDistance=60 → 144 x 72, 縦オフセット -7.2
        let t = compute(&make_set(), GarmentCategory::Shorts).unwrap();
        assert!(approx_eq(t.width, 144.0, 1e-3));
        assert!(approx_eq(t.height, 72.0, 1e-3));
        assert!(approx_eq(t.offset_y, -7.2, 1e-3));
    }

    #[test]
    fn test_min_height_clamp() {
        let rule = SizingRule {
            width_factor: 1.9,
            height_factor: 2.0,
            min_height: 20.0,
            lift: 0.18,
        };
        let (_, height, _) = size_rect(100.0, 1.0, &rule);
        assert!(approx_eq(height, 20.0, 1e-6));
    }

    #[test]
    fn test_bottom_falls_back_without_ankles() {
        use LandmarkIndex::*;
        let mut set = make_set();
        set.landmarks[LeftAnkle as usize].visibility = 0.2;
        set.landmarks[RightAnkle as usize].visibility = 0.2;

        // 足首が信頼できない → 肩基準サイズにフォールバック
        let t = compute(&set, GarmentCategory::Bottom).unwrap();
        assert!(approx_eq(t.width, 190.0, 1e-3));
        assert!(approx_eq(t.height, 300.0, 1e-3));
        assert!(approx_eq(t.anchor.y, 200.0, 1e-3));
    }

    #[test]
    fn test_shorts_fall_back_without_knees() {
        use LandmarkIndex::*;
        let mut set = make_set();
        set.landmarks[LeftKnee as usize].visibility = 0.0;

        let t = compute(&set, GarmentCategory::Shorts).unwrap();
        assert!(approx_eq(t.width, 190.0, 1e-3));
    }

    #[test]
    fn test_none_without_shoulders() {
        use LandmarkIndex::*;
        let mut set = make_set();
        set.landmarks[LeftShoulder as usize].visibility = 0.0;
        assert!(compute(&set, GarmentCategory::Top).is_none());
    }

    #[test]
    fn test_none_without_hips() {
        use LandmarkIndex::*;
        let mut set = make_set();
        set.landmarks[RightHip as usize].visibility = 0.1;
        assert!(compute(&set, GarmentCategory::Bottom).is_none());
    }

    #[test]
    fn test_tilted_shoulders_rotate_top() {
        use LandmarkIndex::*;
        let mut set = make_set();
        // 右肩を下げる
        set.landmarks[RightShoulder as usize] = Landmark::new(0.55, 0.3, 0.9);
        let t = compute(&set, GarmentCategory::Top).unwrap();
        assert!(t.angle > 0.0);
    }

    #[test]
    fn test_mirror_flips_anchor() {
        let set = make_set();
        let plain = compute_transform(
            &set,
            1000,
            1000,
            false,
            GarmentCategory::Top,
            &PlacementCoefficients::default(),
            0.5,
        )
        .unwrap();
        let mirrored = compute_transform(
            &set,
            1000,
            1000,
            true,
            GarmentCategory::Top,
            &PlacementCoefficients::default(),
            0.5,
        )
        .unwrap();
        assert!(approx_eq(plain.anchor.x + mirrored.anchor.x, 1000.0, 1e-3));
        assert!(approx_eq(plain.anchor.y, mirrored.anchor.y, 1e-3));
        // サイズは変わらない
        assert!(approx_eq(plain.width, mirrored.width, 1e-3));
    }
}
