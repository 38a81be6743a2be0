use crate::pose::Landmark;

/// キャンバス描画空間上のピクセル座標
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 正規化ランドマークをピクセル座標へ射影する
///
/// mirror時は px = (1 - x) * W。エラー条件なしの純関数。
pub fn project(landmark: &Landmark, width: u32, height: u32, mirror: bool) -> PixelPoint {
    let (x, y) = if mirror {
        landmark.to_pixel_mirrored(width, height)
    } else {
        landmark.to_pixel(width, height)
    };
    PixelPoint::new(x, y)
}

/// 左右ペアの中点
pub fn pair_center(a: PixelPoint, b: PixelPoint) -> PixelPoint {
    PixelPoint::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// 左右ペア間のユークリッド距離
pub fn span_width(a: PixelPoint, b: PixelPoint) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// 上側中点と下側中点のY差の絶対値
pub fn vertical_extent(upper: PixelPoint, lower: PixelPoint) -> f32 {
    (lower.y - upper.y).abs()
}

/// 左→右ベクトルの傾き（ラジアン）
///
/// 体の傾きに追従させる回転角。肩ペア（トップス）または腰ペア（ボトムス）に適用する。
pub fn pair_angle(left: PixelPoint, right: PixelPoint) -> f32 {
    f32::atan2(right.y - left.y, right.x - left.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_project_without_mirror() {
        let lm = Landmark::new(0.25, 0.5, 1.0);
        let p = project(&lm, 640, 480, false);
        assert!(approx_eq(p.x, 160.0, 1e-6));
        assert!(approx_eq(p.y, 240.0, 1e-6));
    }

    #[test]
    fn test_project_with_mirror() {
        let lm = Landmark::new(0.25, 0.5, 1.0);
        let p = project(&lm, 640, 480, true);
        assert!(approx_eq(p.x, 480.0, 1e-6));
        assert!(approx_eq(p.y, 240.0, 1e-6));
    }

    #[test]
    fn test_pair_center() {
        let c = pair_center(PixelPoint::new(100.0, 200.0), PixelPoint::new(300.0, 400.0));
        assert!(approx_eq(c.x, 200.0, 1e-6));
        assert!(approx_eq(c.y, 300.0, 1e-6));
    }

    #[test]
    fn test_span_width() {
        let w = span_width(PixelPoint::new(0.0, 0.0), PixelPoint::new(3.0, 4.0));
        assert!(approx_eq(w, 5.0, 1e-6));
    }

    #[test]
    fn test_span_width_symmetric() {
        let a = PixelPoint::new(12.0, 34.0);
        let b = PixelPoint::new(56.0, 78.0);
        assert!(approx_eq(span_width(a, b), span_width(b, a), 1e-6));
    }

    #[test]
    fn test_vertical_extent() {
        let upper = PixelPoint::new(0.0, 100.0);
        let lower = PixelPoint::new(50.0, 250.0);
        assert!(approx_eq(vertical_extent(upper, lower), 150.0, 1e-6));
        // 符号によらず絶対値
        assert!(approx_eq(vertical_extent(lower, upper), 150.0, 1e-6));
    }

    #[test]
    fn test_pair_angle_level() {
        // 水平な左右ペア → 回転なし
        let angle = pair_angle(PixelPoint::new(100.0, 50.0), PixelPoint::new(200.0, 50.0));
        assert!(approx_eq(angle, 0.0, 1e-6));
    }

    #[test]
    fn test_pair_angle_tilted() {
        // 右側が下がっている → 正の回転
        let angle = pair_angle(PixelPoint::new(0.0, 0.0), PixelPoint::new(100.0, 100.0));
        assert!(approx_eq(angle, std::f32::consts::FRAC_PI_4, 1e-6));
    }
}
