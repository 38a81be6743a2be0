use super::geometry::PixelPoint;

/// アンカー点のEMA平滑化フィルタ
///
/// フレームごとの検出ゆらぎで衣服が震えないようにする。
/// alpha=1.0 で平滑化なし、小さいほど追従が遅くなる。
pub struct PointSmoother {
    alpha: f32,
    prev: Option<PixelPoint>,
}

impl PointSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, prev: None }
    }

    pub fn apply(&mut self, point: PixelPoint) -> PixelPoint {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                // 初回はそのまま通す
                self.prev = Some(point);
                return point;
            }
        };

        let a = self.alpha;
        let smoothed = PixelPoint::new(
            a * point.x + (1.0 - a) * prev.x,
            a * point.y + (1.0 - a) * prev.y,
        );
        self.prev = Some(smoothed);
        smoothed
    }

    /// ポーズ未検出が続いた後などに履歴を破棄する
    pub fn reset(&mut self) {
        self.prev = None;
    }
}
