use anyhow::Result;
use opencv::{
    core::{AlgorithmHint, Mat},
    imgcodecs, imgproc,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 衣服カテゴリ
///
/// 商品レコードの category フィールドを第一に使う。名前のキーワード推定は
/// category を持たない旧レコードのためのフォールバック。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentCategory {
    Top,
    Bottom,
    Shorts,
}

/// 下半身と判定する商品名キーワード
const BOTTOM_KEYWORDS: [&str; 5] = ["trouser", "pant", "jean", "skirt", "legging"];

impl GarmentCategory {
    /// 商品レコードの category 文字列をパースする
    pub fn parse(category: &str) -> Option<Self> {
        match category.to_lowercase().as_str() {
            "top" | "tops" => Some(Self::Top),
            "bottom" | "bottoms" => Some(Self::Bottom),
            "short" | "shorts" => Some(Self::Shorts),
            _ => None,
        }
    }

    /// 商品名からのキーワード推定（フォールバック）
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("short") {
            return Self::Shorts;
        }
        if BOTTOM_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Self::Bottom;
        }
        Self::Top
    }

    /// category優先、なければ名前から推定
    pub fn resolve(category: Option<&str>, name: &str) -> Self {
        category
            .and_then(Self::parse)
            .unwrap_or_else(|| Self::from_name(name))
    }

    /// 腰アンカーを使うカテゴリか
    pub fn is_lower_body(&self) -> bool {
        matches!(self, Self::Bottom | Self::Shorts)
    }
}

/// クライアント側セッションに保持される選択中商品レコード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// 画像の参照（ローカルパスまたは取得済みファイル）
    pub image: String,
    #[serde(default)]
    pub price: Option<f64>,
}

/// 試着対象の衣服：デコード済み画像 + カテゴリ
pub struct Garment {
    pub name: String,
    pub category: GarmentCategory,
    /// BGRA画像
    pub image: Mat,
}

impl Garment {
    /// 商品レコードから衣服を読み込む
    ///
    /// 画像のデコード失敗は致命的ではない。呼び出し側は「衣服未選択」として
    /// 扱い、レンダリングループを止めない。
    pub fn load(product: &SelectedProduct) -> Result<Self> {
        let image = load_rgba_image(&product.image)?;
        let category = GarmentCategory::resolve(product.category.as_deref(), &product.name);
        Ok(Self {
            name: product.name.clone(),
            category,
            image,
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.image.cols(), self.image.rows())
    }
}

/// 画像ファイルをBGRAで読み込む。アルファなし画像はBGRAに変換する。
fn load_rgba_image<P: AsRef<Path>>(path: P) -> Result<Mat> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid image path"))?;
    let loaded = imgcodecs::imread(path_str, imgcodecs::IMREAD_UNCHANGED)?;
    if loaded.empty() {
        anyhow::bail!("Failed to decode garment image: {path_str}");
    }

    match loaded.channels() {
        4 => Ok(loaded),
        3 => {
            let mut bgra = Mat::default();
            imgproc::cvt_color(
                &loaded,
                &mut bgra,
                imgproc::COLOR_BGR2BGRA,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            Ok(bgra)
        }
        c => anyhow::bail!("Unsupported channel count {c} in {path_str}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_jeans_as_bottom() {
        assert_eq!(GarmentCategory::from_name("Blue Jeans"), GarmentCategory::Bottom);
    }

    #[test]
    fn test_classify_shorts() {
        assert_eq!(GarmentCategory::from_name("Red Shorts"), GarmentCategory::Shorts);
    }

    #[test]
    fn test_classify_tshirt_as_top() {
        assert_eq!(
            GarmentCategory::from_name("White T-Shirt"),
            GarmentCategory::Top
        );
    }

    #[test]
    fn test_classify_other_bottom_keywords() {
        assert_eq!(GarmentCategory::from_name("Cargo Pants"), GarmentCategory::Bottom);
        assert_eq!(
            GarmentCategory::from_name("Pleated Skirt"),
            GarmentCategory::Bottom
        );
        assert_eq!(GarmentCategory::from_name("Yoga Leggings"), GarmentCategory::Bottom);
        assert_eq!(GarmentCategory::from_name("Wool Trousers"), GarmentCategory::Bottom);
    }

    #[test]
    fn test_category_field_wins_over_name() {
        // 構造化カテゴリが名前推定より優先される
        let resolved = GarmentCategory::resolve(Some("top"), "Comfy Shorts");
        assert_eq!(resolved, GarmentCategory::Top);
    }

    #[test]
    fn test_unknown_category_falls_back_to_name() {
        let resolved = GarmentCategory::resolve(Some("apparel"), "Denim Jeans");
        assert_eq!(resolved, GarmentCategory::Bottom);
    }

    #[test]
    fn test_is_lower_body() {
        assert!(!GarmentCategory::Top.is_lower_body());
        assert!(GarmentCategory::Bottom.is_lower_body());
        assert!(GarmentCategory::Shorts.is_lower_body());
    }

    #[test]
    fn test_selected_product_json() {
        let json = r#"{"name": "Blue Jeans", "image": "jeans.png", "price": 49.9}"#;
        let product: SelectedProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product.name, "Blue Jeans");
        assert!(product.category.is_none());
        assert_eq!(product.price, Some(49.9));
    }
}
