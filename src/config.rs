use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::overlay::placement::PlacementCoefficients;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// メインループの上限FPS
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラデバイス番号
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// ポーズ存在スコアの閾値。これ未満のフレームは「検出なし」扱い
    #[serde(default = "default_presence_threshold")]
    pub presence_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    /// セルフィー表示（左右反転）
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    /// オーバーレイ処理の上限FPS。超過フレームはドロップ
    #[serde(default = "default_overlay_fps")]
    pub max_fps: u32,
    /// アンカー点EMA平滑化係数 (0.0-1.0、1.0で平滑化なし)
    #[serde(default = "default_smooth_alpha")]
    pub smooth_alpha: f32,
    /// ランドマーク可視度の閾値。下回ると肩基準サイズにフォールバック
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// 選択中商品を保持するセッションファイル
    #[serde(default = "default_session_path")]
    pub session_path: String,
    /// カテゴリ別のサイズ決定係数
    #[serde(default)]
    pub coefficients: PlacementCoefficients,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// CORSで許可するフロントエンドのオリジン
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_target_fps() -> u32 { 60 }
fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_camera_fps() -> u32 { 30 }
fn default_model_path() -> String { "models/blazepose_full.onnx".to_string() }
fn default_presence_threshold() -> f32 { 0.5 }
fn default_mirror() -> bool { true }
fn default_overlay_fps() -> u32 { 15 }
fn default_smooth_alpha() -> f32 { 0.2 }
fn default_visibility_threshold() -> f32 { 0.5 }
fn default_session_path() -> String { "session.json".to_string() }
fn default_server_port() -> u16 { 5000 }
fn default_bind_addr() -> String { "0.0.0.0".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self { target_fps: default_target_fps() }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            presence_threshold: default_presence_threshold(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            mirror: default_mirror(),
            max_fps: default_overlay_fps(),
            smooth_alpha: default_smooth_alpha(),
            visibility_threshold: default_visibility_threshold(),
            session_path: default_session_path(),
            coefficients: PlacementCoefficients::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind_addr: default_bind_addr(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルトで起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(_) => {
                tracing::warn!(
                    "config {} not found, using defaults",
                    path.as_ref().display()
                );
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.overlay.max_fps, 15);
        assert!((config.overlay.visibility_threshold - 0.5).abs() < 1e-6);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
            [camera]
            index = 2

            [server]
            port = 8080
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.server.port, 8080);
        // 省略したセクションはデフォルト
        assert_eq!(config.camera.width, 640);
        assert!(config.overlay.mirror);
    }

    #[test]
    fn test_overlay_section() {
        let toml = r#"
            [overlay]
            mirror = false
            max_fps = 30
            smooth_alpha = 0.5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.overlay.mirror);
        assert_eq!(config.overlay.max_fps, 30);
        assert!((config.overlay.smooth_alpha - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_coefficient_override() {
        let toml = r#"
            [overlay.coefficients.top]
            width_factor = 2.2
            height_factor = 2.0
            min_height = 10.0
            lift = 0.2
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!((config.overlay.coefficients.top.width_factor - 2.2).abs() < 1e-6);
        // 他カテゴリはデフォルトのまま
        assert!((config.overlay.coefficients.bottom.width_factor - 2.5).abs() < 1e-6);
    }
}
