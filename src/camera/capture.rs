use anyhow::Result;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoCaptureTrait},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

/// カメラ取得失敗の分類
///
/// プラットフォームの理由コードをユーザー向けメッセージに対応付ける。
/// 「権限なし」と「デバイスなし」は必ず区別して提示する。
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("No camera device found (index {0})")]
    NotFound(i32),
    #[error("Camera access was denied. Check OS camera permissions")]
    PermissionDenied,
    #[error("Camera {0} is busy. Close other applications using it")]
    Busy(i32),
    #[error("Camera error: {0}")]
    Other(String),
}

impl CameraError {
    /// ユーザーにそのまま表示できるメッセージ
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// OpenCVのオープン失敗を理由コードへ分類する
    ///
    /// OpenCVは詳細コードを返さないため、エラーメッセージ文字列で判定する。
    /// 判定できないものは Other として全文を残す。
    fn classify(index: i32, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") {
            CameraError::PermissionDenied
        } else if lower.contains("busy") || lower.contains("in use") {
            CameraError::Busy(index)
        } else if lower.contains("not found") || lower.contains("no device") {
            CameraError::NotFound(index)
        } else {
            CameraError::Other(message.to_string())
        }
    }
}

/// OpenCVを使用したカメラキャプチャ
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    /// カメラを開く（デフォルトカメラ: index 0）
    pub fn open(index: i32) -> Result<Self, CameraError> {
        Self::open_with_config(index, None, None, None)
    }

    /// 解像度とFPSを指定してカメラを開く
    pub fn open_with_config(
        index: i32,
        width: Option<u32>,
        height: Option<u32>,
        fps: Option<u32>,
    ) -> Result<Self, CameraError> {
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .map_err(|e| CameraError::classify(index, &e.to_string()))?;

        let opened = capture
            .is_opened()
            .map_err(|e| CameraError::Other(e.to_string()))?;
        if !opened {
            return Err(CameraError::NotFound(index));
        }

        let set = |capture: &mut VideoCapture, prop: i32, value: f64| -> Result<(), CameraError> {
            capture
                .set(prop, value)
                .map(|_| ())
                .map_err(|e| CameraError::Other(e.to_string()))
        };

        // 解像度を設定
        if let Some(w) = width {
            set(&mut capture, videoio::CAP_PROP_FRAME_WIDTH, w as f64)?;
        }
        if let Some(h) = height {
            set(&mut capture, videoio::CAP_PROP_FRAME_HEIGHT, h as f64)?;
        }
        if let Some(f) = fps {
            set(&mut capture, videoio::CAP_PROP_FPS, f as f64)?;
        }
        set(&mut capture, videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(|e| CameraError::Other(e.to_string()))? as u32;
        let actual_height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(|e| CameraError::Other(e.to_string()))? as u32;

        Ok(Self {
            capture,
            width: actual_width,
            height: actual_height,
        })
    }

    /// 解像度を取得
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式）
    pub fn read_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        self.capture.read(&mut frame)?;

        if frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        Ok(frame)
    }

    /// デバイスを明示的に解放する
    pub fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}

/// 別スレッドでカメラキャプチャを行い、最新フレームを提供する
///
/// フレームは1枠メールボックス（最新1枚のみ保持）。消費側はframe_idの
/// 比較で未処理フレームを判定し、追いつけない分はドロップする。
/// オーバーレイ計算が同一フレームに対して並行実行されることはない。
pub struct ThreadedCamera {
    latest: Arc<Mutex<Option<Mat>>>,
    frame_id: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadedCamera {
    pub fn start(
        index: i32,
        width: Option<u32>,
        height: Option<u32>,
        fps: Option<u32>,
    ) -> Result<Self, CameraError> {
        let mut camera = OpenCvCamera::open_with_config(index, width, height, fps)?;
        let (w, h) = camera.resolution();
        let latest = Arc::new(Mutex::new(None::<Mat>));
        let latest_ref = latest.clone();
        let frame_id = Arc::new(AtomicU64::new(0));
        let frame_id_ref = frame_id.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_ref = running.clone();

        let handle = thread::spawn(move || {
            while running_ref.load(Ordering::Acquire) {
                match camera.read_frame() {
                    Ok(frame) => {
                        *latest_ref.lock().unwrap() = Some(frame);
                        frame_id_ref.fetch_add(1, Ordering::Release);
                    }
                    Err(e) => {
                        tracing::warn!("camera read failed: {e}");
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                }
            }
            // セッション終了時にデバイスロックを解放する
            if let Err(e) = camera.release() {
                tracing::warn!("camera release failed: {e}");
            }
        });

        Ok(Self {
            latest,
            frame_id,
            running,
            width: w,
            height: h,
            handle: Some(handle),
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 現在のフレームIDを取得。新フレームが到着するたびにインクリメントされる。
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// 最新フレームを取得。フレームは保持されるので何度でも取得可能。
    /// カメラスレッドが新フレームを書き込むまで同じフレームが返る。
    /// 初回フレーム到着前のみNone。
    pub fn get_frame(&self) -> Option<Mat> {
        let guard = self.latest.lock().unwrap();
        guard.as_ref().map(|m| m.clone())
    }

    /// キャプチャを停止してデバイスを解放する
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadedCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
