use anyhow::Result;
use opencv::core::Mat;
use std::time::{Duration, Instant};

use showroom_ar::camera::ThreadedCamera;
use showroom_ar::config::Config;
use showroom_ar::overlay::{FrameThrottle, Garment, SelectedProduct, SessionState, TryOnEngine};
use showroom_ar::pose::{preprocess_for_blazepose, PoseDetector};
use showroom_ar::render::{Key, MinifbRenderer};

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Virtual Showroom Try-On ===");
    println!("Camera: index {}", config.camera.index);
    println!("Model: {}", config.detector.model_path);
    println!("Mirror: {}", if config.overlay.mirror { "ON" } else { "OFF" });
    println!();
    println!("操作: [M] ミラー切替  [R] 商品再読み込み  [D] ランドマーク表示  [Esc] 終了");
    println!();

    // セッション状態（選択中の商品 + 表示フラグ）
    let mut session = SessionState::new(config.overlay.mirror);
    session.select_garment(load_selected_garment(&config.overlay.session_path));
    if session.garment.is_none() {
        println!("商品が未選択です。カタログで選択するか {} を配置してください", config.overlay.session_path);
    }

    // カメラ起動。失敗理由はそのままユーザーへ提示する
    let mut camera = match ThreadedCamera::start(
        config.camera.index,
        Some(config.camera.width),
        Some(config.camera.height),
        Some(config.camera.fps),
    ) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };
    let (width, height) = camera.resolution();
    println!("Camera: {}x{}", width, height);

    let mut detector = PoseDetector::new(
        &config.detector.model_path,
        config.detector.presence_threshold,
    )?;
    println!("Model loaded");

    let mut engine = TryOnEngine::new(
        config.overlay.coefficients,
        config.overlay.visibility_threshold,
        config.overlay.smooth_alpha,
    );
    let mut throttle = FrameThrottle::new(config.overlay.max_fps);
    let mut renderer = MinifbRenderer::new("Virtual Showroom", width as usize, height as usize)?;
    let mut canvas = Mat::default();
    let mut show_landmarks = false;

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps as f64);
    let mut last_frame_id: u64 = 0;

    // FPS計測
    let mut frame_count = 0u32;
    let mut overlay_count = 0u32;
    let mut fps_timer = Instant::now();

    while renderer.is_open() {
        let loop_start = Instant::now();

        if renderer.is_key_pressed(Key::M) {
            session.toggle_mirror();
            println!("Mirror: {}", if session.mirror { "ON" } else { "OFF" });
        }
        if renderer.is_key_pressed(Key::R) {
            session.select_garment(load_selected_garment(&config.overlay.session_path));
        }
        if renderer.is_key_pressed(Key::D) {
            show_landmarks = !show_landmarks;
        }

        let current_frame_id = camera.frame_id();
        let is_new_frame = current_frame_id != last_frame_id;

        if is_new_frame && throttle.ready(Instant::now()) {
            last_frame_id = current_frame_id;

            match camera.get_frame() {
                None => {
                    // フレーム未到着
                    engine.advance(None, None, &session);
                }
                Some(frame) => {
                    // 検出器の1フレーム分の失敗はログして続行する
                    let landmarks = match preprocess_for_blazepose(&frame)
                        .and_then(|input| detector.detect(input))
                    {
                        Ok(set) => set,
                        Err(e) => {
                            tracing::warn!("pose detection failed for this frame: {e}");
                            None
                        }
                    };

                    // セルフィー表示はカメラフレームも左右反転する
                    let display = if session.mirror {
                        flip_horizontal(&frame)?
                    } else {
                        frame
                    };

                    let decision =
                        engine.advance(Some((width, height)), landmarks.as_ref(), &session);
                    engine.render(&decision, &display, &session, &mut canvas)?;
                    renderer.draw_frame(&canvas)?;

                    if show_landmarks {
                        if let Some(set) = &landmarks {
                            renderer.draw_landmarks(
                                set,
                                config.overlay.visibility_threshold,
                                session.mirror,
                            );
                        }
                    }

                    if matches!(decision, showroom_ar::FrameDecision::Overlay(_)) {
                        overlay_count += 1;
                    }
                    frame_count += 1;
                }
            }
        }

        renderer.update()?;

        // FPS表示（1秒に1回）
        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            println!(
                "FPS: {:.1} (overlay: {}) state: {:?}",
                frame_count as f32 / elapsed,
                overlay_count,
                engine.state()
            );
            frame_count = 0;
            overlay_count = 0;
            fps_timer = Instant::now();
        }

        // FPS上限制御（spin wait for precision）
        while loop_start.elapsed() < frame_duration {
            std::hint::spin_loop();
        }
    }

    println!("Shutting down...");
    // キャプチャスレッドを止めてカメラデバイスを解放する
    camera.stop();
    Ok(())
}

/// セッションファイルから選択中の商品を読み込む
///
/// ファイルなし・パース失敗・画像デコード失敗はいずれも「未選択」扱い。
/// レンダリングループは止めない。
fn load_selected_garment(path: &str) -> Option<Garment> {
    let content = std::fs::read_to_string(path).ok()?;

    let product: SelectedProduct = match serde_json::from_str(&content) {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!("invalid session file {path}: {e}");
            return None;
        }
    };

    match Garment::load(&product) {
        Ok(garment) => Some(garment),
        Err(e) => {
            tracing::warn!("garment image failed to load: {e}");
            println!("商品画像を読み込めませんでした: {}", product.name);
            None
        }
    }
}

fn flip_horizontal(frame: &Mat) -> Result<Mat> {
    let mut flipped = Mat::default();
    opencv::core::flip(frame, &mut flipped, 1)?;
    Ok(flipped)
}
