use anyhow::Result;
use opencv::{
    core::{Mat, Point, Scalar, Size, Vec3b, Vec4b, BORDER_CONSTANT},
    imgproc,
    prelude::*,
};

use crate::overlay::placement::Transform;

/// 衣服画像をキャンバスへ合成する
///
/// 描画面をアンカー点へ平行移動し、angleだけ回転した座標系で
/// 軸平行の矩形として衣服を描く。体の傾きに追従する。
pub fn composite_garment(canvas: &mut Mat, garment: &Mat, transform: &Transform) -> Result<()> {
    let garment_width = garment.cols() as f64;
    let garment_height = garment.rows() as f64;
    if garment_width <= 0.0 || garment_height <= 0.0 {
        anyhow::bail!("Empty garment image");
    }

    // 画像座標 → 回転座標系の矩形 → キャンバス のアフィン合成
    // p_canvas = anchor + R(angle) * (offset + S * p_image)
    let sx = transform.width as f64 / garment_width;
    let sy = transform.height as f64 / garment_height;
    let (sin, cos) = (transform.angle as f64).sin_cos();
    let (ox, oy) = (transform.offset_x as f64, transform.offset_y as f64);
    let (ax, ay) = (transform.anchor.x as f64, transform.anchor.y as f64);

    let m = Mat::from_slice_2d(&[
        [cos * sx, -sin * sy, ax + cos * ox - sin * oy],
        [sin * sx, cos * sy, ay + sin * ox + cos * oy],
    ])?;

    // キャンバスサイズのBGRAレイヤへワープしてからアルファ合成
    let mut layer = Mat::default();
    imgproc::warp_affine(
        garment,
        &mut layer,
        &m,
        Size::new(canvas.cols(), canvas.rows()),
        imgproc::INTER_LINEAR,
        BORDER_CONSTANT,
        Scalar::new(0.0, 0.0, 0.0, 0.0),
    )?;

    alpha_blend(canvas, &layer)
}

/// BGRAレイヤをBGRキャンバスへアルファ合成する
fn alpha_blend(canvas: &mut Mat, layer: &Mat) -> Result<()> {
    for y in 0..canvas.rows() {
        for x in 0..canvas.cols() {
            let src = layer.at_2d::<Vec4b>(y, x)?;
            let alpha = src[3] as f32 / 255.0;
            if alpha <= 0.0 {
                continue;
            }

            let dst = canvas.at_2d_mut::<Vec3b>(y, x)?;
            for c in 0..3 {
                let blended = alpha * src[c] as f32 + (1.0 - alpha) * dst[c] as f32;
                dst[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(())
}

const FONT_FACE: i32 = imgproc::FONT_HERSHEY_SIMPLEX;
const FONT_SCALE: f64 = 0.8;
const FONT_THICKNESS: i32 = 2;
const LINE_SPACING: i32 = 34;
const TOP_MARGIN: i32 = 50;

/// 案内テキストをキャンバス上部に中央揃えで描く
pub fn draw_instructions(canvas: &mut Mat, lines: &[&str]) -> Result<()> {
    let canvas_width = canvas.cols();
    let mut y = TOP_MARGIN;

    for line in lines {
        let mut baseline = 0;
        let text_size =
            imgproc::get_text_size(line, FONT_FACE, FONT_SCALE, FONT_THICKNESS, &mut baseline)?;
        let x = (canvas_width - text_size.width) / 2;

        // 黒縁取り + 白文字で背景によらず読めるようにする
        imgproc::put_text(
            canvas,
            line,
            Point::new(x, y),
            FONT_FACE,
            FONT_SCALE,
            Scalar::new(0.0, 0.0, 0.0, 0.0),
            FONT_THICKNESS + 2,
            imgproc::LINE_AA,
            false,
        )?;
        imgproc::put_text(
            canvas,
            line,
            Point::new(x, y),
            FONT_FACE,
            FONT_SCALE,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
            FONT_THICKNESS,
            imgproc::LINE_AA,
            false,
        )?;

        y += LINE_SPACING;
    }

    Ok(())
}
