use showroom_ar::camera::{CameraError, OpenCvCamera};

fn main() {
    println!("=== カメラプローブ ===");
    println!();

    let mut found = 0;
    for index in 0..5 {
        print!("index {}: ", index);
        match OpenCvCamera::open(index) {
            Ok(camera) => {
                let (w, h) = camera.resolution();
                println!("{}x{}", w, h);
                found += 1;
            }
            Err(CameraError::NotFound(_)) => {
                println!("not available");
                break;
            }
            Err(e) => {
                // 権限なし・使用中などは理由を表示して次を試す
                println!("{}", e.user_message());
            }
        }
    }

    println!();
    if found == 0 {
        println!("{}", CameraError::NotFound(0).user_message());
    } else {
        println!("usable cameras: {}", found);
    }
}
