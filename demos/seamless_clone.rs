use std::env;

use image::DynamicImage;
use poisson_clone::{GradientPolicy, Offset, SeamlessClone};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 8 {
        eprintln!(
            "Usage: {} <source> <mask> <target> <dx> <dy> <import|mix> <output>",
            args[0]
        );
        eprintln!(
            "Example: {} plane.png plane_mask.png sky.png 120 40 import out.png",
            args[0]
        );
        std::process::exit(1);
    }

    let dx: i64 = args[4].parse().map_err(|_| "Invalid dx")?;
    let dy: i64 = args[5].parse().map_err(|_| "Invalid dy")?;
    let policy = match args[6].as_str() {
        "import" => GradientPolicy::Import,
        "mix" => GradientPolicy::MixMax,
        other => return Err(format!("Unknown policy: {other}").into()),
    };
    let output_path = &args[7];

    // 入力画像を読み込み
    let source = image::open(&args[1])?.to_rgb8();
    let mask = image::open(&args[2])?.to_rgb8();
    let target = image::open(&args[3])?.to_rgb8();

    println!(
        "Cloning {}x{} region into {}x{} target at ({}, {})",
        mask.width(),
        mask.height(),
        target.width(),
        target.height(),
        dx,
        dy
    );

    let result = target.seamless_clone(&source, &mask, Offset::new(dx, dy), policy)?;

    // 結果を保存
    DynamicImage::ImageRgb8(result).save(output_path)?;

    println!("Seamless clone ({:?}) applied successfully!", policy);
    println!("Output saved to: {}", output_path);

    Ok(())
}
