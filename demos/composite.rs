//! Composite a cutout over a background.
//!
//! Usage:
//! ```sh
//! cargo run --example composite -- cutout.png "linear-gradient(to right, #2193b0, #6dd5ed)" out.png
//! ```

use std::env;
use std::process;

use bgswap::{composite, BackgroundSpec, Cutout};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <cutout> <background> <output>", args[0]);
        process::exit(1);
    }

    let cutout = match image::open(&args[1]) {
        Ok(img) => Cutout::new(img.to_rgba8()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let background: BackgroundSpec = match args[2].parse() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    match composite(&cutout, &background) {
        Ok(result) => {
            let (w, h) = result.dimensions();
            if let Err(e) = bgswap::save_image(&result.into_pixels(), args[3].as_ref()) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            println!("Done: {w}x{h} over {background}");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
