//! Alpha blending math for compositing.
//!
//! Cutouts are laid over their background with Porter-Duff "source-over":
//! `out.a = fg.a + bg.a * (1 - fg.a)` and
//! `out.rgb = (fg.rgb * fg.a + bg.rgb * bg.a * (1 - fg.a)) / out.a`.
//!
//! For an opaque background this reduces to
//! `out.rgb = fg.rgb * fg.a + bg.rgb * (1 - fg.a)` with `out.a = 1`.

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Blend one straight-alpha pixel over another.
///
/// Channel results are rounded to nearest.
#[must_use]
pub fn blend_pixel(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    match (fg[3], bg[3]) {
        (255, _) | (_, 0) => return fg,
        (0, _) => return bg,
        _ => {}
    }

    let fa = f32::from(fg[3]) / 255.0;
    let ba = f32::from(bg[3]) / 255.0;
    let out_a = fa + ba * (1.0 - fa);

    let mut out = [0u8; 4];
    for (ch, slot) in out.iter_mut().enumerate().take(3) {
        let v = (f32::from(fg[ch]) * fa + f32::from(bg[ch]) * ba * (1.0 - fa)) / out_a;
        *slot = to_u8(v);
    }
    out[3] = to_u8(out_a * 255.0);
    Rgba(out)
}

/// Source-over blend `fg` onto `base` in place.
///
/// Pixels are processed in parallel when the `cli` feature (and with it rayon)
/// is enabled. Each pixel depends only on its own inputs, so the result is
/// identical either way.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the rasters differ in size.
pub fn composite_over(base: &mut RgbaImage, fg: &RgbaImage) -> Result<()> {
    if base.dimensions() != fg.dimensions() {
        return Err(Error::DimensionMismatch {
            expected_width: base.width(),
            expected_height: base.height(),
            width: fg.width(),
            height: fg.height(),
        });
    }

    let blend_chunk = |(dst, src): (&mut [u8], &[u8])| {
        let out = blend_pixel(
            Rgba([src[0], src[1], src[2], src[3]]),
            Rgba([dst[0], dst[1], dst[2], dst[3]]),
        );
        dst.copy_from_slice(&out.0);
    };

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        base.par_chunks_mut(4)
            .zip(fg.par_chunks(4))
            .for_each(blend_chunk);
    }

    #[cfg(not(feature = "cli"))]
    {
        base.chunks_mut(4).zip(fg.chunks(4)).for_each(blend_chunk);
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
