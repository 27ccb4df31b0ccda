//! Premultiplied RGBA8 pixel math for the raster host.

use crate::error::{GradientError, GradientResult};

pub type PremulRgba8 = [u8; 4];

pub fn premultiply([r, g, b, a]: [u8; 4]) -> PremulRgba8 {
    let a16 = u16::from(a);
    [
        mul_div255(u16::from(r), a16),
        mul_div255(u16::from(g), a16),
        mul_div255(u16::from(b), a16),
        a,
    ]
}

/// Straight alpha again; fully transparent pixels come back as zero.
pub fn unpremultiply([r, g, b, a]: PremulRgba8) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let un = |c: u8| -> u8 {
        let v = (u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a);
        v.min(255) as u8
    };
    [un(r), un(g), un(b), a]
}

/// Source-over with an extra `coverage` factor (layer opacity times mask).
pub fn over(dst: PremulRgba8, src: PremulRgba8, coverage: f32) -> PremulRgba8 {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 || src[3] == 0 {
        return dst;
    }

    let k = ((coverage * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), k);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), k);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composites a whole premultiplied buffer, optionally shaped by an 8-bit mask
/// of one byte per pixel.
pub fn layer_over_in_place(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
    mask: Option<&[u8]>,
) -> GradientResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(GradientError::config(
            "layer_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    if let Some(mask) = mask
        && mask.len() * 4 != dst.len()
    {
        return Err(GradientError::config(
            "layer_over_in_place mask must have one byte per pixel",
        ));
    }

    for (i, (d, s)) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)).enumerate() {
        let m = mask.map_or(1.0, |m| f32::from(m[i]) / 255.0);
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity * m);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
