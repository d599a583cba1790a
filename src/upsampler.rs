use crate::image::Plane;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpsamplingMethod {
    /// Each sample is repeated over the pixels it covers.
    #[default]
    Replicate,
    /// Samples are treated as pixel centres and interpolated linearly in both directions.
    Bilinear,
}

/// Scales a component plane up by whole factors.
///
/// Only the top-left `valid_width` by `valid_height` samples carry image content. Bilinear
/// interpolation clamps to that region instead of blending in block padding.
pub(crate) fn upsample(
    plane: &Plane,
    valid_width: usize,
    valid_height: usize,
    h_ratio: usize,
    v_ratio: usize,
    method: UpsamplingMethod,
) -> Plane {
    if h_ratio == 1 && v_ratio == 1 {
        return plane.clone();
    }

    let mut out = Plane::new(plane.width * h_ratio, plane.height * v_ratio);

    match method {
        UpsamplingMethod::Replicate => {
            for y in 0..out.height {
                let source = plane.row(y / v_ratio);
                let row = &mut out.samples[y * out.width..(y + 1) * out.width];
                for (x, sample) in row.iter_mut().enumerate() {
                    *sample = source[x / h_ratio];
                }
            }
        }
        UpsamplingMethod::Bilinear => {
            let max_x = valid_width.clamp(1, plane.width) - 1;
            let max_y = valid_height.clamp(1, plane.height) - 1;

            let xs: Vec<(usize, usize, f32)> = (0..out.width)
                .map(|x| source_position(x, h_ratio, max_x))
                .collect();

            for y in 0..out.height {
                let (y0, y1, fy) = source_position(y, v_ratio, max_y);
                let (top, bottom) = (plane.row(y0), plane.row(y1));

                for (x, &(x0, x1, fx)) in xs.iter().enumerate() {
                    let upper = top[x0] as f32 * (1.0 - fx) + top[x1] as f32 * fx;
                    let lower = bottom[x0] as f32 * (1.0 - fx) + bottom[x1] as f32 * fx;
                    let value = upper * (1.0 - fy) + lower * fy;
                    out.samples[y * out.width + x] = value.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    out
}

/// The two source samples bracketing output position `i`, and the weight of the second.
fn source_position(i: usize, ratio: usize, max: usize) -> (usize, usize, f32) {
    let centre = (i as f32 + 0.5) / ratio as f32 - 0.5;
    let clamped = centre.clamp(0.0, max as f32);
    let lower = clamped.floor() as usize;
    let upper = (lower + 1).min(max);

    (lower, upper, clamped - lower as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn plane(width: usize, height: usize, samples: Vec<u8>) -> Plane {
        Plane {
            width,
            height,
            samples,
        }
    }

    #[test]
    fn test_replicate() -> Result<()> {
        let source = plane(2, 1, vec![10, 20]);
        let out = upsample(&source, 2, 1, 2, 2, UpsamplingMethod::Replicate);

        assert_eq!((out.width(), out.height()), (4, 2));
        assert_eq!(out.samples(), &[10, 10, 20, 20, 10, 10, 20, 20]);

        Ok(())
    }

    #[test]
    fn test_bilinear_triangle_weights() -> Result<()> {
        let source = plane(2, 1, vec![0, 100]);
        let out = upsample(&source, 2, 1, 2, 1, UpsamplingMethod::Bilinear);

        // 3/4 of the nearer sample, 1/4 of the farther one, clamped at the edges
        assert_eq!(out.samples(), &[0, 25, 75, 100]);

        Ok(())
    }

    #[test]
    fn test_bilinear_ignores_padding() -> Result<()> {
        let source = plane(4, 1, vec![50, 50, 255, 255]);
        let out = upsample(&source, 2, 1, 2, 1, UpsamplingMethod::Bilinear);

        assert_eq!(&out.samples()[..4], &[50, 50, 50, 50]);

        Ok(())
    }

    #[test]
    fn test_constant_planes_stay_constant() -> Result<()> {
        let source = plane(8, 8, vec![77; 64]);

        for method in [UpsamplingMethod::Replicate, UpsamplingMethod::Bilinear] {
            for (h, v) in [(1, 1), (2, 1), (2, 2), (4, 1), (3, 3)] {
                let out = upsample(&source, 8, 8, h, v, method);
                assert_eq!((out.width(), out.height()), (8 * h, 8 * v));
                assert!(out.samples().iter().all(|&s| s == 77));
            }
        }

        Ok(())
    }
}
