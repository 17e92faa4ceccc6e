//! Slider animation
//!
//! Preset application and reset move sliders over a fixed number of eased
//! ticks instead of jumping.

/// Ease-in-out cubic on `t` in `[0, 1]`
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Intermediate slider values from `from` to `to` over `steps` ticks
///
/// The last value is exactly `to`. Zero steps yields just the target.
pub fn slider_steps(from: f64, to: f64, steps: usize) -> Vec<f64> {
    if steps == 0 {
        return vec![to];
    }
    let delta = to - from;
    (1..=steps)
        .map(|step| {
            if step == steps {
                to
            } else {
                from + delta * ease_in_out_cubic(step as f64 / steps as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_easing_endpoints_and_symmetry() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert_abs_diff_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_abs_diff_eq!(
            ease_in_out_cubic(0.25) + ease_in_out_cubic(0.75),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_steps_land_on_target() {
        let steps = slider_steps(0.0, 19.0, 15);
        assert_eq!(steps.len(), 15);
        assert_eq!(*steps.last().unwrap(), 19.0);
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));

        let down = slider_steps(12.0, 0.0, 15);
        assert_eq!(*down.last().unwrap(), 0.0);
        assert!(down.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_zero_steps() {
        assert_eq!(slider_steps(3.0, -3.0, 0), vec![-3.0]);
    }
}
