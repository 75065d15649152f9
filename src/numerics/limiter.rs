use serde::{Deserialize, Serialize};

/// TVD flux limiters `psi(r)` for the deferred high-order convection
/// correction. All are zero for `r <= 0` and bounded by 2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluxLimiter {
    /// No correction, plain first-order upwind.
    Upwind,
    Minmod,
    VanLeer,
    /// `max(0, min(2r, (r + 1) / 2, 2))`
    #[default]
    MonotonizedCentral,
    Superbee,
}

impl FluxLimiter {
    pub fn psi(self, r: f64) -> f64 {
        // NaN lands here too.
        if !(r > 0.0) {
            return 0.0;
        }
        match self {
            FluxLimiter::Upwind => 0.0,
            FluxLimiter::Minmod => r.min(1.0),
            FluxLimiter::VanLeer => {
                if r <= 1.0 {
                    2.0 * r / (1.0 + r)
                } else {
                    2.0 / (1.0 + 1.0 / r)
                }
            }
            FluxLimiter::MonotonizedCentral => (2.0 * r).min(0.5 * (r + 1.0)).min(2.0),
            FluxLimiter::Superbee => (2.0 * r).min(1.0).max(r.min(2.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const LIMITERS: [FluxLimiter; 4] = [
        FluxLimiter::Minmod,
        FluxLimiter::VanLeer,
        FluxLimiter::MonotonizedCentral,
        FluxLimiter::Superbee,
    ];

    fn samples() -> impl Iterator<Item = f64> {
        (-200..=400).map(|k| k as f64 * 0.05)
    }

    #[test]
    fn zero_for_non_positive_ratio() {
        for limiter in LIMITERS.into_iter().chain([FluxLimiter::Upwind]) {
            for r in [-1e9, -3.0, -0.5, 0.0, f64::NAN, f64::NEG_INFINITY] {
                assert_eq!(limiter.psi(r), 0.0, "{limiter:?} at r = {r}");
            }
        }
    }

    #[test]
    fn bounded_by_two() {
        for limiter in LIMITERS {
            for r in samples().chain([1e12, f64::INFINITY]) {
                let psi = limiter.psi(r);
                assert!((0.0..=2.0).contains(&psi), "{limiter:?}({r}) = {psi}");
            }
        }
    }

    #[test]
    fn second_order_at_unit_ratio() {
        for limiter in LIMITERS {
            assert_relative_eq!(limiter.psi(1.0), 1.0);
        }
        assert_eq!(FluxLimiter::Upwind.psi(1.0), 0.0);
    }

    #[test]
    fn symmetric_in_forward_and_backward_ratio() {
        for limiter in LIMITERS {
            for r in samples().filter(|&r| r > 0.0) {
                assert_relative_eq!(limiter.psi(r) / r, limiter.psi(1.0 / r), max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn monotonized_central_branches() {
        let mc = FluxLimiter::MonotonizedCentral;
        assert_relative_eq!(mc.psi(0.2), 0.4);
        assert_relative_eq!(mc.psi(2.0), 1.5);
        assert_relative_eq!(mc.psi(10.0), 2.0);
    }
}
