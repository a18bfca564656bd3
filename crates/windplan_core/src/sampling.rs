//! Distribution sampling layer.
//!
//! A resolved settings object describes stochastic inputs as
//! [`DistributionSpec`] values (a kind plus named parameters). The kernel
//! turns each spec into a [`Distribution`] once and draws one sample per
//! call from the run's seeded stream.
//!
//! Missing parameters are defaulted; values are deliberately not
//! range-validated here. Out-of-range values surface as
//! [`SamplingError::InvalidParameters`] when the underlying `rand_distr`
//! constructor rejects them.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use crate::error::SamplingError;

/// Spectral frequency window for the turbulence correction, in Hz
const KAIMAL_FREQ_MIN: f64 = 1e-3;
const KAIMAL_FREQ_MAX: f64 = 1.0;

/// A distribution as it appears in the resolved settings object:
/// a kind name plus whatever parameters the editor supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub kind: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl DistributionSpec {
    pub fn new(kind: impl Into<String>, parameters: &[(&str, f64)]) -> Self {
        Self {
            kind: kind.into(),
            parameters: parameters
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }

    /// A degenerate distribution that always yields `value`
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self::new("fixed", &[("value", value)])
    }

    #[must_use]
    pub fn normal(mean: f64, std_dev: f64) -> Self {
        Self::new("normal", &[("mean", mean), ("std", std_dev)])
    }

    #[must_use]
    pub fn triangular(min: f64, mode: f64, max: f64) -> Self {
        Self::new("triangular", &[("min", min), ("mode", mode), ("max", max)])
    }

    fn param(&self, name: &str, default: f64) -> f64 {
        self.parameters.get(name).copied().unwrap_or(default)
    }
}

/// The closed set of sampling generators the kernel implements.
///
/// General-purpose kinds map directly onto `rand_distr`; `Kaimal` and `Gbm`
/// are composite generators for turbulence-corrected wind speed and
/// year-conditioned stochastic multiplicative growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Distribution {
    Fixed(f64),
    Normal {
        mean: f64,
        std_dev: f64,
    },
    LogNormal {
        mean: f64,
        sigma: f64,
    },
    Triangular {
        min: f64,
        mode: f64,
        max: f64,
    },
    Uniform {
        min: f64,
        max: f64,
    },
    Weibull {
        scale: f64,
        shape: f64,
    },
    Exponential {
        lambda: f64,
    },
    Poisson {
        lambda: f64,
    },
    /// Turbulence-corrected wind speed (IEC Kaimal spectrum)
    Kaimal {
        mean_wind_speed: f64,
        turbulence_intensity: f64,
        roughness_length: f64,
        scale: f64,
        hub_height: f64,
    },
    /// Geometric Brownian motion conditioned on an evaluation year
    Gbm {
        initial_value: f64,
        drift: f64,
        volatility: f64,
        time_step: f64,
        current_year: usize,
    },
}

impl Distribution {
    /// Build a generator from a settings-level spec.
    ///
    /// Unknown kinds fail with [`SamplingError::UnsupportedKind`]; missing
    /// parameters take documented defaults.
    pub fn from_spec(spec: &DistributionSpec) -> Result<Self, SamplingError> {
        match spec.kind.as_str() {
            "fixed" => Ok(Distribution::Fixed(spec.param("value", 0.0))),
            "normal" => Ok(Distribution::Normal {
                mean: spec.param("mean", 0.0),
                std_dev: spec.param("std", 1.0),
            }),
            "lognormal" => Ok(Distribution::LogNormal {
                mean: spec.param("mean", 0.0),
                sigma: spec.param("sigma", 1.0),
            }),
            "triangular" => Ok(Distribution::Triangular {
                min: spec.param("min", 0.0),
                mode: spec.param("mode", 0.5),
                max: spec.param("max", 1.0),
            }),
            "uniform" => Ok(Distribution::Uniform {
                min: spec.param("min", 0.0),
                max: spec.param("max", 1.0),
            }),
            "weibull" => Ok(Distribution::Weibull {
                scale: spec.param("scale", 1.0),
                shape: spec.param("shape", 2.0),
            }),
            "exponential" => Ok(Distribution::Exponential {
                lambda: spec.param("lambda", 1.0),
            }),
            "poisson" => Ok(Distribution::Poisson {
                lambda: spec.param("lambda", 1.0),
            }),
            "kaimal" => Ok(Distribution::Kaimal {
                mean_wind_speed: spec.param("meanWindSpeed", 8.0),
                turbulence_intensity: spec.param("turbulenceIntensity", 0.0),
                roughness_length: spec.param("roughnessLength", 0.03),
                scale: spec.param("scale", 8.1),
                hub_height: spec.param("hubHeight", 80.0),
            }),
            "gbm" => Ok(Distribution::Gbm {
                initial_value: spec.param("initialValue", 1.0),
                drift: spec.param("drift", 0.0),
                volatility: spec.param("volatility", 0.0),
                time_step: spec.param("timeStep", 1.0),
                current_year: spec.param("currentYear", 1.0).max(1.0) as usize,
            }),
            other => Err(SamplingError::UnsupportedKind(other.to_string())),
        }
    }

    /// Condition this generator on a project year.
    ///
    /// Identity for everything except `Gbm`, which re-pins the evaluation
    /// year so prices advance along the expected path before the stochastic
    /// step.
    #[must_use]
    pub fn at_year(&self, year: usize) -> Distribution {
        match self {
            Distribution::Gbm {
                initial_value,
                drift,
                volatility,
                time_step,
                ..
            } => Distribution::Gbm {
                initial_value: *initial_value,
                drift: *drift,
                volatility: *volatility,
                time_step: *time_step,
                current_year: year.max(1),
            },
            other => other.clone(),
        }
    }

    /// Draw one sample from the given stream
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, SamplingError> {
        match self {
            Distribution::Fixed(value) => Ok(*value),
            Distribution::Normal { mean, std_dev } => rand_distr::Normal::new(*mean, *std_dev)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "normal",
                    reason: "std must be non-negative and finite",
                }),
            Distribution::LogNormal { mean, sigma } => rand_distr::LogNormal::new(*mean, *sigma)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "lognormal",
                    reason: "sigma must be non-negative and finite",
                }),
            Distribution::Triangular { min, mode, max } => {
                rand_distr::Triangular::new(*min, *max, *mode)
                    .map(|d| d.sample(rng))
                    .map_err(|_| SamplingError::InvalidParameters {
                        kind: "triangular",
                        reason: "requires min <= mode <= max and finite bounds",
                    })
            }
            Distribution::Uniform { min, max } => rand_distr::Uniform::new(*min, *max)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "uniform",
                    reason: "requires min < max and finite bounds",
                }),
            Distribution::Weibull { scale, shape } => rand_distr::Weibull::new(*scale, *shape)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "weibull",
                    reason: "scale and shape must be positive and finite",
                }),
            Distribution::Exponential { lambda } => rand_distr::Exp::new(*lambda)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "exponential",
                    reason: "lambda must be positive and finite",
                }),
            Distribution::Poisson { lambda } => rand_distr::Poisson::new(*lambda)
                .map(|d| d.sample(rng))
                .map_err(|_| SamplingError::InvalidParameters {
                    kind: "poisson",
                    reason: "lambda must be positive and finite",
                }),
            Distribution::Kaimal {
                mean_wind_speed,
                turbulence_intensity,
                roughness_length,
                scale,
                hub_height,
            } => sample_kaimal(
                rng,
                *mean_wind_speed,
                *turbulence_intensity,
                *roughness_length,
                *scale,
                *hub_height,
            ),
            Distribution::Gbm {
                initial_value,
                drift,
                volatility,
                time_step,
                current_year,
            } => Ok(sample_gbm(
                rng,
                *initial_value,
                *drift,
                *volatility,
                *time_step,
                *current_year,
            )),
        }
    }
}

/// Standard-normal draw via Box-Muller from two uniforms
fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Shift into (0, 1] so the log never sees zero
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Wind speed with a spectral turbulence correction.
///
/// A base speed is drawn from Normal(U, sigma) and clamped to non-negative.
/// One spectral frequency is drawn log-uniformly, the Kaimal density is
/// evaluated analytically at that frequency, and a Box-Muller amplitude
/// scaled by `sqrt(f * S(f))` is added, so corrections concentrate where the
/// spectrum carries energy instead of acting as uniform noise.
fn sample_kaimal<R: Rng + ?Sized>(
    rng: &mut R,
    mean_wind_speed: f64,
    turbulence_intensity: f64,
    roughness_length: f64,
    scale: f64,
    hub_height: f64,
) -> Result<f64, SamplingError> {
    let u = mean_wind_speed;
    // Absent turbulence intensity falls back to the log wind profile estimate
    let ti = if turbulence_intensity > 0.0 {
        turbulence_intensity
    } else if hub_height > roughness_length && roughness_length > 0.0 {
        1.0 / (hub_height / roughness_length).ln()
    } else {
        0.1
    };
    let sigma = u * ti;

    let base = rand_distr::Normal::new(u, sigma)
        .map_err(|_| SamplingError::InvalidParameters {
            kind: "kaimal",
            reason: "meanWindSpeed and turbulenceIntensity must yield a finite std",
        })?
        .sample(rng)
        .max(0.0);

    // One log-uniform frequency draw across the inertial window
    let ln_f = rng.random_range(KAIMAL_FREQ_MIN.ln()..KAIMAL_FREQ_MAX.ln());
    let f = ln_f.exp();

    // IEC integral length scale: L = scale * 0.7 * min(z, 60)
    let length = scale * 0.7 * hub_height.min(60.0);
    let u_safe = u.max(f64::EPSILON);
    let density = sigma * sigma * (4.0 * length / u_safe)
        / (1.0 + 6.0 * f * length / u_safe).powf(5.0 / 3.0);

    let amplitude = box_muller(rng);
    Ok(base + amplitude * (f * density).sqrt())
}

/// One year-conditioned GBM sample.
///
/// For evaluation years past the first, the value first advances
/// deterministically along the expected path `v * exp(drift * elapsed)`;
/// a single stochastic step then produces the sample. This lets callers
/// sample any project year directly without replaying the whole path.
fn sample_gbm<R: Rng + ?Sized>(
    rng: &mut R,
    initial_value: f64,
    drift: f64,
    volatility: f64,
    time_step: f64,
    current_year: usize,
) -> f64 {
    let mut value = initial_value;
    if current_year > 1 {
        let elapsed = time_step * (current_year - 1) as f64;
        value *= (drift * elapsed).exp();
    }
    let z = box_muller(rng);
    let exponent =
        (drift - 0.5 * volatility * volatility) * time_step + volatility * time_step.sqrt() * z;
    value * exponent.exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_unsupported_kind() {
        let spec = DistributionSpec::new("cauchy", &[]);
        let err = Distribution::from_spec(&spec).unwrap_err();
        assert_eq!(err, SamplingError::UnsupportedKind("cauchy".to_string()));
    }

    #[test]
    fn test_missing_parameters_are_defaulted() {
        let spec = DistributionSpec::new("weibull", &[]);
        let dist = Distribution::from_spec(&spec).unwrap();
        assert_eq!(
            dist,
            Distribution::Weibull {
                scale: 1.0,
                shape: 2.0
            }
        );
    }

    #[test]
    fn test_fixed_always_yields_value() {
        let dist = Distribution::from_spec(&DistributionSpec::fixed(42.5)).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(dist.sample(&mut rng).unwrap(), 42.5);
        }
    }

    #[test]
    fn test_invalid_parameters_surface_at_sample_time() {
        // Construction succeeds (no range validation); sampling reports the error
        let spec = DistributionSpec::new("uniform", &[("min", 5.0), ("max", 1.0)]);
        let dist = Distribution::from_spec(&spec).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            dist.sample(&mut rng),
            Err(SamplingError::InvalidParameters { kind: "uniform", .. })
        ));
    }

    #[test]
    fn test_kaimal_stays_physical() {
        let spec = DistributionSpec::new(
            "kaimal",
            &[
                ("meanWindSpeed", 8.5),
                ("turbulenceIntensity", 0.12),
                ("hubHeight", 90.0),
            ],
        );
        let dist = Distribution::from_spec(&spec).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let v = dist.sample(&mut rng).unwrap();
            assert!(v.is_finite());
            // Base speed is clamped; the spectral correction is small at 12% TI
            assert!(v > -10.0 && v < 40.0, "implausible wind speed {v}");
        }
    }

    #[test]
    fn test_gbm_year_conditioning_advances_expected_path() {
        // With zero volatility the sample is exactly the expected path
        let year5 = Distribution::Gbm {
            initial_value: 100.0,
            drift: 0.05,
            volatility: 0.0,
            time_step: 1.0,
            current_year: 5,
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let v = year5.sample(&mut rng).unwrap();
        let expected = 100.0 * (0.05_f64 * 5.0).exp();
        assert!((v - expected).abs() < 1e-9);
    }

    #[test]
    fn test_gbm_at_year_repins_only_year() {
        let spec = DistributionSpec::new(
            "gbm",
            &[("initialValue", 50.0), ("drift", 0.02), ("volatility", 0.1)],
        );
        let dist = Distribution::from_spec(&spec).unwrap();
        match dist.at_year(7) {
            Distribution::Gbm {
                initial_value,
                current_year,
                ..
            } => {
                assert_eq!(initial_value, 50.0);
                assert_eq!(current_year, 7);
            }
            other => panic!("expected gbm, got {other:?}"),
        }
        // Non-GBM kinds are unchanged
        let fixed = Distribution::Fixed(1.0);
        assert_eq!(fixed.at_year(7), fixed);
    }

    #[test]
    fn test_sampling_is_deterministic_under_seed() {
        let dist = Distribution::Normal {
            mean: 10.0,
            std_dev: 2.0,
        };
        let mut a = SmallRng::seed_from_u64(99);
        let mut b = SmallRng::seed_from_u64(99);
        for _ in 0..50 {
            assert_eq!(dist.sample(&mut a).unwrap(), dist.sample(&mut b).unwrap());
        }
    }
}
