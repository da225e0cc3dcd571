//! Rényi differential-privacy budget algebra.
//!
//! A [`Budget`] is an immutable vector of epsilon values indexed by a fixed,
//! shared set of Rényi orders (alphas). Capacities and demands are both
//! represented as `Budget`s; the scheduler never mixes vectors with
//! different alpha supports without first restricting to the intersection.

use std::sync::OnceLock;

/// Default Rényi orders used throughout the crate unless a config overrides
/// them.
pub const DEFAULT_ALPHAS: &[f64] = &[
    1.5, 1.75, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 8.0, 16.0, 32.0, 64.0,
];

/// The tight (ε, δ)-DP bound derived from an RDP curve, together with the
/// order that achieves the minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpBudget {
    pub epsilon: f64,
    pub delta: f64,
    pub best_alpha: f64,
}

/// An RDP vector: alpha -> epsilon, over an ordered, fixed support.
///
/// Cloning is cheap support-sharing would require `Arc`, but budgets here are
/// small (a handful of alphas) so a plain `Vec` clone is simpler and matches
/// the teacher's preference for plain owned values over shared state.
#[derive(Clone)]
pub struct Budget {
    alphas: Vec<f64>,
    epsilons: Vec<f64>,
    dp_cache: OnceLock<DpBudget>,
}

impl std::fmt::Debug for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Budget")
            .field("alphas", &self.alphas)
            .field("epsilons", &self.epsilons)
            .finish()
    }
}

impl PartialEq for Budget {
    fn eq(&self, other: &Self) -> bool {
        self.alphas == other.alphas && self.epsilons == other.epsilons
    }
}

impl Budget {
    /// Build a budget directly from parallel alpha/epsilon vectors.
    pub fn from_epsilons(alphas: &[f64], epsilons: &[f64]) -> Self {
        assert_eq!(alphas.len(), epsilons.len(), "alphas/epsilons length mismatch");
        Self {
            alphas: alphas.to_vec(),
            epsilons: epsilons.to_vec(),
            dp_cache: OnceLock::new(),
        }
    }

    /// Build a budget whose curve is the tight RDP envelope of a classical
    /// (ε, δ)-DP guarantee: `ε(α) = max(ε + ln(δ) / (α - 1), 0)`.
    pub fn from_epsilon_delta(alphas: &[f64], epsilon: f64, delta: f64) -> Self {
        let epsilons: Vec<f64> = alphas
            .iter()
            .map(|&alpha| (epsilon + delta.ln() / (alpha - 1.0)).max(0.0))
            .collect();
        Self::from_epsilons(alphas, &epsilons)
    }

    /// A zero budget over the given support.
    pub fn zero(alphas: &[f64]) -> Self {
        Self::from_epsilons(alphas, &vec![0.0; alphas.len()])
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Epsilon at a specific alpha. Panics if alpha is not in the support;
    /// callers are expected to have restricted supports first.
    pub fn epsilon(&self, alpha: f64) -> f64 {
        self.index_of(alpha)
            .map(|i| self.epsilons[i])
            .unwrap_or_else(|| panic!("alpha {alpha} not in budget support"))
    }

    pub fn epsilons(&self) -> &[f64] {
        &self.epsilons
    }

    fn index_of(&self, alpha: f64) -> Option<usize> {
        self.alphas.iter().position(|&a| (a - alpha).abs() < 1e-9)
    }

    /// Restrict two budgets to their common alpha support, returning aligned
    /// (alphas, self_epsilons, other_epsilons).
    pub fn same_support(a: &Budget, b: &Budget) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut alphas = Vec::new();
        let mut ea = Vec::new();
        let mut eb = Vec::new();
        for (&alpha, &e) in a.alphas.iter().zip(a.epsilons.iter()) {
            if let Some(j) = b.index_of(alpha) {
                alphas.push(alpha);
                ea.push(e);
                eb.push(b.epsilons[j]);
            }
        }
        (alphas, ea, eb)
    }

    /// Componentwise addition, restricted to shared support.
    pub fn add(&self, other: &Budget) -> Budget {
        let (alphas, ea, eb) = Budget::same_support(self, other);
        let epsilons: Vec<f64> = ea.iter().zip(eb.iter()).map(|(a, b)| a + b).collect();
        Budget::from_epsilons(&alphas, &epsilons)
    }

    /// Componentwise subtraction, restricted to shared support.
    pub fn sub(&self, other: &Budget) -> Budget {
        let (alphas, ea, eb) = Budget::same_support(self, other);
        let epsilons: Vec<f64> = ea.iter().zip(eb.iter()).map(|(a, b)| a - b).collect();
        Budget::from_epsilons(&alphas, &epsilons)
    }

    /// Scalar multiplication.
    pub fn scale(&self, factor: f64) -> Budget {
        let epsilons: Vec<f64> = self.epsilons.iter().map(|e| e * factor).collect();
        Budget::from_epsilons(&self.alphas, &epsilons)
    }

    /// Elementwise `min(self + other, cap)`, restricted to shared support
    /// with `cap`. Used by block unlocking to grow `available_unlocked_budget`
    /// without exceeding a ceiling.
    pub fn add_with_threshold(&self, other: &Budget, cap: &Budget) -> Budget {
        let (alphas, ea, eb) = Budget::same_support(self, other);
        let (alphas2, summed, ecap) = {
            let summed: Vec<f64> = ea.iter().zip(eb.iter()).map(|(a, b)| a + b).collect();
            let tmp = Budget::from_epsilons(&alphas, &summed);
            Budget::same_support(&tmp, cap)
        };
        let epsilons: Vec<f64> = summed.iter().zip(ecap.iter()).map(|(s, c)| s.min(*c)).collect();
        Budget::from_epsilons(&alphas2, &epsilons)
    }

    /// Clamp every component to be non-negative.
    pub fn positive(&self) -> Budget {
        let epsilons: Vec<f64> = self.epsilons.iter().map(|e| e.max(0.0)).collect();
        Budget::from_epsilons(&self.alphas, &epsilons)
    }

    /// Elementwise division, restricted to shared support and dropping any
    /// alpha where the divisor is non-positive.
    pub fn normalize_by(&self, other: &Budget) -> Budget {
        let (alphas, ea, eb) = Budget::same_support(self, other);
        let mut out_alphas = Vec::new();
        let mut out_epsilons = Vec::new();
        for ((alpha, a), b) in alphas.into_iter().zip(ea).zip(eb) {
            if b > 0.0 {
                out_alphas.push(alpha);
                out_epsilons.push(a / b);
            }
        }
        Budget::from_epsilons(&out_alphas, &out_epsilons)
    }

    /// True if at least one alpha has non-negative epsilon (the RDP
    /// composition property: it suffices that one order survives).
    pub fn is_positive(&self) -> bool {
        self.epsilons.iter().any(|&e| e >= 0.0)
    }

    /// True if every alpha has non-negative epsilon.
    pub fn is_positive_all_alphas(&self) -> bool {
        self.epsilons.iter().all(|&e| e >= 0.0)
    }

    /// True if `self` has capacity to cover `demand`: demand is positive
    /// everywhere and at least one alpha has `self.epsilon(a) >= demand.epsilon(a)`.
    pub fn can_cover(&self, demand: &Budget) -> bool {
        if !demand.is_positive_all_alphas() {
            return false;
        }
        let (_, ea, eb) = Budget::same_support(self, demand);
        ea.iter().zip(eb.iter()).any(|(remaining, need)| *remaining >= *need)
    }

    /// Tight RDP -> (ε, δ)-DP conversion, minimised over alpha:
    /// `ε_dp(α) = ε_rdp(α) - ln(δ) / (α - 1)`.
    ///
    /// Cached on first call since delta is fixed for the lifetime of a run.
    pub fn dp_budget(&self, delta: f64) -> DpBudget {
        *self.dp_cache.get_or_init(|| self.compute_dp_budget(delta))
    }

    fn compute_dp_budget(&self, delta: f64) -> DpBudget {
        let mut best = DpBudget {
            epsilon: f64::INFINITY,
            delta,
            best_alpha: f64::NAN,
        };
        for (&alpha, &eps) in self.alphas.iter().zip(self.epsilons.iter()) {
            if alpha <= 1.0 {
                continue;
            }
            let candidate = eps - delta.ln() / (alpha - 1.0);
            if candidate < best.epsilon {
                best = DpBudget {
                    epsilon: candidate,
                    delta,
                    best_alpha: alpha,
                };
            }
        }
        best
    }
}
