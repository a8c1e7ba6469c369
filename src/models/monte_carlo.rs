use crate::errors::{PricingError, PricingResult};
use crate::models::{ContractParameters, OptionPrices, PricingModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Monte Carlo pricing over geometric Brownian motion paths.
///
/// Per path, W is the cumulative sum of sqrt(dt) * Z with W(0) = 0, and
///
///   S[j] = S[j-1] * exp((r - sigma^2/2) * dt + sigma * (W[j] - W[j-1]))
///
/// This is the exact GBM solution per step, not an Euler scheme, so coarse
/// grids carry no discretization bias. Normals are drawn path by path, step
/// by step: the same generator state gives the same paths whether or not the
/// full matrix is kept.
pub struct PathSimulator;

/// Owned row-major buffer: one row per path, `num_steps + 1` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PathMatrix {
    fn new(rows: usize, cols: usize) -> PricingResult<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            PricingError::invalid(format!("{rows} paths x {cols} points does not fit in memory"))
        })?;
        Ok(Self { rows, cols, data: vec![0.0; len] })
    }

    #[inline]
    pub fn num_paths(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn points_per_path(&self) -> usize {
        self.cols
    }

    #[cfg(test)]
    pub fn path(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.cols)
    }

    /// Last column: price at maturity of every path.
    #[cfg(test)]
    pub fn terminal_prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.iter().map(|row| row[row.len() - 1])
    }
}

/// Full simulation output: grid, every path, and the prices derived from them.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub time_grid: Vec<f64>,
    pub paths: PathMatrix,
    pub monte_carlo_call_price: f64,
    pub monte_carlo_put_price: f64,
    pub call_std_error: f64,
    pub put_std_error: f64,
}

/// Prices only. Produced without keeping the path matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloEstimate {
    pub call_price: f64,
    pub put_price: f64,
    pub call_std_error: f64,
    pub put_std_error: f64,
}

impl From<MonteCarloEstimate> for OptionPrices {
    fn from(e: MonteCarloEstimate) -> Self {
        OptionPrices {
            call: e.call_price,
            put: e.put_price,
            call_std_error: Some(e.call_std_error),
            put_std_error: Some(e.put_std_error),
        }
    }
}

/// Per-step constants shared by every path.
#[derive(Debug, Clone, Copy)]
struct StepConstants {
    drift: f64, // (r - sigma^2/2) * dt
    sigma: f64,
    sqrt_dt: f64,
}

impl StepConstants {
    fn new(params: &ContractParameters) -> Self {
        let dt = params.dt();
        let sigma = params.volatility;
        Self {
            drift: (params.risk_free_rate - 0.5 * sigma * sigma) * dt,
            sigma,
            sqrt_dt: dt.sqrt(),
        }
    }
}

impl PathSimulator {
    /// Simulate `num_simulations` paths and price the call and put from their
    /// discounted terminal payoffs. Keeps the whole path matrix.
    pub fn simulate<R: Rng + ?Sized>(
        params: &ContractParameters,
        rng: &mut R,
    ) -> PricingResult<SimulationResult> {
        params.validate_for_simulation()?;

        let cols = params.points_per_path()?;
        let mut paths = PathMatrix::new(params.num_simulations, cols)?;
        let consts = StepConstants::new(params);
        let mut payoffs = PayoffAccumulator::new(params.strike);

        for (i, row) in paths.data.chunks_exact_mut(cols).enumerate() {
            fill_path(row, params.spot, consts, rng, i)?;
            payoffs.record(row[cols - 1]);
        }

        let estimate = payoffs.finish(params.discount_factor())?;

        tracing::debug!(
            paths = params.num_simulations,
            steps = params.num_steps,
            call = estimate.call_price,
            put = estimate.put_price,
            "monte carlo simulation complete"
        );

        Ok(SimulationResult {
            time_grid: time_grid(params.maturity, params.num_steps),
            paths,
            monte_carlo_call_price: estimate.call_price,
            monte_carlo_put_price: estimate.put_price,
            call_std_error: estimate.call_std_error,
            put_std_error: estimate.put_std_error,
        })
    }

    /// Same draws and prices as `simulate`, with a single reusable row
    /// instead of the full matrix.
    pub fn estimate<R: Rng + ?Sized>(
        params: &ContractParameters,
        rng: &mut R,
    ) -> PricingResult<MonteCarloEstimate> {
        params.validate_for_simulation()?;

        let mut row = vec![0.0; params.points_per_path()?];
        let consts = StepConstants::new(params);
        let mut payoffs = PayoffAccumulator::new(params.strike);

        for i in 0..params.num_simulations {
            fill_path(&mut row, params.spot, consts, rng, i)?;
            payoffs.record(row[params.num_steps]);
        }

        let estimate = payoffs.finish(params.discount_factor())?;

        tracing::debug!(
            paths = params.num_simulations,
            steps = params.num_steps,
            call = estimate.call_price,
            put = estimate.put_price,
            "monte carlo estimate complete"
        );

        Ok(estimate)
    }
}

/// `num_steps + 1` evenly spaced points from 0 to `maturity`, both inclusive.
pub fn time_grid(maturity: f64, num_steps: usize) -> Vec<f64> {
    let n = num_steps as f64;
    (0..=num_steps).map(|j| maturity * (j as f64 / n)).collect()
}

/// Walk one path forward. row[0] is the spot, every later point depends on
/// the one before it.
#[inline]
fn fill_path<R: Rng + ?Sized>(
    row: &mut [f64],
    spot: f64,
    consts: StepConstants,
    rng: &mut R,
    path_index: usize,
) -> PricingResult<()> {
    row[0] = spot;

    // Cumulative Brownian motion. W before the first step is 0, so the first
    // increment is the first cumulative value itself. The increment is taken
    // as a difference of the running sum, not sqrt(dt) * z directly, so
    // rounding matches a cumsum-then-diff over the whole row.
    let mut w = 0.0_f64;
    let mut w_prev = 0.0_f64;

    for j in 1..row.len() {
        let z: f64 = rng.sample(StandardNormal);
        w += consts.sqrt_dt * z;
        let dw = w - w_prev;
        w_prev = w;

        let next = row[j - 1] * (consts.drift + consts.sigma * dw).exp();
        if !(next > 0.0 && next.is_finite()) {
            return Err(PricingError::overflow(format!(
                "path {path_index} step {j} reached {next}"
            )));
        }
        row[j] = next;
    }

    Ok(())
}

/// Running sums of call/put payoffs and their squares.
struct PayoffAccumulator {
    strike: f64,
    count: usize,
    call_sum: f64,
    call_sq_sum: f64,
    put_sum: f64,
    put_sq_sum: f64,
}

impl PayoffAccumulator {
    fn new(strike: f64) -> Self {
        Self {
            strike,
            count: 0,
            call_sum: 0.0,
            call_sq_sum: 0.0,
            put_sum: 0.0,
            put_sq_sum: 0.0,
        }
    }

    #[inline]
    fn record(&mut self, terminal: f64) {
        let call = (terminal - self.strike).max(0.0);
        let put = (self.strike - terminal).max(0.0);
        self.count += 1;
        self.call_sum += call;
        self.call_sq_sum += call * call;
        self.put_sum += put;
        self.put_sq_sum += put * put;
    }

    fn finish(&self, discount: f64) -> PricingResult<MonteCarloEstimate> {
        let n = self.count as f64;
        let estimate = MonteCarloEstimate {
            call_price: discount * self.call_sum / n,
            put_price: discount * self.put_sum / n,
            call_std_error: discount * std_error(self.call_sum, self.call_sq_sum, self.count),
            put_std_error: discount * std_error(self.put_sum, self.put_sq_sum, self.count),
        };

        let all_finite = [
            estimate.call_price,
            estimate.put_price,
            estimate.call_std_error,
            estimate.put_std_error,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !all_finite {
            return Err(PricingError::overflow(format!(
                "monte carlo produced call={} put={}",
                estimate.call_price, estimate.put_price
            )));
        }

        Ok(estimate)
    }
}

/// Standard error of the mean from running sums. Sample variance (n - 1).
#[inline]
fn std_error(sum: f64, sq_sum: f64, count: usize) -> f64 {
    if count < 2 {
        return 0.0;
    }
    let n = count as f64;
    let mean = sum / n;
    let var = ((sq_sum - n * mean * mean) / (n - 1.0)).max(0.0);
    (var / n).sqrt()
}

/// `PricingModel` adapter around `PathSimulator::estimate`.
/// A fixed seed makes every call reproducible; without one each call draws
/// a fresh generator from OS entropy.
pub struct MonteCarloPricer {
    seed: Option<u64>,
}

impl MonteCarloPricer {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl PricingModel for MonteCarloPricer {
    #[inline]
    fn name(&self) -> &'static str {
        "Monte Carlo"
    }

    fn price(&self, params: &ContractParameters) -> PricingResult<OptionPrices> {
        let mut rng = self.rng();
        PathSimulator::estimate(params, &mut rng).map(OptionPrices::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::AnalyticPricer;

    fn atm(num_simulations: usize, num_steps: usize) -> ContractParameters {
        ContractParameters::new(100.0, 0.05, 0.2, 1.0, 100.0, num_simulations).with_steps(num_steps)
    }

    #[test]
    fn test_shapes_and_time_grid() {
        let mut rng = StdRng::seed_from_u64(1);
        let res = PathSimulator::simulate(&atm(25, 252), &mut rng).unwrap();

        assert_eq!(res.paths.num_paths(), 25);
        assert_eq!(res.paths.points_per_path(), 253);
        assert_eq!(res.time_grid.len(), 253);
        assert_eq!(res.time_grid[0], 0.0);
        assert_eq!(res.time_grid[252], 1.0);
        for w in res.time_grid.windows(2) {
            assert!(w[1] > w[0], "time grid not increasing: {} then {}", w[0], w[1]);
        }
        for path in res.paths.iter() {
            assert_eq!(path[0], 100.0, "every path starts at spot");
        }
    }

    #[test]
    fn test_time_grid_fractional_maturity() {
        let grid = time_grid(0.5, 3);
        assert_eq!(grid.len(), 4);
        assert!((grid[1] - 0.5 / 3.0).abs() < 1e-15);
        assert_eq!(grid[3], 0.5);
    }

    #[test]
    fn test_paths_strictly_positive_and_prices_non_negative() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = ContractParameters::new(50.0, 0.02, 0.9, 2.0, 60.0, 500).with_steps(100);
        let res = PathSimulator::simulate(&params, &mut rng).unwrap();

        for (i, path) in res.paths.iter().enumerate() {
            assert!(path.iter().all(|&s| s > 0.0), "path {i} has a non-positive price");
        }
        assert!(res.monte_carlo_call_price >= 0.0);
        assert!(res.monte_carlo_put_price >= 0.0);

        // Recompute the undiscounted call mean from the last column
        let mean: f64 = res.paths.terminal_prices().map(|s| (s - 60.0).max(0.0)).sum::<f64>() / 500.0;
        let discounted = mean * (-0.02_f64 * 2.0).exp();
        assert!((discounted - res.monte_carlo_call_price).abs() < 1e-9);
    }

    #[test]
    fn test_zero_volatility_is_deterministic_drift() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = ContractParameters::new(100.0, 0.05, 0.0, 1.0, 100.0, 10).with_steps(252);
        let res = PathSimulator::simulate(&params, &mut rng).unwrap();

        let first = res.paths.path(0).to_vec();
        for path in res.paths.iter() {
            assert_eq!(path, first.as_slice(), "paths must coincide with zero vol");
        }
        for (t, s) in res.time_grid.iter().zip(first.iter()) {
            let expected = 100.0 * (0.05 * t).exp();
            assert!((s - expected).abs() <= 1e-9 * expected, "S({t})={s} expected {expected}");
        }

        // Deterministic terminal: call = S - K e^{-rT}, put = 0
        let call = 100.0 - 100.0 * (-0.05_f64).exp();
        assert!((res.monte_carlo_call_price - call).abs() < 1e-9);
        assert_eq!(res.monte_carlo_put_price, 0.0);
        assert!(res.call_std_error < 1e-6, "se={}", res.call_std_error);
    }

    #[test]
    fn test_first_increment_uses_first_cumulative_value() {
        let params = atm(1, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let res = PathSimulator::simulate(&params, &mut rng).unwrap();

        // Replay the same normals by hand
        let mut replay = StdRng::seed_from_u64(11);
        let dt: f64 = 1.0 / 3.0;
        let drift = (0.05 - 0.5 * 0.04) * dt;
        let mut expected = 100.0;
        for j in 1..=3 {
            let z: f64 = replay.sample(StandardNormal);
            expected *= (drift + 0.2 * dt.sqrt() * z).exp();
            let got = res.paths.path(0)[j];
            assert!((got - expected).abs() < 1e-10, "step {j}: got {got} expected {expected}");
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let params = atm(200, 20);
        let a = PathSimulator::simulate(&params, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = PathSimulator::simulate(&params, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a.paths, b.paths);
        assert_eq!(a.monte_carlo_call_price, b.monte_carlo_call_price);

        let c = PathSimulator::simulate(&params, &mut StdRng::seed_from_u64(10)).unwrap();
        assert_ne!(a.monte_carlo_call_price, c.monte_carlo_call_price);
    }

    #[test]
    fn test_estimate_matches_simulate() {
        let params = atm(300, 30);
        let full = PathSimulator::simulate(&params, &mut StdRng::seed_from_u64(5)).unwrap();
        let lean = PathSimulator::estimate(&params, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(full.monte_carlo_call_price, lean.call_price);
        assert_eq!(full.monte_carlo_put_price, lean.put_price);
        assert_eq!(full.call_std_error, lean.call_std_error);
    }

    #[test]
    fn test_converges_to_black_scholes() {
        // Exact GBM steps carry no discretization bias, so a coarse grid is enough
        let params = atm(200_000, 12);
        let mc = PathSimulator::estimate(&params, &mut StdRng::seed_from_u64(2024)).unwrap();
        let bs = AnalyticPricer::new().price(&params).unwrap();

        let diff = (mc.call_price - bs.call_price).abs();
        assert!(
            diff < 0.01 * bs.call_price,
            "MC call {} vs BS {} (se {})",
            mc.call_price,
            bs.call_price,
            mc.call_std_error
        );
        assert!(
            diff < 4.0 * mc.call_std_error,
            "MC call {} outside 4 standard errors of BS {}",
            mc.call_price,
            bs.call_price
        );
        let put_diff = (mc.put_price - bs.put_price).abs();
        assert!(put_diff < 4.0 * mc.put_std_error, "MC put {} vs BS {}", mc.put_price, bs.put_price);
    }

    #[test]
    fn test_std_error_shrinks_with_more_paths() {
        let small = PathSimulator::estimate(&atm(1_000, 12), &mut StdRng::seed_from_u64(1)).unwrap();
        let large = PathSimulator::estimate(&atm(100_000, 12), &mut StdRng::seed_from_u64(1)).unwrap();
        // 100x the paths -> roughly 1/10 the standard error
        assert!(
            large.call_std_error < small.call_std_error / 5.0,
            "se {} -> {}",
            small.call_std_error,
            large.call_std_error
        );
    }

    #[test]
    fn test_rejects_zero_counts_before_allocating() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            PathSimulator::simulate(&atm(0, 252), &mut rng),
            Err(PricingError::InvalidParameter(_))
        ));
        assert!(matches!(
            PathSimulator::estimate(&atm(10, 0), &mut rng),
            Err(PricingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_max_step_count_rejected_instead_of_overflowing() {
        let params = atm(1, usize::MAX);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            PathSimulator::estimate(&params, &mut rng),
            Err(PricingError::InvalidParameter(_))
        ));
        assert!(matches!(
            PathSimulator::simulate(&params, &mut rng),
            Err(PricingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_extreme_volatility_fails_explicitly() {
        let params = ContractParameters::new(100.0, 0.05, 1e6, 1.0, 100.0, 10).with_steps(10);
        let res = PathSimulator::simulate(&params, &mut StdRng::seed_from_u64(0));
        assert!(
            matches!(res, Err(PricingError::NumericOverflow(_))),
            "expected overflow, got {res:?}"
        );
    }

    #[test]
    fn test_pricer_adapter_reproducible_with_seed() {
        let params = atm(500, 10);
        let pricer = MonteCarloPricer::seeded(77);
        let a = pricer.price(&params).unwrap();
        let b = pricer.price(&params).unwrap();
        assert_eq!(a, b);
        assert_eq!(pricer.name(), "Monte Carlo");
        assert!(a.call_std_error.is_some());
    }
}
