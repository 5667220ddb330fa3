use galmass::fit::weights_from_sigma;
use galmass::{FitOptions, FitSpec, Fitter, ModelContext, RadialGrid, RadialProfile};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use rstest::*;

#[fixture]
fn ctx() -> ModelContext {
    crate::init_logger();
    crate::default_context()
}

/// NFW rotation curve with 3% Gaussian noise on V^2.
fn noisy_nfw(ctx: &ModelContext, truth: &[f64], seed: u64) -> (RadialGrid, Vec<f64>, Vec<f64>) {
    let grid = RadialGrid::linspace(500.0, 30_000.0, 40).unwrap();
    let v2 = RadialProfile::Nfw
        .evaluate(truth, &grid, ctx)
        .unwrap()
        .v_squared;

    let mut rng = Pcg64Mcg::new(seed as u128);
    let sigma: Vec<f64> = v2.iter().map(|v2| 0.03 * v2).collect();
    let y = v2
        .iter()
        .zip(&sigma)
        .map(|(v2, s)| v2 + Normal::new(0.0, *s).unwrap().sample(&mut rng))
        .collect();
    (grid, y, sigma)
}

#[rstest]
fn weighted_fit_within_5_sigma(ctx: ModelContext) {
    let truth = [0.01, 5_000.0];
    for seed in [7, 42, 123] {
        let (grid, y, sigma) = noisy_nfw(&ctx, &truth, seed);
        let spec = FitSpec::builder()
            .initial_params(vec![0.005, 8_000.0])
            .x(grid)
            .y(y)
            .weight_y(weights_from_sigma(&sigma).unwrap())
            .build();
        let result = Fitter::new(
            &RadialProfile::Nfw,
            ctx,
            FitOptions::builder().max_iterations(200).build(),
        )
        .fit(&spec)
        .unwrap();
        println!("seed {seed}: {result}");

        assert!(result.converged());
        for ((fitted, truth), std_err) in result
            .fitted_params
            .iter()
            .zip(truth)
            .zip(&result.param_std_errors)
        {
            assert!(*std_err > 0.0);
            assert!(
                (fitted - truth).abs() <= 5.0 * std_err,
                "seed {seed}: {fitted} vs {truth} (sigma {std_err})"
            );
        }
        // Correct weights give a reduced chi square close to one
        assert!(
            result.reduced_chi_square > 0.3 && result.reduced_chi_square < 3.0,
            "reduced chi2 = {}",
            result.reduced_chi_square
        );
    }
}

#[rstest]
fn orthogonal_distance_regression(ctx: ModelContext) {
    let truth = [0.01, 5_000.0];
    let (grid, y, sigma) = noisy_nfw(&ctx, &truth, 2024);
    let n = grid.len();
    // 20 pc uncertainty on every radius
    let weight_x = vec![1.0 / 400.0; n];
    let spec = FitSpec::builder()
        .initial_params(vec![0.008, 6_000.0])
        .x(grid.clone())
        .y(y.clone())
        .weight_y(weights_from_sigma(&sigma).unwrap())
        .weight_x(weight_x)
        .build();
    let result = Fitter::new(
        &RadialProfile::Nfw,
        ctx,
        FitOptions::builder().max_iterations(200).build(),
    )
    .fit(&spec)
    .unwrap();
    println!("{result}");

    let corrections = result.x_corrections.as_ref().unwrap();
    assert_eq!(corrections.len(), n);
    assert!(corrections.iter().all(|dx| dx.is_finite()));
    // Corrections stay commensurate with the radius uncertainty
    assert!(corrections.iter().all(|dx| dx.abs() < 200.0));
    for ((fitted, truth), std_err) in result
        .fitted_params
        .iter()
        .zip(truth)
        .zip(&result.param_std_errors)
    {
        assert!((fitted - truth).abs() <= 5.0 * std_err);
    }

    // The same data without x weights is an ordinary least squares fit
    let ols = FitSpec::builder()
        .initial_params(vec![0.008, 6_000.0])
        .x(grid)
        .y(y)
        .weight_y(weights_from_sigma(&sigma).unwrap())
        .build();
    let result = Fitter::new(&RadialProfile::Nfw, ctx, FitOptions::default())
        .fit(&ols)
        .unwrap();
    assert!(result.x_corrections.is_none());
}
