use approx::assert_relative_eq;
use galmass::diagnostics::{chi_square, reduced_chi_square, residual_stats, DiagnosticsError};
use galmass::fit::weights_from_sigma;
use galmass::{FitOptions, FitSpec, Fitter, RadialGrid, RadialProfile};

#[test]
fn reduced_chi_square_requires_free_dof() {
    let obs = [10.0, 12.0, 15.0];
    let model = [11.0, 12.0, 13.0];
    let sigma = [1.0, 2.0, 2.0];
    assert_relative_eq!(chi_square(&obs, &model, Some(&sigma)).unwrap(), 2.0);
    assert_relative_eq!(
        reduced_chi_square(&obs, &model, 1, Some(&sigma)).unwrap(),
        1.0
    );
    assert_eq!(
        reduced_chi_square(&obs, &model, 3, Some(&sigma)),
        Err(DiagnosticsError::NotEnoughDegreesOfFreedom { len: 3, dof: 3 })
    );
}

#[test]
fn fit_statistics_are_consistent() {
    crate::init_logger();
    let ctx = crate::default_context();
    let grid = RadialGrid::linspace(1_000.0, 20_000.0, 12).unwrap();
    let truth = RadialProfile::PseudoIsothermal
        .evaluate(&[0.05, 2_000.0], &grid, &ctx)
        .unwrap()
        .v_squared;
    // Alternate the data around the model by one sigma
    let sigma: Vec<f64> = truth.iter().map(|v2| 0.05 * v2).collect();
    let y: Vec<f64> = truth
        .iter()
        .zip(&sigma)
        .enumerate()
        .map(|(i, (v2, s))| if i % 2 == 0 { v2 + s } else { v2 - s })
        .collect();

    let spec = FitSpec::builder()
        .initial_params(vec![0.05, 2_000.0])
        .fixed_mask(vec![false, true])
        .x(grid.clone())
        .y(y.clone())
        .weight_y(weights_from_sigma(&sigma).unwrap())
        .build();
    let result = Fitter::new(&RadialProfile::PseudoIsothermal, ctx, FitOptions::default())
        .fit(&spec)
        .unwrap();

    let model = RadialProfile::PseudoIsothermal
        .evaluate(&result.fitted_params, &grid, &ctx)
        .unwrap()
        .v_squared;
    // One free parameter
    let expected = reduced_chi_square(&y, &model, 1, Some(&sigma)).unwrap();
    assert_relative_eq!(result.reduced_chi_square, expected, max_relative = 1e-9);

    let stats = residual_stats(&y, &model).unwrap();
    assert_eq!(stats, result.residuals);
    assert!(stats.max_abs >= stats.rms);
}
