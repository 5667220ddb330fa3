use approx::assert_relative_eq;
use galmass::model::{Component, ComponentRole};
use galmass::{
    fit, CompositeModel, FitOptions, FitSpec, FitStatus, Fitter, ModelContext, ModelKind,
    Observable, RadialProfile,
};
use rstest::*;

#[fixture]
fn ctx() -> ModelContext {
    crate::init_logger();
    crate::default_context()
}

#[rstest]
fn bulge_and_halo_all_free(ctx: ModelContext) {
    let model = CompositeModel::new(vec![
        Component::new(ComponentRole::Bulge, RadialProfile::BulgeHernquist),
        Component::new(ComponentRole::Halo, RadialProfile::Nfw),
    ]);
    let truth = [2e10, 800.0, 0.006, 12_000.0];
    let grid = crate::observed_radii();
    let y = model.evaluate(&truth, &grid, &ctx).unwrap().total.v_squared;

    let spec = FitSpec::builder()
        .initial_params(vec![1.5e10, 1_000.0, 0.008, 9_000.0])
        .x(grid)
        .y(y)
        .build();
    let fitter = Fitter::new(
        &model,
        ctx,
        FitOptions::builder().max_iterations(200).build(),
    );
    let result = fitter.fit(&spec).unwrap();
    println!("{result}");

    assert_eq!(result.status, FitStatus::Converged);
    for (fitted, truth) in result.fitted_params.iter().zip(truth) {
        assert_relative_eq!(*fitted, truth, max_relative = 1e-4);
    }
    assert!(result.cost < 1e-6);
    assert!(result.param_std_errors.iter().all(|s| s.is_finite()));
}

#[rstest]
fn named_model_with_fixed_bulge(ctx: ModelContext) {
    let grid = crate::observed_radii();
    let truth = vec![
        600.0, 2_500.0, 1.0, // disk
        4_000.0, 600.0, 2.5, 1.0, // bulge
        0.007, 14_000.0, // halo
    ];
    let y = ModelKind::Nfw
        .model()
        .evaluate(&truth, &grid, &ctx)
        .unwrap()
        .total
        .v_squared;

    let mut initial = truth.clone();
    initial[0] = 450.0;
    initial[1] = 3_000.0;
    initial[7] = 0.009;
    initial[8] = 11_000.0;
    let mask = [false, false, true, true, true, true, true, false, false];

    let result = fit("nfw", &grid, &y, &initial, None, None, Some(&mask)).unwrap();
    println!("{result}");
    assert!(result.converged());

    for (i, fixed) in mask.iter().enumerate() {
        if *fixed {
            assert_eq!(result.fitted_params[i], initial[i], "p[{i}] moved");
            assert_eq!(result.param_std_errors[i], 0.0);
        } else {
            assert_relative_eq!(result.fitted_params[i], truth[i], max_relative = 1e-4);
        }
    }
}

#[rstest]
fn fixed_values_survive_mismatched_data(ctx: ModelContext) {
    // Data from a heavier halo than the fixed one: the fixed values must not move regardless
    let grid = crate::observed_radii();
    let y = RadialProfile::Nfw
        .evaluate(&[0.02, 5_000.0], &grid, &ctx)
        .unwrap()
        .velocity();
    let spec = FitSpec::builder()
        .initial_params(vec![0.01, 5_000.0])
        .fixed_mask(vec![true, false])
        .x(grid)
        .y(y)
        .observable(Observable::Velocity)
        .build();
    let result = Fitter::new(&RadialProfile::Nfw, ctx, FitOptions::default())
        .fit(&spec)
        .unwrap();
    assert_eq!(result.fitted_params[0], 0.01);
    assert!(result.fitted_params[1] > 5_000.0);
}

#[rstest]
fn iteration_budget(ctx: ModelContext) {
    let grid = crate::observed_radii();
    let y = RadialProfile::Nfw
        .evaluate(&[0.01, 5_000.0], &grid, &ctx)
        .unwrap()
        .v_squared;
    let spec = FitSpec::builder()
        .initial_params(vec![0.1, 500.0])
        .x(grid)
        .y(y)
        .build();
    let result = Fitter::new(
        &RadialProfile::Nfw,
        ctx,
        FitOptions::builder().max_iterations(1).build(),
    )
    .fit(&spec)
    .unwrap();
    // Rejected trial steps do not count, so the single iteration is an accepted step
    assert_eq!(result.status, FitStatus::DidNotConverge);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.fitted_params.len(), 2);
    assert_ne!(result.fitted_params, spec.initial_params);
}
