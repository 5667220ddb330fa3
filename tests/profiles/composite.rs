use approx::assert_relative_eq;
use galmass::model::{Component, ComponentRole};
use galmass::{CompositeModel, ModelContext, ModelKind, RadialProfile, RotationCurve};
use rstest::*;

#[fixture]
fn ctx() -> ModelContext {
    crate::init_logger();
    crate::default_context()
}

/// Disk, bulge and NFW halo parameters of a Milky Way like galaxy.
fn nfw_params() -> Vec<f64> {
    vec![
        500.0, 3_000.0, 1.0, // disk
        5_000.0, 700.0, 2.5, 1.0, // bulge
        0.008, 15_000.0, // halo
    ]
}

#[rstest]
fn sum_of_squares(ctx: ModelContext) {
    let grid = crate::observed_radii();
    let model = ModelKind::Nfw.model();
    let params = nfw_params();
    let curve = model.evaluate(&params, &grid, &ctx).unwrap();
    assert_eq!(curve.components.len(), 3);

    let disk = RadialProfile::Disk
        .evaluate(&params[0..3], &grid, &ctx)
        .unwrap();
    let halo = RadialProfile::Nfw
        .evaluate(&params[7..9], &grid, &ctx)
        .unwrap();

    for i in 0..grid.len() {
        let sum: f64 = curve.components.iter().map(|(_, c)| c.v_squared[i]).sum();
        assert_relative_eq!(curve.total.v_squared[i], sum, max_relative = 1e-12);
        assert!(curve.total.v_squared[i] > disk.v_squared[i] + halo.v_squared[i]);
        // Additive in V^2, never in V
        let v = curve.total.velocity()[i];
        let v_sum: f64 = curve
            .components
            .iter()
            .map(|(_, c)| c.velocity()[i])
            .sum();
        assert!(v < v_sum);
    }
}

#[rstest]
fn disabled_component(ctx: ModelContext) {
    let grid = crate::observed_radii();
    let full = ModelKind::Nfw.model();
    let no_halo = full.clone().with_disabled(ComponentRole::Halo);
    assert_eq!(no_halo.arity(), full.arity());

    let mut params = nfw_params();
    // Parameters of a disabled component are not validated
    params[7] = -1.0;
    let curve = no_halo.evaluate(&params, &grid, &ctx).unwrap();

    let bulge_disk = ModelKind::BulgeDisk
        .model()
        .evaluate(&params[..7], &grid, &ctx)
        .unwrap();
    assert_eq!(curve.total.v_squared, bulge_disk.total.v_squared);
    assert!(curve.components[2].1.v_squared.iter().all(|v2| *v2 == 0.0));
    assert_eq!(curve.components[2].1.len(), grid.len());

    // Enabled, the same parameters are rejected
    assert!(full.evaluate(&params, &grid, &ctx).is_err());
}

#[rstest]
fn custom_composite(ctx: ModelContext) {
    let grid = crate::observed_radii();
    let model = CompositeModel::new(vec![
        Component::new(ComponentRole::Bulge, RadialProfile::BulgeHernquist),
        Component::new(ComponentRole::Halo, RadialProfile::HaloHernquist),
    ]);
    assert_eq!(RotationCurve::arity(&model), 5);
    let curve = RotationCurve::evaluate(&model, &[1e10, 500.0, 1e12, 2_000.0, 50_000.0], &grid, &ctx)
        .unwrap();
    assert!(curve.v_squared.iter().all(|v2| *v2 > 0.0));
    assert!(matches!(
        RotationCurve::evaluate(&model, &[1e10, 500.0], &grid, &ctx),
        Err(galmass::DomainError::CompositeArity { expected: 5, got: 2 })
    ));
}

#[rstest]
fn bulge_is_continuous_across_exponential_index(ctx: ModelContext) {
    let grid = galmass::RadialGrid::new(vec![200.0, 1_000.0, 3_000.0]).unwrap();
    let model = ModelKind::BulgeDisk.model();
    let v2_at = |n: f64| {
        let curve = model
            .evaluate(&[0.0, 1_000.0, 1.0, 1_000.0, 1_000.0, n, 1.0], &grid, &ctx)
            .unwrap();
        assert!(curve.total.warnings.is_empty(), "n = {n}: {:?}", curve.total.warnings);
        curve.total.v_squared
    };

    let exponential = v2_at(1.0);
    for n in [1.0001, 1.05, 1.2] {
        let v2 = v2_at(n);
        for (i, (v, e)) in v2.iter().zip(&exponential).enumerate() {
            assert!(v.is_finite() && *v > 0.0, "n = {n}, radius #{i}: {v}");
            assert!((v - e).abs() < 0.5 * e, "n = {n}, radius #{i}: {v} vs {e}");
            if n < 1.001 {
                assert_relative_eq!(v, e, max_relative = 1e-3);
            }
        }
    }
}
