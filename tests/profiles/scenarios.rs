use approx::assert_relative_eq;
use galmass::profiles::{NfwM200Params, SersicStrategy};
use galmass::{Constants, ModelContext, RadialGrid, RadialProfile};
use rstest::*;
use std::f64::consts::PI;

#[fixture]
fn ctx() -> ModelContext {
    crate::init_logger();
    crate::default_context()
}

#[rstest]
fn exponential_disk(ctx: ModelContext) {
    let grid = RadialGrid::new(vec![0.0, 1_000.0]).unwrap();
    let curve = RadialProfile::Disk
        .evaluate(&[1_000.0, 1_000.0], &grid, &ctx)
        .unwrap();
    let expected = 2.0 * PI * 1e9 * (1.0 - 2.0 * (-1.0_f64).exp());
    assert_relative_eq!(curve.mass[1], expected, max_relative = 1e-12);
    assert_relative_eq!(curve.mass[1], 1.6599e9, max_relative = 1e-3);
    assert_relative_eq!(
        curve.v_squared[1],
        Constants::default().g_model() * expected / 1_000.0,
        max_relative = 1e-12
    );
}

#[rstest]
fn nfw_shape_is_amplitude_independent(ctx: ModelContext) {
    let m200 = NfwM200Params {
        concentration: 10.0,
        m200: 1e12,
        hubble: 70.0,
    };
    let scale = m200.to_density_scale(&ctx.constants);
    let rc = scale.scale_radius;
    let grid = RadialGrid::new(vec![rc, 2.0 * rc]).unwrap();

    let ratio = |density: f64| {
        let curve = RadialProfile::Nfw
            .evaluate(&[density, rc], &grid, &ctx)
            .unwrap();
        curve.mass[0] / curve.mass[1]
    };

    let expected = (2.0_f64.ln() - 0.5) / (3.0_f64.ln() - 2.0 / 3.0);
    assert_relative_eq!(ratio(scale.density), expected, max_relative = 1e-12);
    assert_relative_eq!(ratio(scale.density * 17.0), expected, max_relative = 1e-12);

    // The concentration form matches the density form
    let from_m200 = RadialProfile::NfwM200
        .evaluate(&[10.0, 1e12, 70.0], &grid, &ctx)
        .unwrap();
    let from_density = RadialProfile::Nfw
        .evaluate(&[scale.density, rc], &grid, &ctx)
        .unwrap();
    for (a, b) in from_m200.mass.iter().zip(&from_density.mass) {
        assert_relative_eq!(a, b, max_relative = 1e-10);
    }
}

#[rstest]
fn sersic_strategies_agree(ctx: ModelContext) {
    let grid = RadialGrid::new(vec![100.0, 500.0, 1_000.0, 2_000.0, 5_000.0]).unwrap();
    let params = [1_000.0, 1_000.0, 2.0, 1.0];
    let quad = RadialProfile::SersicQuad
        .evaluate(&params, &grid, &ctx)
        .unwrap();
    let gauss = RadialProfile::SersicGauss
        .evaluate(&params, &grid, &ctx)
        .unwrap();
    for (i, (q, g)) in quad.v_squared.iter().zip(&gauss.v_squared).enumerate() {
        assert!(
            (q - g).abs() <= 0.01 * q,
            "radius #{i}: adaptive {q} vs Gauss {g}"
        );
    }
}

#[rstest]
fn sersic_mass_converges_to_total(mut ctx: ModelContext) {
    ctx.integration.gauss_order = 20;
    let params = galmass::profiles::SersicParams {
        central_intensity: 1_000.0,
        effective_radius: 500.0,
        index: 4.0,
        mass_to_light: 2.0,
    };
    let total = params.total_mass(ctx.integration.normalization).unwrap();
    let grid = RadialGrid::new(vec![100.0, 500.0, 5_000.0, 50_000.0, 500_000.0]).unwrap();
    let curve = galmass::profiles::sersic::evaluate(&params, SersicStrategy::Gauss, &grid, &ctx)
        .unwrap();
    // The outermost radius encloses almost all the light
    assert_relative_eq!(curve.mass[4], total, max_relative = 0.02);
    assert!(curve.mass[3] < curve.mass[4]);
}

#[rstest]
fn de_vaucouleurs_adaptive_is_quiet(ctx: ModelContext) {
    let grid = RadialGrid::new(vec![100.0, 1_000.0, 5_000.0]).unwrap();
    let curve = RadialProfile::SersicQuad
        .evaluate(&[1_000.0, 1_000.0, 4.0, 1.0], &grid, &ctx)
        .unwrap();
    assert!(curve.warnings.is_empty(), "{:?}", curve.warnings);
    assert!(curve.mass.windows(2).all(|m| m[0] < m[1]));

    let steep = RadialProfile::SersicQuad
        .evaluate(&[1_000.0, 1_000.0, 10.0, 1.0], &grid, &ctx)
        .unwrap();
    assert!(steep.warnings.is_empty(), "{:?}", steep.warnings);
}

#[rstest]
fn underflowing_gauss_rule_warns(ctx: ModelContext) {
    let grid = RadialGrid::new(vec![200.0, 1_000.0, 3_000.0]).unwrap();
    let curve = RadialProfile::SersicGauss
        .evaluate(&[1_000.0, 1_000.0, 1.0001, 1.0], &grid, &ctx)
        .unwrap();
    assert!(!curve.warnings.is_empty());
    assert!(curve.warnings.iter().all(|w| w.value == 0.0));
}
