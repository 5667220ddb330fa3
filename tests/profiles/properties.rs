use galmass::{ModelContext, RadialGrid, RadialProfile};
use rstest::*;

#[fixture]
fn ctx() -> ModelContext {
    crate::init_logger();
    crate::default_context()
}

#[fixture]
fn grid() -> RadialGrid {
    RadialGrid::new(vec![
        0.0, 10.0, 100.0, 500.0, 1_000.0, 2_000.0, 5_000.0, 10_000.0, 20_000.0,
    ])
    .unwrap()
}

fn typical_params(profile: RadialProfile) -> Vec<f64> {
    match profile {
        RadialProfile::Disk => vec![1_000.0, 1_000.0, 1.0],
        RadialProfile::Jaffe
        | RadialProfile::Hernquist
        | RadialProfile::Nfw
        | RadialProfile::Isothermal
        | RadialProfile::PseudoIsothermal => vec![0.01, 1_000.0],
        RadialProfile::HaloHernquist => vec![1e11, 1_000.0, 5_000.0],
        RadialProfile::BulgeHernquist => vec![1e10, 500.0],
        RadialProfile::NfwM200 => vec![10.0, 1e12, 70.0],
        RadialProfile::SersicQuad | RadialProfile::SersicGauss => vec![1_000.0, 1_000.0, 2.0, 1.0],
    }
}

#[rstest]
fn center_monotone_and_positive(ctx: ModelContext, grid: RadialGrid) {
    for profile in enum_iterator::all::<RadialProfile>() {
        let curve = profile
            .evaluate(&typical_params(profile), &grid, &ctx)
            .unwrap();
        assert_eq!(curve.len(), grid.len(), "{profile}");
        assert_eq!(curve.mass[0], 0.0, "{profile}: mass at the center");
        assert_eq!(curve.v_squared[0], 0.0, "{profile}: V^2 at the center");
        for (i, pair) in curve.mass.windows(2).enumerate() {
            assert!(
                pair[1] >= pair[0],
                "{profile}: mass decreases between radius #{i} and #{}",
                i + 1
            );
        }
        for v2 in &curve.v_squared {
            assert!(v2.is_finite() && *v2 >= 0.0, "{profile}: V^2 = {v2}");
        }
        // The outermost radius encloses some mass for every profile
        assert!(curve.mass[grid.len() - 1] > 0.0, "{profile}");
    }
}

#[rstest]
fn invalid_parameters_fail_fast(ctx: ModelContext, grid: RadialGrid) {
    for profile in enum_iterator::all::<RadialProfile>() {
        let mut params = typical_params(profile);
        // Every profile has a strictly positive scale in its second slot
        params[1] = -1.0;
        assert!(
            profile.evaluate(&params, &grid, &ctx).is_err(),
            "{profile} accepted a negative scale"
        );
        assert!(
            profile.evaluate(&params[..1], &grid, &ctx).is_err(),
            "{profile} accepted a single parameter"
        );
    }
}

#[rstest]
fn duplicated_radii(ctx: ModelContext) {
    let grid = RadialGrid::new(vec![0.0, 0.0, 1_000.0, 1_000.0, 3_000.0]).unwrap();
    for profile in [RadialProfile::SersicGauss, RadialProfile::Disk] {
        let curve = profile
            .evaluate(&typical_params(profile), &grid, &ctx)
            .unwrap();
        assert_eq!(curve.mass[1], 0.0);
        assert_eq!(curve.mass[2], curve.mass[3], "{profile}");
        assert!(curve.mass[4] > curve.mass[3]);
    }
}
