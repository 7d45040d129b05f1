//! End-to-end runs of the integrator on the bundled solver

use approx::assert_relative_eq;
use feedback_core::analysis::analytic::stromgren_radius;
use feedback_core::simulation::{GridSetup, IntegratorConfig};
use feedback_core::sources::SupernovaSource;
use feedback_core::{
    FeedbackError, HydroGrid, Integrator, Saver, Source, PARSEC, SOLAR_MASS, YEAR,
};
use std::path::PathBuf;

#[ctor::ctor]
fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("feedback-core-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn setup(ncells: usize, rmax_pc: f64) -> GridSetup {
    GridSetup {
        ncells,
        rmax: rmax_pc * PARSEC,
        ..GridSetup::default()
    }
}

#[test]
fn test_sedov_blast_conserves_energy() {
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(256, 20.0)).unwrap();
    let background = integrator.grid().unwrap().total_energy();

    integrator.add_source(SupernovaSource::new(1e51, 5.0 * SOLAR_MASS, 0.0));
    for _ in 0..20 {
        integrator.step().unwrap();
    }

    assert!(integrator.time() > 0.0);
    assert!(integrator.sources().is_empty());
    let grid = integrator.grid().unwrap();
    assert_relative_eq!(grid.total_energy() - background, 1e51, max_relative = 1e-6);
    // The blast has left the innermost cell
    assert!(grid.velocity(1) > 0.0);
}

#[test]
fn test_wind_mass_is_conserved() {
    let mdot = 1e20;
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(128, 20.0)).unwrap();
    let initial = integrator.grid().unwrap().total_mass();

    integrator.add_source(Source::wind(1e36, mdot));
    for _ in 0..10 {
        integrator.step().unwrap();
    }

    // Each step deposits over the previous step's length
    let injected = mdot * (integrator.time() - integrator.dt());
    let grid = integrator.grid().unwrap();
    assert_relative_eq!(grid.total_mass(), initial + injected, max_relative = 1e-9);
    assert!(integrator.outflows().mass < 1e-9 * initial);
}

#[test]
fn test_wind_limits_the_timestep() {
    let (luminosity, mdot) = (1e36_f64, 1e20_f64);
    let wind_speed = (2.0 * luminosity / mdot).sqrt();
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(128, 20.0)).unwrap();
    let crossing = integrator.grid().unwrap().dx() / wind_speed;

    integrator.add_source(Source::wind(luminosity, mdot));
    for _ in 0..5 {
        integrator.step().unwrap();
        assert!(integrator.dt() <= crossing * (1.0 + 1e-9));
    }
}

#[test]
fn test_supernova_fires_on_time() {
    let trigger = 2.5e5 * YEAR;
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(64, 20.0)).unwrap();
    integrator.add_source(SupernovaSource::new(1e51, 0.0, trigger));

    let mut steps = 0;
    while !integrator.sources().is_empty() {
        integrator.step().unwrap();
        steps += 1;
        assert!(steps < 10_000, "supernova never fired");
    }

    // Injection happens at the start of the step that just ran
    let fired_at = integrator.time() - integrator.dt();
    assert_relative_eq!(fired_at, trigger, max_relative = 1e-6);
}

#[test]
fn test_front_settles_at_stromgren_radius() {
    let (qh, tion) = (1e49, 1e4);
    let mut config = IntegratorConfig::default();
    config.radiation.dust_cross_section = Some(0.0);
    config.radiation.radiation_pressure = false;
    let mut integrator = Integrator::with_config(config).unwrap();
    integrator.setup(&setup(512, 5.0)).unwrap();
    integrator.add_source(Source::simple_radiation(qh, tion));
    integrator.step().unwrap();

    let grid = integrator.grid().unwrap();
    let front = integrator.last_trace().unwrap().front_cell.unwrap();
    let expected = stromgren_radius(qh, 1000.0, tion);
    assert!((grid.position(front) - expected).abs() < 3.0 * grid.dx());
    assert_eq!(grid.xhii()[front / 2], 1.0);
    assert_eq!(grid.xhii()[front + 2], 0.0);
}

#[test]
fn test_temperature_floor_is_enforced() {
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(64, 20.0)).unwrap();
    integrator.set_cooling(true);
    integrator.set_temperature_floor(100.0);
    integrator.step().unwrap();

    let grid = integrator.grid().unwrap();
    for i in 0..grid.ncells() {
        assert!(grid.temperature(i) >= 100.0 * (1.0 - 1e-9));
    }
}

#[test]
fn test_step_before_setup_is_not_ready() {
    let mut integrator = Integrator::new().unwrap();
    assert!(matches!(integrator.step(), Err(FeedbackError::NotReady)));
    assert!(matches!(integrator.save("unused"), Err(FeedbackError::NotReady)));
}

#[test]
fn test_snapshot_restart_is_exact() {
    let dir = scratch_dir("restart");
    let path = dir.join("restart");

    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(64, 20.0)).unwrap();
    integrator.set_gravity(true);
    integrator.add_source(Source::wind(1e36, 1e20));
    integrator.add_source(Source::simple_radiation(1e49, 1e4));
    for _ in 0..5 {
        integrator.step().unwrap();
    }
    let saved_path = integrator.save(&path).unwrap();
    assert_eq!(saved_path.extension().unwrap(), "snap");

    let (time, dt, outflows) = (integrator.time(), integrator.dt(), integrator.outflows());
    let grid = integrator.grid().unwrap();
    let cells = |field: fn(&HydroGrid, usize) -> f64| -> Vec<f64> {
        (0..64).map(|i| field(grid, i)).collect()
    };
    let (density, velocity, pressure) = (
        cells(HydroGrid::density),
        cells(HydroGrid::velocity),
        cells(HydroGrid::pressure),
    );
    let (xhii, zsolar) = (grid.xhii().to_vec(), grid.zsolar().to_vec());
    drop(integrator);

    let mut restarted = Integrator::new().unwrap();
    restarted.load(&path).unwrap();
    assert_eq!(restarted.time(), time);
    assert_eq!(restarted.dt(), dt);
    assert_eq!(restarted.outflows(), outflows);
    assert!(restarted.config().gravity.enabled);
    let grid = restarted.grid().unwrap();
    for i in 0..64 {
        assert_eq!(grid.density(i), density[i]);
        assert_eq!(grid.velocity(i), velocity[i]);
        assert_eq!(grid.pressure(i), pressure[i]);
    }
    assert_eq!(grid.xhii(), xhii.as_slice());
    assert_eq!(grid.zsolar(), zsolar.as_slice());
    assert!(grid.xhii()[0] > 0.0);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_rebuilds_mismatched_grid() {
    let dir = scratch_dir("mismatch");
    let path = dir.join("small.snap");
    {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&setup(64, 10.0)).unwrap();
        integrator.save(&path).unwrap();
    }

    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(128, 20.0)).unwrap();
    integrator.add_source(Source::wind(1e36, 1e20));
    integrator.load(&path).unwrap();

    let grid = integrator.grid().unwrap();
    assert_eq!(grid.ncells(), 64);
    assert_relative_eq!(grid.rmax(), 10.0 * PARSEC, max_relative = 1e-12);
    assert!(integrator.sources().is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_saver_lands_on_exact_times() {
    let dir = scratch_dir("saver");
    let interval = 1e11;
    let mut integrator = Integrator::new().unwrap();
    integrator.setup(&setup(64, 20.0)).unwrap();
    integrator.add_saver(
        Saver::new(&dir)
            .with_interval(interval)
            .with_exact_times(true),
    );
    for _ in 0..4 {
        integrator.step().unwrap();
    }

    assert_relative_eq!(integrator.time(), 4.0 * interval, max_relative = 1e-6);
    for n in 1..=4 {
        assert!(dir.join(format!("snapshot_{n:05}.snap")).exists());
    }
    assert!(!dir.join("snapshot_00005.snap").exists());

    std::fs::remove_dir_all(&dir).ok();
}
