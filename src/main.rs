use anyhow::Result;
use tracing_subscriber::EnvFilter;

use trafficnoise::sim::emission::{EmissionUnit, LineSource};
use trafficnoise::{
    BandSet, BatchRunner, EmissionModel, Height, Point, Polygon, PropagationConfig, Receiver,
    RoadSegmentContext, VehicleCategory, VehicleFlow,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Street canyon: 200 m road between two building rows.");

    let mut config = PropagationConfig::new();
    config.max_reflection_order = 1;
    config.horizontal_diffraction = true;
    config.default_ground_absorption = 0.5;
    config.favourable_probability = 0.5;

    // Environment
    let mut profile = config.new_profile()?;
    profile.add_building(
        Polygon::rectangle(-100.0, 10.0, 100.0, 22.0)?,
        Height::Relative(15.0),
        Some(0.1),
    )?;
    profile.add_building(
        Polygon::rectangle(-100.0, -22.0, -5.0, -10.0)?,
        Height::Relative(12.0),
        None,
    )?;
    profile.add_building(
        Polygon::rectangle(5.0, -22.0, 100.0, -10.0)?,
        Height::Relative(12.0),
        None,
    )?;
    profile.add_ground_area(Polygon::rectangle(-100.0, -80.0, 100.0, -22.0)?, 1.0)?;
    profile.add_topographic_line(&[Point::new(-150.0, -100.0, 0.0), Point::new(150.0, -100.0, -2.0)])?;
    profile.add_topographic_line(&[Point::new(-150.0, 100.0, 0.0), Point::new(150.0, 100.0, 0.0)])?;
    profile.finish_building();

    // Emission
    let model = EmissionModel::new(BandSet::Octave).with_unit(EmissionUnit::PerMetre);
    let ctx = RoadSegmentContext::new();
    let flows = [
        VehicleFlow::new(VehicleCategory::Light, 50.0, 900.0)?,
        VehicleFlow::new(VehicleCategory::Medium, 50.0, 40.0)?,
        VehicleFlow::new(VehicleCategory::Heavy, 50.0, 20.0)?,
        VehicleFlow::new(VehicleCategory::HeavyTwoWheeler, 50.0, 10.0)?,
    ];
    let per_metre = model.evaluate_all(&flows, &ctx)?;
    let road = LineSource::new(
        vec![Point::new(-100.0, 0.0, 0.0), Point::new(100.0, 0.0, 0.0)],
        per_metre,
        ctx.source_height,
    )?;
    let sources = road.discretize(10.0, &profile)?;
    println!("Road emission: {} point sources", sources.len());

    // Receivers: one in the canyon, one behind the gap, one in the back yard
    let receivers = vec![
        Receiver::new(1, Point::new(0.0, 8.0, 4.0)),
        Receiver::new(2, Point::new(0.0, -40.0, 4.0)),
        Receiver::new(3, Point::new(50.0, -40.0, 4.0)),
    ];

    let runner = BatchRunner::new(config, &profile)?;
    let report = runner.run(&sources, &receivers)?;
    for (id, result) in &report.results {
        println!(
            "Receiver {}: {:.1} dB(A) from {} paths",
            id,
            result.laeq,
            result.contributions.len()
        );
    }
    for (id, failure) in &report.failures {
        println!("Receiver {} failed: {}", id, failure);
    }

    Ok(())
}
