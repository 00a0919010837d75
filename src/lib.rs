pub mod error;
pub mod geom;
pub mod sim;

// Prelude
pub use error::NoiseError;
pub use geom::point::Point;
pub use geom::polygon::Polygon;
pub use geom::vector::Vector;
pub use sim::aggregate::{LevelAggregator, ReceiverResult};
pub use sim::attenuation::{
    AtmosphericConditions, AttenuationCalculator, AttenuationComponents, FavourableConditions,
};
pub use sim::bands::{BandSet, Spectrum};
pub use sim::batch::{BatchReport, BatchRunner, PropagationConfig, Receiver};
pub use sim::emission::{EmissionModel, PointSource, RoadSegmentContext, VehicleCategory, VehicleFlow};
pub use sim::paths::{PathFinder, PathKind, PathOptions, PropagationPath};
pub use sim::profile::{Height, Profile};
