pub mod aggregate;
pub mod attenuation;
pub mod bands;
pub mod batch;
pub mod emission;
pub mod paths;
pub mod profile;
