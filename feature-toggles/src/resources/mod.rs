pub mod feature;

pub use feature::FeatureResource;
