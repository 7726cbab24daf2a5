pub mod ratings;
pub mod tech_specs;

pub use ratings::{scrape_car_ratings, RatingRecord};
pub use tech_specs::{scrape_car_tech_specs, EngineScope, TechSpecRecord};
