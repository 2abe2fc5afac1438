pub mod material;
pub mod rules;
