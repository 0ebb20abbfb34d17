pub mod generate_tangents;
pub mod geometry;
pub mod materials;
