mod laundry_world;
mod setups;
mod steps;

pub use laundry_world::LaundryWorld;
