// Technical indicators module
// Rolling simple moving average

pub mod moving_average;

pub use moving_average::MovingAverageTracker;
