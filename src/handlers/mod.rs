pub mod assessment;
pub mod review;
