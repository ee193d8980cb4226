pub mod assignment;
pub mod attempt;
pub mod question;
pub mod test_def;
