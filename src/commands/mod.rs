pub mod run;

#[cfg(feature = "dashboard")]
pub mod dashboard;
