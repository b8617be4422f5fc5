pub mod choices;
pub mod sections;
pub mod submission;
pub mod unit;
