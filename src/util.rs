pub mod date;
pub mod decimal;
pub mod rc;
pub mod sys;
