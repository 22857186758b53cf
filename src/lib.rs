pub mod db;
pub mod eval;
pub mod report;
