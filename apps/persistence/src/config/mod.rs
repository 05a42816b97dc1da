pub mod db;
pub mod maintenance;
