pub mod routes;
pub mod run;
pub mod ticker;
