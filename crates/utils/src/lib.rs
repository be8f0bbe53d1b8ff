pub mod csv;
pub mod response;
