pub mod analyze;
pub mod bundle;
pub mod catalog;
pub mod compare;
pub mod init;
pub mod model;
pub mod pack;
pub mod recommend;
pub mod reset;
pub mod results;
pub mod select;
