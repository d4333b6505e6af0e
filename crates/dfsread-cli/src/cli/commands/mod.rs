mod cat;
mod stat;

pub use cat::run_cat;
pub use stat::run_stat;
