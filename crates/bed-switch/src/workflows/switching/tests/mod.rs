mod common;
mod rate_limit;
