pub mod cache;
pub mod config;
pub mod net;
pub mod report;
pub mod topo;

#[cfg(test)]
mod test;
