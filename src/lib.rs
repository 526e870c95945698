pub mod app;
pub mod net;
pub mod queue;
pub mod routing;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
