// Domain layer: listing records, rate snapshots and the ports the pipeline talks through.

pub mod model;
pub mod ports;
