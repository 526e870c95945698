//! 仿真核心模块
//!
//! 事件驱动仿真的核心组件：虚拟时间、事件、世界、仿真器，以及实验描述（JSON）。

mod config;
mod event;
mod simulator;
mod time;

pub use config::{
    ConfigError, DEFAULT_FAST_QUEUE_PKTS, DEFAULT_SLOW_QUEUE_PKTS, ExperimentSpec, FlowSpec, InterfaceEventKind, InterfaceEventSpec, LinkSpec,
    NodeKindSpec, NodeSpec, TopologySpec,
};
pub use event::{Event, World};
pub use simulator::{ScheduledEvent, Simulator};
pub use time::SimTime;
