//! 事件与世界接口
//!
//! 事件由仿真器按虚拟时间顺序执行；世界由网络层实现，事件通过 downcast 取回具体类型。

use super::simulator::Simulator;
use std::any::Any;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以便事件把 packet 等所有权交出去。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：由业务层实现（网络拓扑、路由表、统计）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完成后调用一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
