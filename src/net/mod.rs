//! 网络模拟模块
//!
//! 节点、接口与出队列、链路、带标签的数据包，以及把它们串起来的网络拓扑。

// 子模块声明
mod id;
mod tags;
mod packet;
mod interface;
mod node;
mod link;
mod stats;
mod network;
mod deliver_packet;
mod net_world;
mod link_ready;
mod interface_event;

// 重新导出公共接口
pub use id::{IfIndex, LinkId, NodeId};
pub use tags::{PRIORITY_HIGH, PRIORITY_LOW, PacketTags, TagError, TagType};
pub use packet::Packet;
pub use interface::{Interface, InterfaceList};
pub use node::{Host, Node, NodeKind, Router};
pub use link::{Link, LinkOpts, QueueConfig};
pub use stats::{DropReason, Stats};
pub use network::Network;
pub use deliver_packet::DeliverPacket;
pub use net_world::NetWorld;
pub use link_ready::LinkReady;
pub use interface_event::InterfaceEvent;
