//! 实验描述（JSON）
//!
//! 拓扑、流量、接口事件都从一个 JSON 文件读入；缺省字段走 `#[serde(default)]`。

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

pub const DEFAULT_FAST_QUEUE_PKTS: u32 = 35;
pub const DEFAULT_SLOW_QUEUE_PKTS: u32 = 35;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read experiment file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid experiment json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema_version {0}")]
    SchemaVersion(u32),
    #[error("link {link} references unknown node {node}")]
    UnknownLinkNode { link: usize, node: usize },
    #[error("link {0} connects a node to itself")]
    SelfLoop(usize),
    #[error("flow {flow} references unknown node {node}")]
    UnknownFlowNode { flow: usize, node: usize },
    #[error("flow {flow}: node {node} has no interface {iface}")]
    UnknownFlowInterface { flow: usize, node: usize, iface: u32 },
    #[error("interface event {event} references unknown node {node}")]
    UnknownEventNode { event: usize, node: usize },
    #[error("interface event {0}: add_address requires `address`")]
    MissingAddress(usize),
    #[error("topology {0} has too many links for automatic addressing")]
    TooManyLinks(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub schema_version: u32,
    pub topology: TopologySpec,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
    #[serde(default)]
    pub interface_events: Vec<InterfaceEventSpec>,
    /// 接口 up/down、地址增删时是否重建全网路由表
    #[serde(default)]
    pub respond_to_interface_events: bool,
    #[serde(default)]
    pub until_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    /// 3x3 网格（12 条点到点链路，混合高/低带宽与短/长时延）
    Grid3x3 {
        #[serde(default)]
        fast_queue_pkts: Option<u32>,
        #[serde(default)]
        slow_queue_pkts: Option<u32>,
    },
    Custom {
        nodes: Vec<NodeSpec>,
        links: Vec<LinkSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: NodeKindSpec,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindSpec {
    #[default]
    Router,
    Host,
}

/// 双向点到点链路；两个方向各自一个出接口队列。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: usize,
    pub b: usize,
    pub latency_us: u64,
    pub bandwidth_mbps: u64,
    /// 路由距离（微秒）；缺省等于传播时延
    #[serde(default)]
    pub metric_us: Option<u32>,
    #[serde(default)]
    pub fast_queue_pkts: Option<u32>,
    #[serde(default)]
    pub slow_queue_pkts: Option<u32>,
}

impl LinkSpec {
    pub fn metric(&self) -> u32 {
        self.metric_us
            .unwrap_or_else(|| u32::try_from(self.latency_us).unwrap_or(u32::MAX))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    pub src: usize,
    pub dst: usize,
    /// 目的节点上作为目的地址的接口（缺省为第一个非环回接口）
    #[serde(default)]
    pub dst_iface: Option<u32>,
    #[serde(default)]
    pub start_ms: u64,
    pub stop_ms: u64,
    pub pkt_bytes: u32,
    pub pkts: u64,
    pub rate_mbps: f64,
    /// 端到端时延预算（微秒）；缺省为不带标签的尽力而为流量
    #[serde(default)]
    pub budget_us: Option<u32>,
    #[serde(default)]
    pub flag: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceEventKind {
    Up,
    Down,
    AddAddress,
    RemoveAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceEventSpec {
    pub node: usize,
    pub iface: u32,
    pub at_ms: u64,
    pub kind: InterfaceEventKind,
    #[serde(default)]
    pub address: Option<Ipv4Addr>,
    #[serde(default)]
    pub prefix_len: Option<u8>,
}

impl ExperimentSpec {
    pub const SCHEMA_VERSION: u32 = 1;

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let spec: ExperimentSpec = serde_json::from_str(raw)?;
        if spec.schema_version != Self::SCHEMA_VERSION {
            return Err(ConfigError::SchemaVersion(spec.schema_version));
        }
        Ok(spec)
    }

    /// 用命令行给出的容量覆盖所有出接口的快/慢子队列容量
    pub fn override_queue_capacities(&mut self, fast: Option<u32>, slow: Option<u32>) {
        let set = |slot: &mut Option<u32>, v: Option<u32>| {
            if v.is_some() {
                *slot = v;
            }
        };
        match &mut self.topology {
            TopologySpec::Grid3x3 {
                fast_queue_pkts,
                slow_queue_pkts,
            } => {
                set(fast_queue_pkts, fast);
                set(slow_queue_pkts, slow);
            }
            TopologySpec::Custom { links, .. } => {
                for l in links {
                    set(&mut l.fast_queue_pkts, fast);
                    set(&mut l.slow_queue_pkts, slow);
                }
            }
        }
    }

    /// 内置实验：3x3 网格上 n2->n6 的时延敏感目标流，加三条背景流。
    pub fn default_grid() -> Self {
        let mut flows = Vec::new();
        for i in 0..10u64 {
            let start_ms = i * 500;
            let stop_ms = start_ms + 500;
            flows.push(FlowSpec {
                src: 2,
                dst: 6,
                dst_iface: None,
                start_ms,
                stop_ms,
                pkt_bytes: 52,
                pkts: 1_000,
                rate_mbps: 2.0,
                budget_us: Some(30_000),
                flag: true,
            });
            let bg_rate = 1.0 + (i as f64 + 1.0) * 0.5;
            for (src, dst) in [(0, 6), (1, 7), (2, 8)] {
                flows.push(FlowSpec {
                    src,
                    dst,
                    dst_iface: None,
                    start_ms,
                    stop_ms,
                    pkt_bytes: 52,
                    pkts: 10_000,
                    rate_mbps: bg_rate,
                    budget_us: Some(20_000),
                    flag: false,
                });
            }
        }
        Self {
            schema_version: Self::SCHEMA_VERSION,
            topology: TopologySpec::Grid3x3 {
                fast_queue_pkts: None,
                slow_queue_pkts: None,
            },
            flows,
            interface_events: Vec::new(),
            respond_to_interface_events: false,
            until_ms: Some(10_000),
        }
    }
}
