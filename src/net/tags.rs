//! 数据包元数据标签
//!
//! 每个数据包可携带五种标签：类别标志、时延预算、发送时间戳、优先级、剩余距离。
//! 标签缺失（`None`）与取值为 0 是两回事，线格式上也能区分：
//! 标签表编码为若干 `[类型字节][定长大端负载]`，未携带的标签不出现。
//!
//! 定长负载：flag/budget/priority/distance 各 4 字节，timestamp 8 字节。

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

pub const PRIORITY_LOW: u8 = 0;
pub const PRIORITY_HIGH: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("truncated tag buffer: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("unknown tag type {0}")]
    UnknownType(u8),
    #[error("duplicate {0:?} tag")]
    Duplicate(TagType),
    #[error("invalid value {value} for {tag:?} tag")]
    InvalidValue { tag: TagType, value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagType {
    Flag = 1,
    Budget = 2,
    Timestamp = 3,
    Priority = 4,
    Distance = 5,
}

impl TagType {
    /// 负载长度（不含类型字节）
    pub const fn serialized_size(self) -> usize {
        match self {
            TagType::Timestamp => 8,
            _ => 4,
        }
    }

    fn from_wire(b: u8) -> Option<TagType> {
        match b {
            1 => Some(TagType::Flag),
            2 => Some(TagType::Budget),
            3 => Some(TagType::Timestamp),
            4 => Some(TagType::Priority),
            5 => Some(TagType::Distance),
            _ => None,
        }
    }
}

/// 数据包携带的标签集合。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketTags {
    /// 区分时延约束流与背景流的类别标志
    pub flag: Option<bool>,
    /// 端到端时延预算（微秒），源端写入后不再修改
    pub budget_us: Option<u32>,
    /// 发送时刻（虚拟时钟，微秒）
    pub timestamp_us: Option<u64>,
    /// 0 = 低，1 = 高；每一跳重新计算
    pub priority: Option<u8>,
    /// 上一跳选中路由的剩余距离（微秒）
    pub distance_us: Option<u32>,
}

impl PacketTags {
    /// 源端为时延约束流打上的初始标签
    pub fn deadline(flag: bool, budget_us: u32, timestamp_us: u64) -> Self {
        Self {
            flag: Some(flag),
            budget_us: Some(budget_us),
            timestamp_us: Some(timestamp_us),
            priority: None,
            distance_us: None,
        }
    }

    /// flag/budget/timestamp 三者齐全
    pub fn has_deadline_set(&self) -> bool {
        self.flag.is_some() && self.budget_us.is_some() && self.timestamp_us.is_some()
    }

    /// 是否走预算感知的选路：三者齐全且预算非零
    pub fn wants_budget_routing(&self) -> bool {
        self.has_deadline_set() && self.budget_us != Some(0)
    }

    /// 绝对截止时刻（微秒）
    pub fn deadline_us(&self) -> Option<u64> {
        let budget = self.budget_us?;
        let ts = self.timestamp_us?;
        Some(ts.saturating_add(budget as u64))
    }

    /// `timestamp + budget - now`；可能为负（已超时），超出 i64 范围时饱和
    pub fn slack_us(&self, now_us: u64) -> Option<i64> {
        let deadline = self.deadline_us()?;
        let slack = deadline as i128 - now_us as i128;
        Some(slack.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == Some(PRIORITY_HIGH)
    }

    fn present(&self) -> impl Iterator<Item = TagType> + '_ {
        [
            (TagType::Flag, self.flag.is_some()),
            (TagType::Budget, self.budget_us.is_some()),
            (TagType::Timestamp, self.timestamp_us.is_some()),
            (TagType::Priority, self.priority.is_some()),
            (TagType::Distance, self.distance_us.is_some()),
        ]
        .into_iter()
        .filter_map(|(t, p)| p.then_some(t))
    }

    /// 编码后的字节数
    pub fn encoded_len(&self) -> usize {
        self.present().map(|t| 1 + t.serialized_size()).sum()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        if let Some(flag) = self.flag {
            buf.put_u8(TagType::Flag as u8);
            buf.put_u32(flag as u32);
        }
        if let Some(budget) = self.budget_us {
            buf.put_u8(TagType::Budget as u8);
            buf.put_u32(budget);
        }
        if let Some(ts) = self.timestamp_us {
            buf.put_u8(TagType::Timestamp as u8);
            buf.put_u64(ts);
        }
        if let Some(prio) = self.priority {
            buf.put_u8(TagType::Priority as u8);
            buf.put_u32(prio as u32);
        }
        if let Some(dist) = self.distance_us {
            buf.put_u8(TagType::Distance as u8);
            buf.put_u32(dist);
        }
    }

    /// 解码整个缓冲区；同一类型出现两次视为错误。
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, TagError> {
        let mut tags = PacketTags::default();
        while buf.has_remaining() {
            let raw = buf.get_u8();
            let ty = TagType::from_wire(raw).ok_or(TagError::UnknownType(raw))?;
            let need = ty.serialized_size();
            if buf.remaining() < need {
                return Err(TagError::Truncated {
                    need,
                    have: buf.remaining(),
                });
            }
            match ty {
                TagType::Flag => {
                    let v = buf.get_u32();
                    let flag = match v {
                        0 => false,
                        1 => true,
                        value => return Err(TagError::InvalidValue { tag: ty, value }),
                    };
                    set_once(&mut tags.flag, flag, ty)?;
                }
                TagType::Budget => set_once(&mut tags.budget_us, buf.get_u32(), ty)?,
                TagType::Timestamp => set_once(&mut tags.timestamp_us, buf.get_u64(), ty)?,
                TagType::Priority => {
                    let v = buf.get_u32();
                    if v > PRIORITY_HIGH as u32 {
                        return Err(TagError::InvalidValue { tag: ty, value: v });
                    }
                    set_once(&mut tags.priority, v as u8, ty)?;
                }
                TagType::Distance => set_once(&mut tags.distance_us, buf.get_u32(), ty)?,
            }
        }
        Ok(tags)
    }
}

fn set_once<T>(slot: &mut Option<T>, v: T, ty: TagType) -> Result<(), TagError> {
    if slot.is_some() {
        return Err(TagError::Duplicate(ty));
    }
    *slot = Some(v);
    Ok(())
}

impl fmt::Display for PacketTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = self.flag {
            parts.push(format!("Flag = {v}"));
        }
        if let Some(v) = self.budget_us {
            parts.push(format!("Budget = {v}"));
        }
        if let Some(v) = self.timestamp_us {
            parts.push(format!("Timestamp = {v}"));
        }
        if let Some(v) = self.priority {
            parts.push(format!("Priority = {v}"));
        }
        if let Some(v) = self.distance_us {
            parts.push(format!("Distance = {v}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}
