use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 一台已发现设备的缓存记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// 架构类型（与布线标准中的 `arch_type` 对应）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "cache_time")]
    pub updated_at: Option<NaiveDateTime>,
    /// 其余任意字段原样保留
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl DeviceRecord {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            hostname: None,
            arch_type: None,
            vendor: None,
            updated_at: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_arch_type(mut self, arch_type: impl Into<String>) -> Self {
        self.arch_type = Some(arch_type.into());
        self
    }

    /// 报告与拓扑中使用的名字：优先 hostname，否则用地址
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.ip_address)
    }

    /// 用 `other` 中出现的字段覆盖本记录
    pub(crate) fn merge(&mut self, other: DeviceRecord) {
        if other.hostname.is_some() {
            self.hostname = other.hostname;
        }
        if other.arch_type.is_some() {
            self.arch_type = other.arch_type;
        }
        if other.vendor.is_some() {
            self.vendor = other.vendor;
        }
        if other.updated_at.is_some() {
            self.updated_at = other.updated_at;
        }
        self.extra.extend(other.extra);
    }
}

/// `updated_at` 的文本格式：`%Y-%m-%d %H:%M:%S`
mod cache_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(t: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match t {
            Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(d)?
            .map(|raw| {
                NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
