//! 设备清单缓存
//!
//! 以网络地址为键，把已发现的设备记录保存在一个 YAML 文件中。
//! 每次修改后立即写回文件；记录带有更新时间，用于判断缓存是否足够新。

mod record;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use record::DeviceRecord;

/// 缓存文件内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheDocument {
    pub version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub switches: Vec<DeviceRecord>,
}

fn null_as_empty<'de, D>(d: D) -> Result<Vec<DeviceRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DeviceRecord>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cache file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IP address {ip} not in cache")]
    Miss { ip: String },

    #[error("IP address {ip} was cached {age_minutes} minute(s) ago, older than {max_minutes}")]
    Stale {
        ip: String,
        age_minutes: i64,
        max_minutes: i64,
    },
}

/// YAML 文件支撑的设备缓存
#[derive(Debug)]
pub struct InventoryCache {
    path: PathBuf,
    doc: CacheDocument,
}

impl InventoryCache {
    /// 打开缓存文件；文件不存在时创建一个空缓存并写盘
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            let doc: CacheDocument = serde_yaml::from_str(&raw)?;
            debug!(path = %path.display(), records = doc.switches.len(), "载入缓存");
            return Ok(Self { path, doc });
        }

        let cache = Self {
            path,
            doc: CacheDocument {
                version: env!("CARGO_PKG_VERSION").to_string(),
                switches: Vec::new(),
            },
        };
        cache.save()?;
        info!(path = %cache.path.display(), "创建新的缓存文件");
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.doc.switches
    }

    fn position(&self, ip: &str) -> Option<usize> {
        self.doc.switches.iter().position(|r| r.ip_address == ip)
    }

    pub fn exists(&self, ip: &str) -> bool {
        self.position(ip).is_some()
    }

    pub fn get(&self, ip: &str) -> Result<&DeviceRecord, CacheError> {
        self.position(ip)
            .map(|idx| &self.doc.switches[idx])
            .ok_or_else(|| CacheError::Miss { ip: ip.to_string() })
    }

    /// 写入一条记录（更新时间取当前本地时间）
    pub fn put(&mut self, record: DeviceRecord) -> Result<(), CacheError> {
        self.put_at(record, Local::now().naive_local())
    }

    /// 写入一条记录：地址已存在时合并字段，否则追加；随后写盘
    pub fn put_at(
        &mut self,
        mut record: DeviceRecord,
        now: NaiveDateTime,
    ) -> Result<(), CacheError> {
        record.updated_at = Some(now);
        match self.position(&record.ip_address) {
            Some(idx) => {
                debug!(ip = %record.ip_address, "更新缓存记录");
                self.doc.switches[idx].merge(record);
            }
            None => {
                debug!(ip = %record.ip_address, "新增缓存记录");
                self.doc.switches.push(record);
            }
        }
        self.save()
    }

    /// 删除一条记录并写盘
    pub fn remove(&mut self, ip: &str) -> Result<DeviceRecord, CacheError> {
        let idx = self
            .position(ip)
            .ok_or_else(|| CacheError::Miss { ip: ip.to_string() })?;
        let removed = self.doc.switches.remove(idx);
        self.save()?;
        Ok(removed)
    }

    pub fn is_fresh_within(&self, ip: &str, max_age: Duration) -> bool {
        self.is_fresh_within_at(ip, max_age, Local::now().naive_local())
    }

    /// 记录存在且 `now - updated_at < max_age`
    pub fn is_fresh_within_at(&self, ip: &str, max_age: Duration, now: NaiveDateTime) -> bool {
        self.get(ip)
            .ok()
            .and_then(|r| r.updated_at)
            .is_some_and(|t| now - t < max_age)
    }

    /// 取一条足够新的记录
    pub fn get_fresh(&self, ip: &str, max_age: Duration) -> Result<&DeviceRecord, CacheError> {
        self.get_fresh_at(ip, max_age, Local::now().naive_local())
    }

    pub fn get_fresh_at(
        &self,
        ip: &str,
        max_age: Duration,
        now: NaiveDateTime,
    ) -> Result<&DeviceRecord, CacheError> {
        let record = self.get(ip)?;
        if self.is_fresh_within_at(ip, max_age, now) {
            return Ok(record);
        }
        let age_minutes = record
            .updated_at
            .map_or(i64::MAX, |t| (now - t).num_minutes());
        Err(CacheError::Stale {
            ip: ip.to_string(),
            age_minutes,
            max_minutes: max_age.num_minutes(),
        })
    }

    fn save(&self) -> Result<(), CacheError> {
        let raw = serde_yaml::to_string(&self.doc)?;
        fs::write(&self.path, raw).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
