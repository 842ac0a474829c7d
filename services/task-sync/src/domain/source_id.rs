//! ソースレコードの`_id`
//!
//! TaskV2の`_id`は文字列・ObjectId・整数のいずれかで届く。
//! 再読み込み時の`$match`は型を保ったまま行い、整数IDへの変換時のみ文字列表現を使う。

use std::fmt;

use bson::Bson;
use bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::task_id::TaskId;

/// ソースレコードの`_id`（型付き）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// 文字列ID
    Text(String),
    /// ObjectId
    ObjectId(ObjectId),
    /// 整数ID
    Int(i64),
}

impl SourceId {
    /// BSON値から作成（対応外の型はNone）
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::String(s) => Some(SourceId::Text(s.clone())),
            Bson::ObjectId(oid) => Some(SourceId::ObjectId(*oid)),
            Bson::Int32(n) => Some(SourceId::Int(i64::from(*n))),
            Bson::Int64(n) => Some(SourceId::Int(*n)),
            _ => None,
        }
    }

    /// 文字列表現（ObjectIdは16進文字列、`$toString`と同じ）
    pub fn to_text(&self) -> String {
        match self {
            SourceId::Text(s) => s.clone(),
            SourceId::ObjectId(oid) => oid.to_hex(),
            SourceId::Int(n) => n.to_string(),
        }
    }

    /// ターゲットの整数IDへ変換
    pub fn to_task_id(&self) -> TaskId {
        TaskId::parse_leading_int(&self.to_text())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        SourceId::Text(id.to_string())
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        SourceId::Text(id)
    }
}

impl From<ObjectId> for SourceId {
    fn from(id: ObjectId) -> Self {
        SourceId::ObjectId(id)
    }
}

impl From<i64> for SourceId {
    fn from(id: i64) -> Self {
        SourceId::Int(id)
    }
}

impl From<&SourceId> for Bson {
    fn from(id: &SourceId) -> Self {
        match id {
            SourceId::Text(s) => Bson::String(s.clone()),
            SourceId::ObjectId(oid) => Bson::ObjectId(*oid),
            SourceId::Int(n) => Bson::Int64(*n),
        }
    }
}

/// JSON上の表現
///
/// - 文字列: `"42"`
/// - Extended JSONのObjectId: `{"$oid": "65a1..."}`
/// - 整数: `42`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSourceId {
    Text(String),
    ObjectId {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Integer(i64),
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            SourceId::Text(s) => RawSourceId::Text(s.clone()),
            SourceId::ObjectId(oid) => RawSourceId::ObjectId { oid: oid.to_hex() },
            SourceId::Int(n) => RawSourceId::Integer(*n),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawSourceId::deserialize(deserializer)? {
            RawSourceId::Text(text) => SourceId::Text(text),
            RawSourceId::ObjectId { oid } => ObjectId::parse_str(&oid)
                .map(SourceId::ObjectId)
                .map_err(serde::de::Error::custom)?,
            RawSourceId::Integer(n) => SourceId::Int(n),
        })
    }
}
