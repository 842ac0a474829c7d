//! Change Event ドメインモデル
//!
//! ソースコレクション（TaskV2）のChange Streamが発行する変更通知。
//! ハンドラーが参照するのは`operationType`と`documentKey._id`のみで、
//! `fullDocument`や`ns`などその他のフィールドは無視する。

use serde::{Deserialize, Serialize};

use super::source_id::SourceId;

/// Change Eventの操作種別
///
/// ハンドラーが区別するのは`Delete`かそれ以外かのみ。
/// 未知の操作種別は`Other`として保持し、削除ではないものとして扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationType {
    Insert,
    Update,
    Replace,
    Delete,
    /// drop / invalidate / rename など
    Other(String),
}

impl OperationType {
    /// 操作種別名（Change Streamの`operationType`表記）
    pub fn as_str(&self) -> &str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Update => "update",
            OperationType::Replace => "replace",
            OperationType::Delete => "delete",
            OperationType::Other(name) => name,
        }
    }
}

impl From<String> for OperationType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "insert" => OperationType::Insert,
            "update" => OperationType::Update,
            "replace" => OperationType::Replace,
            "delete" => OperationType::Delete,
            _ => OperationType::Other(name),
        }
    }
}

impl From<OperationType> for String {
    fn from(operation_type: OperationType) -> Self {
        operation_type.as_str().to_string()
    }
}

/// 変更されたドキュメントのキー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKey {
    /// ソースレコードの`_id`（型を保持）
    #[serde(rename = "_id")]
    pub id: SourceId,
}

/// Change Event
///
/// 永続化されない一時的な通知。1イベントにつきハンドラーが1回呼び出される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// 操作種別
    pub operation_type: OperationType,
    /// 変更されたドキュメントのキー
    pub document_key: DocumentKey,
}

impl ChangeEvent {
    /// 新しいChangeEventを作成
    pub fn new(operation_type: OperationType, source_id: impl Into<SourceId>) -> Self {
        Self {
            operation_type,
            document_key: DocumentKey {
                id: source_id.into(),
            },
        }
    }

    /// 削除イベントかどうか
    pub fn is_delete(&self) -> bool {
        self.operation_type == OperationType::Delete
    }

    /// ソースレコードの`_id`
    pub fn source_id(&self) -> &SourceId {
        &self.document_key.id
    }
}
