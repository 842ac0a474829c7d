// MongoDB Change Stream購読
//
// ソースコレクションのChange Streamを開き、ドライバーのイベントを
// ドメインのChangeEventに変換して返す。マネージドトリガーを使わない環境向け。

use bson::Document;
use futures::TryStreamExt;
use mongodb::change_stream::ChangeStream;
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType as MongoOperationType};
use tracing::debug;

use super::database::DatabaseError;
use super::mongo_database::MongoTaskDatabase;
use crate::domain::{ChangeEvent, ID_FIELD, OperationType, SourceId};

/// Change Streamから取り出した1件
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// ハンドラーに渡すイベント
    Event(ChangeEvent),
    /// 変換できなかったイベント（理由を含む）
    Skipped(String),
}

/// ソースコレクションのChange Stream
pub struct SourceChangeStream {
    stream: ChangeStream<ChangeStreamEvent<Document>>,
}

impl SourceChangeStream {
    /// ソースコレクションのChange Streamを開く
    pub async fn open(
        database: &MongoTaskDatabase,
        source_collection: &str,
    ) -> Result<Self, DatabaseError> {
        let stream = database
            .database()
            .collection::<Document>(source_collection)
            .watch()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        debug!(collection = source_collection, "Change Streamを開始");
        Ok(Self { stream })
    }

    /// 次のイベントを待つ（ストリーム終了時はNone）
    pub async fn next_item(&mut self) -> Result<Option<StreamItem>, DatabaseError> {
        let event = self
            .stream
            .try_next()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(event.map(|event| {
            match change_event_from_stream(&event.operation_type, event.document_key.as_ref()) {
                Ok(change_event) => StreamItem::Event(change_event),
                Err(reason) => StreamItem::Skipped(reason),
            }
        }))
    }
}

/// ドライバーのイベント要素をChangeEventに変換
///
/// `documentKey`がない（drop/invalidate等）、または`_id`が対応外の型の場合はErr(理由)。
pub fn change_event_from_stream(
    operation_type: &MongoOperationType,
    document_key: Option<&Document>,
) -> Result<ChangeEvent, String> {
    let operation_type = match operation_type {
        MongoOperationType::Insert => OperationType::Insert,
        MongoOperationType::Update => OperationType::Update,
        MongoOperationType::Replace => OperationType::Replace,
        MongoOperationType::Delete => OperationType::Delete,
        MongoOperationType::Drop => OperationType::Other("drop".to_string()),
        MongoOperationType::Rename => OperationType::Other("rename".to_string()),
        MongoOperationType::DropDatabase => OperationType::Other("dropDatabase".to_string()),
        MongoOperationType::Invalidate => OperationType::Other("invalidate".to_string()),
        MongoOperationType::Other(name) => OperationType::Other(name.clone()),
        // ドライバーが追加した種別はバリアント名の先頭を小文字化（createIndexes等）
        other => OperationType::Other(lower_camel_case(&format!("{:?}", other))),
    };

    let document_key = document_key.ok_or_else(|| {
        format!(
            "documentKeyがありません (operationType: {})",
            operation_type.as_str()
        )
    })?;

    let id = document_key
        .get(ID_FIELD)
        .ok_or_else(|| "documentKeyに_idがありません".to_string())?;

    let source_id =
        SourceId::from_bson(id).ok_or_else(|| format!("対応していない_idの型: {:?}", id))?;

    Ok(ChangeEvent::new(operation_type, source_id))
}

fn lower_camel_case(variant: &str) -> String {
    let mut chars = variant.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
