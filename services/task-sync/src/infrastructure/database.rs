/// ドキュメントデータベースのコラボレーター抽象
///
/// ハンドラーが必要とする2つの操作（IDによる1件削除、パイプライン実行）のみを定義する。
/// 接続・認証・トランザクションは実装側の責務。
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Pipeline, TaskId};

/// データベース操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatabaseError {
    /// 接続に失敗
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// 削除に失敗
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// パイプライン実行に失敗（マージ時の制約違反を含む）
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// 削除結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    /// 削除したドキュメント数（0または1）
    pub deleted_count: u64,
}

/// パイプライン実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// マージしたドキュメント数
    ///
    /// サーバー側の`$merge`は件数を返さないため、MongoDB実装では常にNone。
    pub merged_count: Option<u64>,
}

/// ドキュメントデータベース操作用トレイト
///
/// 異なる実装を可能にします（実際のMongoDB、テスト用モック）。
#[async_trait]
pub trait TaskDatabase: Send + Sync {
    /// `_id == id`のドキュメントを最大1件削除
    ///
    /// 該当ドキュメントが存在しない場合は`deleted_count == 0`で成功。
    async fn delete_one(&self, collection: &str, id: TaskId)
    -> Result<DeleteResult, DatabaseError>;

    /// `collection`を入力としてパイプラインを実行
    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<PipelineResult, DatabaseError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{SourceId, Stage};
    use bson::oid::ObjectId;
    use bson::{Bson, Document, doc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // ==================== モックデータベース ====================

    /// モックに対して実行された操作
    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOperation {
        DeleteOne { collection: String, id: TaskId },
        RunPipeline { collection: String, pipeline: Pipeline },
    }

    /// ユニットテスト用のモックTaskDatabase
    ///
    /// ステージ記述子をメモリ上で評価する。`_id`の比較はドキュメントストアと同様に
    /// 数値型をまたいで行い、NaNはNaNと一致する。
    #[derive(Debug, Clone, Default)]
    pub struct MockTaskDatabase {
        /// コレクション名 -> ドキュメント列
        collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
        /// 実行された操作の履歴
        operations: Arc<Mutex<Vec<RecordedOperation>>>,
        /// 次の操作で返すエラー（エラーパスのテスト用）
        next_error: Arc<Mutex<Option<DatabaseError>>>,
    }

    impl MockTaskDatabase {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_document(&self, collection: &str, document: Document) {
            self.collections
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(document);
        }

        pub fn documents(&self, collection: &str) -> Vec<Document> {
            self.collections
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }

        pub fn find_by_id(&self, collection: &str, id: TaskId) -> Option<Document> {
            let key = Bson::from(id);
            self.documents(collection)
                .into_iter()
                .find(|d| d.get("_id").is_some_and(|v| keys_equal(v, &key)))
        }

        pub fn operations(&self) -> Vec<RecordedOperation> {
            self.operations.lock().unwrap().clone()
        }

        pub fn set_next_error(&self, error: DatabaseError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        fn take_error(&self) -> Option<DatabaseError> {
            self.next_error.lock().unwrap().take()
        }

        fn record(&self, operation: RecordedOperation) {
            self.operations.lock().unwrap().push(operation);
        }
    }

    /// `_id`の等価比較（数値型をまたぐ、NaN同士は一致）
    fn keys_equal(a: &Bson, b: &Bson) -> bool {
        match (TaskId::from_bson(a), TaskId::from_bson(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }

    /// `$toString`相当の文字列化
    fn bson_to_text(value: &Bson) -> String {
        match value {
            Bson::String(s) => s.clone(),
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::Int32(n) => n.to_string(),
            Bson::Int64(n) => n.to_string(),
            Bson::Null => String::new(),
            other => other.to_string(),
        }
    }

    #[async_trait]
    impl TaskDatabase for MockTaskDatabase {
        async fn delete_one(
            &self,
            collection: &str,
            id: TaskId,
        ) -> Result<DeleteResult, DatabaseError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            self.record(RecordedOperation::DeleteOne {
                collection: collection.to_string(),
                id,
            });

            let key = Bson::from(id);
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();

            let position = documents
                .iter()
                .position(|d| d.get("_id").is_some_and(|v| keys_equal(v, &key)));

            match position {
                Some(index) => {
                    documents.remove(index);
                    Ok(DeleteResult { deleted_count: 1 })
                }
                None => Ok(DeleteResult { deleted_count: 0 }),
            }
        }

        async fn run_pipeline(
            &self,
            collection: &str,
            pipeline: &Pipeline,
        ) -> Result<PipelineResult, DatabaseError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            self.record(RecordedOperation::RunPipeline {
                collection: collection.to_string(),
                pipeline: pipeline.clone(),
            });

            let mut collections = self.collections.lock().unwrap();
            let mut documents = collections.get(collection).cloned().unwrap_or_default();
            let mut merged_count = 0;

            for stage in pipeline.stages() {
                match stage {
                    Stage::Match { field, value } => {
                        // 型付きで比較（ObjectIdはObjectId、文字列は文字列とのみ一致）
                        let key = Bson::from(value);
                        documents.retain(|d| d.get(field).is_some_and(|v| keys_equal(v, &key)));
                    }
                    Stage::AddFields { field, transform } => {
                        for document in documents.iter_mut() {
                            let text = document.get(field).map(bson_to_text).unwrap_or_default();
                            document.insert(field.clone(), Bson::from(transform.apply(&text)));
                        }
                    }
                    Stage::Merge { into, on } => {
                        let target = collections.entry(into.clone()).or_default();
                        for document in documents.drain(..) {
                            let key = document.get(on).cloned().unwrap_or(Bson::Null);
                            match target
                                .iter_mut()
                                .find(|t| t.get(on).is_some_and(|v| keys_equal(v, &key)))
                            {
                                Some(existing) => *existing = document,
                                None => target.push(document),
                            }
                            merged_count += 1;
                        }
                    }
                }
            }

            Ok(PipelineResult {
                merged_count: Some(merged_count),
            })
        }
    }

    // ==================== モック自体のテスト ====================

    #[tokio::test]
    async fn test_mock_delete_one_existing() {
        let db = MockTaskDatabase::new();
        db.insert_document("Task", doc! { "_id": 42_i32, "title": "Buy milk" });

        let result = db.delete_one("Task", TaskId::Int(42)).await.unwrap();

        assert_eq!(result.deleted_count, 1);
        assert!(db.documents("Task").is_empty());
    }

    #[tokio::test]
    async fn test_mock_delete_one_missing() {
        let db = MockTaskDatabase::new();
        db.insert_document("Task", doc! { "_id": 1_i64 });

        let result = db.delete_one("Task", TaskId::Int(42)).await.unwrap();

        assert_eq!(result.deleted_count, 0);
        assert_eq!(db.documents("Task").len(), 1);
    }

    #[tokio::test]
    async fn test_mock_delete_one_removes_at_most_one() {
        let db = MockTaskDatabase::new();
        db.insert_document("Task", doc! { "_id": 5_i64, "n": 1 });
        db.insert_document("Task", doc! { "_id": 5_i64, "n": 2 });

        let result = db.delete_one("Task", TaskId::Int(5)).await.unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(db.documents("Task").len(), 1);
    }

    #[tokio::test]
    async fn test_mock_returns_configured_error() {
        let db = MockTaskDatabase::new();
        db.set_next_error(DatabaseError::DeleteError("boom".to_string()));

        let result = db.delete_one("Task", TaskId::Int(1)).await;

        assert_eq!(result, Err(DatabaseError::DeleteError("boom".to_string())));
        // エラーは一度だけ
        assert!(db.delete_one("Task", TaskId::Int(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_pipeline_merge_replaces_whole_document() {
        let db = MockTaskDatabase::new();
        db.insert_document("TaskV2", doc! { "_id": "42", "title": "New" });
        db.insert_document("Task", doc! { "_id": 42_i64, "title": "Old", "stale": true });

        let result = db
            .run_pipeline(
                "TaskV2",
                &Pipeline::copy_to_target(&SourceId::from("42"), "Task"),
            )
            .await
            .unwrap();

        assert_eq!(result.merged_count, Some(1));
        assert_eq!(
            db.documents("Task"),
            vec![doc! { "_id": 42_i64, "title": "New" }]
        );
    }

    #[tokio::test]
    async fn test_mock_pipeline_match_keeps_id_type() {
        let oid = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        let db = MockTaskDatabase::new();
        db.insert_document("TaskV2", doc! { "_id": oid, "title": "From oid" });
        db.insert_document("TaskV2", doc! { "_id": oid.to_hex(), "title": "From text" });

        let result = db
            .run_pipeline(
                "TaskV2",
                &Pipeline::copy_to_target(&SourceId::from(oid), "Task"),
            )
            .await
            .unwrap();

        // ObjectIdのキーは同じ16進文字列の文字列IDとは一致しない
        assert_eq!(result.merged_count, Some(1));
        assert_eq!(
            db.documents("Task"),
            vec![doc! { "_id": 65_i64, "title": "From oid" }]
        );
    }

    #[test]
    fn test_keys_equal_across_numeric_types() {
        assert!(keys_equal(&Bson::Int32(3), &Bson::Int64(3)));
        assert!(keys_equal(&Bson::Double(f64::NAN), &Bson::Double(f64::NAN)));
        assert!(!keys_equal(&Bson::Int64(3), &Bson::String("3".to_string())));
    }
}
