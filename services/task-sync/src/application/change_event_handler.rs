//! Change Event処理モジュール
//!
//! ソースコレクション（TaskV2）の変更通知1件を、ターゲットコレクション（Task）への
//! 1回の変更（削除またはマージ）に変換する。
//! 呼び出しごとに独立しており、状態を持たない。再試行や順序保証は行わない。

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{ChangeEvent, CollectionNames, Pipeline};
use crate::infrastructure::{DatabaseError, DeleteResult, PipelineResult, TaskDatabase};

/// ハンドラーエラー
///
/// 独自のエラー種別は持たず、データベースのエラーをそのまま伝播する。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChangeEventHandlerError {
    /// データベースエラー
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// 1回の呼び出しで行う処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// ターゲットレコードを削除
    Deleting,
    /// ソースレコードを再読み込みしてターゲットへマージ
    Upserting,
}

impl HandlerAction {
    /// `operationType`から処理を選択
    pub fn for_event(event: &ChangeEvent) -> Self {
        if event.is_delete() {
            HandlerAction::Deleting
        } else {
            HandlerAction::Upserting
        }
    }
}

/// 処理結果（実行したデータベース操作の結果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HandleOutcome {
    Deleted(DeleteResult),
    Merged(PipelineResult),
}

/// Change Eventハンドラー
///
/// データベースコラボレーターはコンストラクタで注入する。
pub struct ChangeEventHandler<DB>
where
    DB: TaskDatabase,
{
    database: DB,
    collections: CollectionNames,
}

impl<DB> ChangeEventHandler<DB>
where
    DB: TaskDatabase,
{
    /// 新しいChangeEventHandlerを作成
    pub fn new(database: DB, collections: CollectionNames) -> Self {
        Self {
            database,
            collections,
        }
    }

    /// 対象のコレクション名
    pub fn collections(&self) -> &CollectionNames {
        &self.collections
    }

    /// Change Eventを1件処理
    ///
    /// # Processing
    /// - delete: `_id == parse_leading_int(documentKey._id)`のターゲットレコードを1件削除
    /// - それ以外: ソースレコードを`_id`で選択 → `_id`を整数へ変換 → ターゲットへマージ
    ///
    /// ターゲットへの変更は呼び出しごとにちょうど1回。ソースコレクションは変更しない。
    pub async fn handle(
        &self,
        event: &ChangeEvent,
    ) -> Result<HandleOutcome, ChangeEventHandlerError> {
        let action = HandlerAction::for_event(event);
        debug!(
            operation_type = event.operation_type.as_str(),
            source_id = %event.source_id(),
            action = ?action,
            "Change Event処理開始"
        );

        match action {
            HandlerAction::Deleting => self.delete_target(event).await,
            HandlerAction::Upserting => self.upsert_target(event).await,
        }
    }

    async fn delete_target(
        &self,
        event: &ChangeEvent,
    ) -> Result<HandleOutcome, ChangeEventHandlerError> {
        let task_id = event.source_id().to_task_id();

        let result = self
            .database
            .delete_one(&self.collections.target, task_id)
            .await?;

        // 0件削除はエラーではない（既に存在しない場合がある）
        info!(
            source_id = %event.source_id(),
            task_id = %task_id,
            deleted_count = result.deleted_count,
            "ターゲットレコードを削除"
        );

        Ok(HandleOutcome::Deleted(result))
    }

    async fn upsert_target(
        &self,
        event: &ChangeEvent,
    ) -> Result<HandleOutcome, ChangeEventHandlerError> {
        let pipeline = Pipeline::copy_to_target(event.source_id(), &self.collections.target);

        let result = self
            .database
            .run_pipeline(&self.collections.source, &pipeline)
            .await?;

        info!(
            operation_type = event.operation_type.as_str(),
            source_id = %event.source_id(),
            merged_count = ?result.merged_count,
            "ターゲットレコードへマージ"
        );

        Ok(HandleOutcome::Merged(result))
    }
}
